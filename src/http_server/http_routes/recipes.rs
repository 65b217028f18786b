use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::http_server::{error::ApiError, state::AppState};
use crate::services::recipe::{RecipeService, RecipeWithIngredients};

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientInput {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipeInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub ingredients: Vec<IngredientInput>,
}

/// Body shared by PUT and PATCH. A payload without the `ingredients` key is
/// rejected at deserialization; absent `name`/`description` retain the stored
/// values. PUT additionally requires `name` in its handler.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRecipeInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub ingredients: Vec<IngredientInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientBody {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeBody {
    pub id: i64,
    pub name: String,
    pub ingredients: Vec<IngredientBody>,
    pub description: Option<String>,
}

impl From<RecipeWithIngredients> for RecipeBody {
    fn from(value: RecipeWithIngredients) -> Self {
        Self {
            id: value.recipe.id,
            name: value.recipe.name,
            ingredients: value
                .ingredients
                .into_iter()
                .map(|i| IngredientBody {
                    id: i.id,
                    name: i.name,
                })
                .collect(),
            description: value.recipe.description,
        }
    }
}

fn ingredient_names(ingredients: Vec<IngredientInput>) -> Vec<String> {
    ingredients.into_iter().map(|i| i.name).collect()
}

#[derive(Debug, Deserialize)]
pub struct ListRecipesQuery {
    pub name: Option<String>,
}

#[axum::debug_handler]
pub async fn list_recipes(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListRecipesQuery>,
) -> Result<Json<Vec<RecipeBody>>, ApiError> {
    let service = RecipeService::new(app_state.db.clone());
    let recipes = service.list(query.name.as_deref()).await?;

    Ok(Json(recipes.into_iter().map(RecipeBody::from).collect()))
}

#[axum::debug_handler]
pub async fn create_recipe(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<CreateRecipeInput>,
) -> Result<(StatusCode, Json<RecipeBody>), ApiError> {
    let service = RecipeService::new(app_state.db.clone());
    let created = service
        .create(
            input.name,
            input.description,
            ingredient_names(input.ingredients),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[axum::debug_handler]
pub async fn get_recipe(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeBody>, ApiError> {
    let service = RecipeService::new(app_state.db.clone());
    let recipe = service.get(id).await?;

    Ok(Json(recipe.into()))
}

#[axum::debug_handler]
pub async fn update_recipe(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateRecipeInput>,
) -> Result<Json<RecipeBody>, ApiError> {
    if input.name.is_none() {
        return Err(ApiError::Validation {
            field: "name".to_string(),
            message: "this field is required".to_string(),
        });
    }

    let service = RecipeService::new(app_state.db.clone());
    let updated = service
        .update(
            id,
            input.name,
            input.description,
            ingredient_names(input.ingredients),
        )
        .await?;

    Ok(Json(updated.into()))
}

#[axum::debug_handler]
pub async fn partial_update_recipe(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateRecipeInput>,
) -> Result<Json<RecipeBody>, ApiError> {
    let service = RecipeService::new(app_state.db.clone());
    let updated = service
        .update(
            id,
            input.name,
            input.description,
            ingredient_names(input.ingredients),
        )
        .await?;

    Ok(Json(updated.into()))
}

#[axum::debug_handler]
pub async fn delete_recipe(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let service = RecipeService::new(app_state.db.clone());
    service.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
