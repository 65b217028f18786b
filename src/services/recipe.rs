use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::database::Database;
use crate::entities;

pub struct RecipeWithIngredients {
    pub recipe: entities::recipe::Model,
    pub ingredients: Vec<entities::ingredient::Model>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
    #[error("Recipe not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl From<sea_orm::TransactionError<RecipeError>> for RecipeError {
    fn from(err: sea_orm::TransactionError<RecipeError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(e) => Self::Database(e),
            sea_orm::TransactionError::Transaction(e) => e,
        }
    }
}

fn validate_name(name: &str) -> Result<(), RecipeError> {
    if name.trim().is_empty() {
        return Err(RecipeError::Validation {
            field: "name",
            message: "may not be blank",
        });
    }
    Ok(())
}

fn validate_ingredients(ingredients: &[String]) -> Result<(), RecipeError> {
    for name in ingredients {
        if name.trim().is_empty() {
            return Err(RecipeError::Validation {
                field: "ingredients",
                message: "ingredient name may not be blank",
            });
        }
    }
    Ok(())
}

pub struct RecipeService {
    db: Arc<Database>,
}

impl RecipeService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List recipes, newest id first, optionally filtered by a name substring.
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<RecipeWithIngredients>, RecipeError> {
        let mut query = entities::recipe::Entity::find();

        if let Some(term) = name
            && !term.is_empty()
        {
            query = query.filter(entities::recipe::Column::Name.contains(term));
        }

        let recipes = query
            .order_by_desc(entities::recipe::Column::Id)
            .all(&self.db.conn)
            .await?;

        let mut result = Vec::new();
        for recipe in recipes {
            let ingredients = self.ingredients_for(recipe.id).await?;
            result.push(RecipeWithIngredients {
                recipe,
                ingredients,
            });
        }

        Ok(result)
    }

    pub async fn get(&self, id: i64) -> Result<RecipeWithIngredients, RecipeError> {
        let recipe = entities::recipe::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(RecipeError::NotFound)?;

        let ingredients = self.ingredients_for(recipe.id).await?;

        Ok(RecipeWithIngredients {
            recipe,
            ingredients,
        })
    }

    /// Create a recipe together with its ingredient rows.
    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        ingredients: Vec<String>,
    ) -> Result<RecipeWithIngredients, RecipeError> {
        validate_name(&name)?;
        validate_ingredients(&ingredients)?;

        let created = self
            .db
            .conn
            .transaction::<_, RecipeWithIngredients, RecipeError>(|txn| {
                Box::pin(async move {
                    let recipe = entities::recipe::ActiveModel {
                        name: Set(name),
                        description: Set(description),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    let mut models = Vec::new();
                    for ingredient_name in ingredients {
                        let model = entities::ingredient::ActiveModel {
                            name: Set(ingredient_name),
                            recipe_id: Set(recipe.id),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;
                        models.push(model);
                    }

                    Ok(RecipeWithIngredients {
                        recipe,
                        ingredients: models,
                    })
                })
            })
            .await?;

        log::info!(
            "Recipe created: '{}' (ID: {}, {} ingredients)",
            created.recipe,
            created.recipe.id,
            created.ingredients.len()
        );
        Ok(created)
    }

    /// Update a recipe, replacing its whole ingredient set with the given one.
    ///
    /// `name` and `description` fall back to the stored values when absent, so
    /// partial and full updates go through the same path. The ingredient rows
    /// are deleted by recipe id and recreated; their ids are not preserved.
    pub async fn update(
        &self,
        id: i64,
        name: Option<String>,
        description: Option<String>,
        ingredients: Vec<String>,
    ) -> Result<RecipeWithIngredients, RecipeError> {
        if let Some(ref name) = name {
            validate_name(name)?;
        }
        validate_ingredients(&ingredients)?;

        let recipe = entities::recipe::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(RecipeError::NotFound)?;

        let updated = self
            .db
            .conn
            .transaction::<_, RecipeWithIngredients, RecipeError>(|txn| {
                Box::pin(async move {
                    let mut active: entities::recipe::ActiveModel = recipe.into();
                    if let Some(name) = name {
                        active.name = Set(name);
                    }
                    if let Some(description) = description {
                        active.description = Set(Some(description));
                    }
                    let recipe = active.update(txn).await?;

                    // Scope the deletion by the recipe id, not by any child list
                    // loaded earlier in the request
                    entities::ingredient::Entity::delete_many()
                        .filter(entities::ingredient::Column::RecipeId.eq(recipe.id))
                        .exec(txn)
                        .await?;

                    let mut models = Vec::new();
                    for ingredient_name in ingredients {
                        let model = entities::ingredient::ActiveModel {
                            name: Set(ingredient_name),
                            recipe_id: Set(recipe.id),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;
                        models.push(model);
                    }

                    Ok(RecipeWithIngredients {
                        recipe,
                        ingredients: models,
                    })
                })
            })
            .await?;

        log::info!(
            "Recipe updated: '{}' (ID: {}, {} ingredients)",
            updated.recipe,
            updated.recipe.id,
            updated.ingredients.len()
        );
        Ok(updated)
    }

    /// Delete a recipe; the foreign key cascade removes its ingredients.
    pub async fn delete(&self, id: i64) -> Result<(), RecipeError> {
        let recipe = entities::recipe::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(RecipeError::NotFound)?;

        let name = recipe.name.clone();
        recipe.delete(&self.db.conn).await?;

        log::info!("Recipe deleted: '{}' (ID: {})", name, id);
        Ok(())
    }

    async fn ingredients_for(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<entities::ingredient::Model>, RecipeError> {
        Ok(entities::ingredient::Entity::find()
            .filter(entities::ingredient::Column::RecipeId.eq(recipe_id))
            .all(&self.db.conn)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_db;

    async fn sample_recipe(
        service: &RecipeService,
        name: &str,
        ingredients: &[&str],
    ) -> RecipeWithIngredients {
        service
            .create(
                name.to_string(),
                Some("this is a description".to_string()),
                ingredients.iter().map(|s| s.to_string()).collect(),
            )
            .await
            .unwrap()
    }

    fn ingredient_names(ingredients: &[entities::ingredient::Model]) -> Vec<String> {
        let mut names: Vec<String> = ingredients.iter().map(|i| i.name.clone()).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_create_recipe_with_ingredients() {
        let service = RecipeService::new(test_db().await);

        let created = service
            .create(
                "Thai prawn red curry".to_string(),
                Some("Nice and spicy!".to_string()),
                vec!["Prawns".to_string(), "Ginger".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(created.recipe.name, "Thai prawn red curry");
        assert_eq!(created.recipe.description.as_deref(), Some("Nice and spicy!"));
        assert_eq!(created.ingredients.len(), 2);
        assert_eq!(
            ingredient_names(&created.ingredients),
            vec!["Ginger".to_string(), "Prawns".to_string()]
        );
        for ingredient in &created.ingredients {
            assert_eq!(ingredient.recipe_id, created.recipe.id);
        }
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let service = RecipeService::new(test_db().await);

        let result = service.create("   ".to_string(), None, vec![]).await;

        assert!(matches!(
            result,
            Err(RecipeError::Validation { field: "name", .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_ingredient_name() {
        let service = RecipeService::new(test_db().await);

        let result = service
            .create(
                "Pancakes".to_string(),
                None,
                vec!["Flour".to_string(), "".to_string()],
            )
            .await;

        assert!(matches!(
            result,
            Err(RecipeError::Validation {
                field: "ingredients",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_list_returns_newest_first() {
        let service = RecipeService::new(test_db().await);
        sample_recipe(&service, "Apple strudel", &[]).await;
        sample_recipe(&service, "Rhubarb pie", &[]).await;

        let recipes = service.list(None).await.unwrap();

        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].recipe.name, "Rhubarb pie");
        assert_eq!(recipes[1].recipe.name, "Apple strudel");
    }

    #[tokio::test]
    async fn test_list_filters_by_name_substring() {
        let service = RecipeService::new(test_db().await);
        sample_recipe(&service, "Pizza", &[]).await;
        sample_recipe(&service, "Spaghetti bolognese", &[]).await;

        let recipes = service.list(Some("Pi")).await.unwrap();

        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].recipe.name, "Pizza");
    }

    #[tokio::test]
    async fn test_get_returns_recipe_with_ingredients() {
        let service = RecipeService::new(test_db().await);
        let created = sample_recipe(&service, "Sample recipe", &["Cinnamon"]).await;

        let fetched = service.get(created.recipe.id).await.unwrap();

        assert_eq!(fetched.recipe.id, created.recipe.id);
        assert_eq!(fetched.ingredients.len(), 1);
        assert_eq!(fetched.ingredients[0].name, "Cinnamon");
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let service = RecipeService::new(test_db().await);

        let result = service.get(9999).await;

        assert!(matches!(result, Err(RecipeError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_replaces_ingredient_set() {
        let service = RecipeService::new(test_db().await);
        let created = sample_recipe(&service, "Sample recipe", &["Cinnamon"]).await;
        let old_ids: Vec<i64> = created.ingredients.iter().map(|i| i.id).collect();

        let updated = service
            .update(
                created.recipe.id,
                Some("Chicken tikka".to_string()),
                Some("testing".to_string()),
                vec!["Curry powder".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(updated.recipe.name, "Chicken tikka");
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].name, "Curry powder");
        for ingredient in &updated.ingredients {
            assert!(!old_ids.contains(&ingredient.id));
        }

        // The old rows are gone, not merged
        let fetched = service.get(created.recipe.id).await.unwrap();
        assert_eq!(fetched.ingredients.len(), 1);
        assert_eq!(fetched.ingredients[0].name, "Curry powder");
    }

    #[tokio::test]
    async fn test_update_retains_fields_when_absent() {
        let service = RecipeService::new(test_db().await);
        let created = sample_recipe(&service, "Sample recipe", &["Cinnamon"]).await;

        let updated = service
            .update(created.recipe.id, None, None, vec!["Nutmeg".to_string()])
            .await
            .unwrap();

        assert_eq!(updated.recipe.name, "Sample recipe");
        assert_eq!(
            updated.recipe.description.as_deref(),
            Some("this is a description")
        );
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].name, "Nutmeg");
    }

    #[tokio::test]
    async fn test_full_update() {
        let service = RecipeService::new(test_db().await);
        let created = sample_recipe(&service, "Sample recipe", &["Cinnamon"]).await;

        let updated = service
            .update(
                created.recipe.id,
                Some("Spaghetti carbonara".to_string()),
                Some("A very nice pasta dish".to_string()),
                vec!["Beef bacon".to_string(), "Black peppers".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(updated.recipe.name, "Spaghetti carbonara");
        assert_eq!(
            updated.recipe.description.as_deref(),
            Some("A very nice pasta dish")
        );
        assert_eq!(updated.ingredients.len(), 2);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let service = RecipeService::new(test_db().await);

        let result = service
            .update(9999, Some("Anything".to_string()), None, vec![])
            .await;

        assert!(matches!(result, Err(RecipeError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_ingredients() {
        let db = test_db().await;
        let service = RecipeService::new(db.clone());
        let created = sample_recipe(&service, "Sample recipe", &["Cinnamon", "Sugar"]).await;

        service.delete(created.recipe.id).await.unwrap();

        let recipes = entities::recipe::Entity::find().all(&db.conn).await.unwrap();
        let ingredients = entities::ingredient::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert!(recipes.is_empty());
        assert!(ingredients.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let service = RecipeService::new(test_db().await);

        let result = service.delete(9999).await;

        assert!(matches!(result, Err(RecipeError::NotFound)));
    }

    #[tokio::test]
    async fn test_recipe_display_is_its_name() {
        let service = RecipeService::new(test_db().await);
        let created = sample_recipe(&service, "Steak and mushroom sauce", &[]).await;

        assert_eq!(created.recipe.to_string(), "Steak and mushroom sauce");
    }

    #[tokio::test]
    async fn test_ingredient_display_is_its_name() {
        let service = RecipeService::new(test_db().await);
        let created = sample_recipe(&service, "Cucumber pie", &["Cucumber"]).await;

        assert_eq!(created.ingredients[0].to_string(), "Cucumber");
    }
}
