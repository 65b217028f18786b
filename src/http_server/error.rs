use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::recipe::RecipeError;

/// Errors surfaced to API clients.
///
/// Validation and NotFound carry a body describing the failure; everything
/// else is logged and collapsed into a generic server error.
pub enum ApiError {
    Validation { field: String, message: String },
    NotFound(String),
    Internal(color_eyre::Report),
}

impl From<RecipeError> for ApiError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::Validation { field, message } => Self::Validation {
                field: field.to_string(),
                message: message.to_string(),
            },
            RecipeError::NotFound => Self::NotFound("Recipe not found".to_string()),
            RecipeError::Database(e) => Self::Internal(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": { field: [message] } })),
            )
                .into_response(),
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Internal(report) => {
                log::error!("{report:?}");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
                    .into_response()
            }
        }
    }
}
