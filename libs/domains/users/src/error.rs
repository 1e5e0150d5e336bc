use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::models::UniqueField;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("User with {field} '{value}' already exists")]
    Conflict { field: UniqueField, value: String },

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("User with {field} '{value}' not found")]
    NotFoundBy { field: UniqueField, value: String },

    #[error("Store error: {0}")]
    Store(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn conflict(field: UniqueField, value: impl Into<String>) -> Self {
        Self::Conflict {
            field,
            value: value.into(),
        }
    }
}

/// Convert UserError to AppError for standardized error responses
impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(errors) => AppError::ValidationError(errors),
            UserError::Conflict { field, value } => {
                let message = match field {
                    UniqueField::Username => format!("Username '{}' is already taken", value),
                    UniqueField::Email => format!("Email '{}' is already registered", value),
                };
                AppError::Conflict(message)
            }
            UserError::NotFound(_) | UserError::NotFoundBy { .. } => {
                AppError::NotFound("User not found".to_string())
            }
            UserError::Store(msg) => {
                tracing::error!(error = %msg, "User store failure");
                AppError::InternalServerError("An internal server error occurred".to_string())
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
