use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::models::ValidationError;

/// Coarse classification of an [`AppError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Unauthorized,
    Persistence,
    Cancelled,
    Internal,
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Movie not found: {0}")]
    MovieNotFound(Uuid),

    #[error("Rating not found: {0}")]
    RatingNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MovieNotFound(_) | AppError::RatingNotFound(_) | AppError::UserNotFound(_) => {
                ErrorKind::NotFound
            }
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Unauthenticated | AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Database(_) | AppError::Persistence(_) => ErrorKind::Persistence,
            AppError::Cancelled => ErrorKind::Cancelled,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MovieNotFound(_) | AppError::RatingNotFound(_) | AppError::UserNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Persistence(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
