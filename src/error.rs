use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Substitution state is gone or was never created for this user.
    #[error("Cache miss: {0}")]
    CacheMiss(String),

    /// A filter stage eliminated every candidate; the message names the stage.
    #[error("No candidates left: {0}")]
    Exhausted(String),

    /// Concurrent modification detected during confirm_replace.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal database error")
            }
            AppError::Embedding(ref e) => {
                tracing::error!("Embedding service error: {}", e);
                (StatusCode::BAD_GATEWAY, "Embedding service error")
            }
            AppError::VectorIndex(ref e) => {
                tracing::error!("Vector index error: {}", e);
                (StatusCode::BAD_GATEWAY, "Vector index error")
            }
            AppError::Cache(ref e) => {
                tracing::warn!("Cache error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Cache error")
            }
            AppError::InvalidRequest(ref e) => (StatusCode::BAD_REQUEST, e.as_str()),
            AppError::CacheMiss(ref e) => (StatusCode::NOT_FOUND, e.as_str()),
            AppError::Exhausted(ref e) => (StatusCode::UNPROCESSABLE_ENTITY, e.as_str()),
            AppError::Conflict(ref e) => (StatusCode::CONFLICT, e.as_str()),
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
