//! Application Error Types
//!
//! One error type for the whole hub. Handlers return it, the event router turns
//! it into an `error` frame for the sender, and the WebSocket handshake turns it
//! into an HTTP rejection through the Axum integration below.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid reaction: {0}")]
    InvalidReaction(String),

    #[error("Storage unavailable: {0}")]
    TransientStorage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::InvalidReaction(_) => "invalid_reaction",
            AppError::TransientStorage(_) | AppError::Database(_) | AppError::Redis(_) => {
                "transient_storage_failure"
            }
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether the failure came from a storage or bus call rather than from
    /// the request itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::TransientStorage(_) | AppError::Database(_) | AppError::Redis(_)
        )
    }

    /// Message that is safe to show to the client. Driver errors are hidden.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::PermissionDenied(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidArgument(msg)
            | AppError::InvalidReaction(msg) => msg.clone(),
            AppError::TransientStorage(_) | AppError::Database(_) | AppError::Redis(_) => {
                "Storage temporarily unavailable".into()
            }
            AppError::Internal(_) => "Internal server error".into(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) | AppError::InvalidReaction(_) => StatusCode::BAD_REQUEST,
            AppError::TransientStorage(msg) => {
                tracing::error!("Storage error: {}", msg);
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            code: self.code(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}
