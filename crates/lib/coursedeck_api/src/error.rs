//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// JSON error body returned to API callers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthenticated(m) => {
                (StatusCode::UNAUTHORIZED, "unauthenticated", m.as_str())
            }
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Upstream(m) => (StatusCode::BAD_GATEWAY, "upstream_error", m.as_str()),
            // Internals are logged with context and never leak to the client.
            AppError::Internal(m) => {
                error!(detail = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<coursedeck_core::store::StoreError> for AppError {
    fn from(e: coursedeck_core::store::StoreError) -> Self {
        use coursedeck_core::store::StoreError;
        match e {
            StoreError::Duplicate(email) => {
                AppError::Validation(format!("Email already registered: {email}"))
            }
            StoreError::Db(e) => AppError::Internal(e.to_string()),
            StoreError::Backend(m) => AppError::Internal(m),
        }
    }
}

impl From<coursedeck_core::auth::AuthError> for AppError {
    fn from(e: coursedeck_core::auth::AuthError) -> Self {
        use coursedeck_core::auth::AuthError;
        match e {
            AuthError::Credentials => AppError::Unauthenticated("Invalid credentials".into()),
            AuthError::AlreadyExists => AppError::Validation("Email already registered".into()),
            AuthError::Validation(m) => AppError::Validation(m),
            AuthError::Token(m) => AppError::Internal(m),
            AuthError::Store(e) => AppError::from(e),
        }
    }
}
