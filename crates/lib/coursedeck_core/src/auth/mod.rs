//! Authentication and authorization logic.
//!
//! Provides password digestion, session token management, credential
//! flows and the OAuth code exchange, shared between `coursedeck_api`
//! and the server binary.

pub mod credentials;
pub mod oauth;
pub mod password;
pub mod token;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    Credentials,

    #[error("Email already registered")]
    AlreadyExists,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
