//! Store abstractions.
//!
//! The persistent user store and the volatile session-handle mapping are
//! both injected behind traits so the HTTP layer never touches a
//! concrete backend. `PgUserStore` is the durable implementation;
//! `MemoryStore` backs both traits in-process and in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Identity, NewUser, Role, UserRecord};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate email: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Persistent user store.
///
/// Email keys are always lowercased before lookup or insert.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Create a user. A case-insensitive duplicate email yields
    /// `StoreError::Duplicate`.
    async fn create(&self, user: NewUser) -> Result<Identity, StoreError>;

    async fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// Volatile mapping of opaque session handles to identity IDs.
///
/// A handle absent from the mapping is invalid regardless of age; the
/// whole mapping may be lost on restart.
#[async_trait]
pub trait SessionHandleStore: Send + Sync {
    async fn put(&self, handle: &str, identity_id: &str) -> Result<(), StoreError>;

    async fn get(&self, handle: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&self, handle: &str) -> Result<(), StoreError>;
}
