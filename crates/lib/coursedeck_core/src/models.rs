//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API response
//! shapes in `coursedeck_api` (which carry `#[serde(rename)]` for
//! camelCase where the frontend expects it).

use serde::{Deserialize, Serialize};

/// Capability level attached to an identity.
///
/// Stored on the user record; the copy embedded in session tokens is
/// advisory only and is re-read from the store before any admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Text form used in the database `role` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse the database text form. Unknown values are rejected.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Whether this role grants everything `required` grants.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => self == Role::Admin,
        }
    }
}

/// A resolved, persisted identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    /// Always lowercased; unique in the store.
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
}

/// Full user record as held by the store.
///
/// `password_digest` is absent for OAuth-only identities.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub identity: Identity,
    pub password_digest: Option<String>,
}

/// Payload for creating a new user record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub password_digest: Option<String>,
}
