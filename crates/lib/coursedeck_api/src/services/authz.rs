//! Authorization gate.
//!
//! A resolved session only proves who the caller is; whether they may
//! act is decided here against the *current* role in the user store.
//! Role revocation therefore takes effect on the very next request,
//! even while older tokens remain cryptographically valid.

use coursedeck_core::models::{Identity, Role};
use coursedeck_core::store::UserStore;
use tracing::warn;

use super::session::ResolvedSession;
use crate::error::AppError;

/// Why the gate refused. Distinguished so callers can map each outcome
/// to its own status code or redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No identity was resolved from the request.
    Unauthenticated,
    /// The resolved identity no longer exists in the store.
    IdentityGone,
    /// The current role does not satisfy the requirement.
    InsufficientRole,
    /// The store read failed; not a verdict on the caller.
    StoreUnavailable,
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => AppError::Unauthenticated("Sign in required".into()),
            Denial::IdentityGone => AppError::Unauthenticated("Unknown identity".into()),
            Denial::InsufficientRole => AppError::Forbidden("Insufficient role".into()),
            Denial::StoreUnavailable => AppError::Internal("user store unreachable".into()),
        }
    }
}

/// Re-confirm the caller's role from the store and require `required`.
///
/// The token's embedded role is treated as a hint only; the store read
/// (by lowercased email) is authoritative. Returns the fresh identity
/// on success.
pub async fn require_role(
    users: &dyn UserStore,
    session: Option<&ResolvedSession>,
    required: Role,
) -> Result<Identity, Denial> {
    let session = match session {
        None => return Err(Denial::Unauthenticated),
        Some(s) => s,
    };

    let record = match users.find_by_email(&session.email).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            warn!(email = %session.email, "gate denial: identity vanished from store");
            return Err(Denial::IdentityGone);
        }
        Err(e) => {
            warn!(email = %session.email, error = %e, "gate: store unreachable");
            return Err(Denial::StoreUnavailable);
        }
    };

    if !record.identity.role.satisfies(required) {
        warn!(
            email = %session.email,
            current = record.identity.role.as_str(),
            required = required.as_str(),
            "gate denial: insufficient role"
        );
        return Err(Denial::InsufficientRole);
    }

    Ok(record.identity)
}
