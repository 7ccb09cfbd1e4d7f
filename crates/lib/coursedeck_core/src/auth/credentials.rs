//! Credential authentication and registration.

use tracing::{debug, info};

use super::{AuthError, password};
use crate::models::{Identity, NewUser, Role};
use crate::store::{StoreError, UserStore};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Demo accounts created by [`seed_demo_users`].
pub const DEMO_ADMIN_EMAIL: &str = "admin@coursedeck.dev";
pub const DEMO_STUDENT_EMAIL: &str = "student@coursedeck.dev";

/// Authenticate with email + password.
///
/// Returns `Ok(None)` for unknown email and wrong password alike, so the
/// response shape never reveals which one failed. The distinction is
/// logged server-side only.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password_plain: &str,
) -> Result<Option<Identity>, AuthError> {
    let email = email.to_lowercase();
    let record = match store.find_by_email(&email).await? {
        None => {
            debug!(%email, "login failed: no such user");
            return Ok(None);
        }
        Some(r) => r,
    };
    let stored = match record.password_digest {
        None => {
            debug!(%email, "login failed: no credential record");
            return Ok(None);
        }
        Some(d) => d,
    };
    if !password::verify(password_plain, &stored) {
        debug!(%email, "login failed: wrong password");
        return Ok(None);
    }
    Ok(Some(record.identity))
}

/// Register a new user account with role `user`.
///
/// Password length is validated before any store access; duplicate
/// emails (case-insensitive) are rejected.
pub async fn register(
    store: &dyn UserStore,
    email: &str,
    display_name: Option<&str>,
    password_plain: &str,
) -> Result<Identity, AuthError> {
    if password_plain.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let created = store
        .create(NewUser {
            email: email.to_lowercase(),
            display_name: display_name.map(|n| n.to_string()),
            role: Role::User,
            password_digest: Some(password::digest(password_plain)),
        })
        .await;

    match created {
        Ok(identity) => {
            info!(email = %identity.email, "registered new user");
            Ok(identity)
        }
        Err(StoreError::Duplicate(_)) => Err(AuthError::AlreadyExists),
        Err(e) => Err(e.into()),
    }
}

/// Find or create an identity for an OAuth profile.
///
/// OAuth logins never carry a credential record and never grant admin;
/// an existing identity keeps whatever role the store holds.
pub async fn find_or_create_oauth_user(
    store: &dyn UserStore,
    email: &str,
    display_name: Option<&str>,
) -> Result<Identity, AuthError> {
    let email = email.to_lowercase();
    if let Some(record) = store.find_by_email(&email).await? {
        return Ok(record.identity);
    }
    let identity = store
        .create(NewUser {
            email,
            display_name: display_name.map(|n| n.to_string()),
            role: Role::User,
            password_digest: None,
        })
        .await?;
    info!(email = %identity.email, "created identity from oauth profile");
    Ok(identity)
}

/// Idempotent demo seed, invoked once during server bootstrap.
///
/// Creates one admin and one student account when absent; re-running is
/// a no-op.
pub async fn seed_demo_users(store: &dyn UserStore) -> Result<(), AuthError> {
    let seeds = [
        (DEMO_ADMIN_EMAIL, "Demo Admin", "admin123", Role::Admin),
        (DEMO_STUDENT_EMAIL, "Demo Student", "student123", Role::User),
    ];
    for (email, name, pw, role) in seeds {
        if store.find_by_email(email).await?.is_some() {
            continue;
        }
        store
            .create(NewUser {
                email: email.to_string(),
                display_name: Some(name.to_string()),
                role,
                password_digest: Some(password::digest(pw)),
            })
            .await?;
        info!(%email, role = role.as_str(), "seeded demo account");
    }
    Ok(())
}
