//! Admin route guard.
//!
//! Applied to the `/admin` subtree. Unauthenticated callers are sent to
//! sign-in, authenticated non-admins back home, admins pass through
//! with the fresh identity in request extensions. Auth endpoints are
//! mounted outside the guarded subtree, so sign-in and the OAuth
//! callback can never loop through here.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use coursedeck_core::models::{Identity, Role};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::services::authz::{self, Denial};
use crate::services::session;

/// Redirect target for unauthenticated callers.
pub const SIGNIN_PATH: &str = "/signin";
/// Redirect target for authenticated callers lacking the role.
pub const HOME_PATH: &str = "/";

/// Fresh identity of the caller, inserted by the guard.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// Axum middleware enforcing admin access on guarded paths.
pub async fn admin_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = session::resolve(&state, &jar).await;

    match authz::require_role(state.users.as_ref(), resolved.as_ref(), Role::Admin).await {
        Ok(identity) => {
            request.extensions_mut().insert(CurrentUser(identity));
            next.run(request).await
        }
        Err(Denial::Unauthenticated) | Err(Denial::IdentityGone) => {
            debug!(path = %request.uri().path(), "guard: redirecting to sign-in");
            Redirect::to(SIGNIN_PATH).into_response()
        }
        Err(Denial::InsufficientRole) => {
            debug!(path = %request.uri().path(), "guard: redirecting non-admin home");
            Redirect::to(HOME_PATH).into_response()
        }
        // A store outage says nothing about the caller; surface it as an
        // error instead of bouncing a possibly-legitimate admin to sign-in.
        Err(Denial::StoreUnavailable) => AppError::from(Denial::StoreUnavailable).into_response(),
    }
}
