//! Authentication request handlers: login, register, logout, session.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use coursedeck_core::auth::{credentials, token};
use coursedeck_core::models::{Identity, Role};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::services::cookies::{self, HANDLE_COOKIE};
use crate::services::session::{self, ResolvedSession};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: Option<String>,
    pub password: String,
}

/// Identity shape returned to the frontend.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

impl From<&Identity> for SessionUser {
    fn from(identity: &Identity) -> Self {
        SessionUser {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role: identity.role,
        }
    }
}

impl From<&ResolvedSession> for SessionUser {
    fn from(resolved: &ResolvedSession) -> Self {
        SessionUser {
            id: resolved.identity_id.clone(),
            email: resolved.email.clone(),
            role: resolved.role,
        }
    }
}

/// Generate a random high-entropy opaque session handle.
fn generate_handle() -> String {
    rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect()
}

/// Mint both session cookies for a freshly authenticated identity.
async fn issue_session(
    state: &AppState,
    jar: CookieJar,
    identity: &Identity,
) -> AppResult<CookieJar> {
    let tok = token::issue(state.config.session_secret.as_bytes(), identity)?;
    let handle = generate_handle();
    state.sessions.put(&handle, &identity.id).await?;
    Ok(jar
        .add(cookies::session_cookie(&tok, state.config.secure_cookies))
        .add(cookies::handle_cookie(&handle, state.config.secure_cookies)))
}

/// `POST /auth/login` — authenticate with email + password.
///
/// Unknown email and wrong password produce the same 401.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionUser>)> {
    let identity = credentials::authenticate(state.users.as_ref(), &body.email, &body.password)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid credentials".into()))?;

    let jar = issue_session(&state, jar, &identity).await?;
    Ok((jar, Json(SessionUser::from(&identity))))
}

/// `POST /auth/register` — create an account and sign it in.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(CookieJar, Json<SessionUser>)> {
    let identity = credentials::register(
        state.users.as_ref(),
        &body.email,
        body.name.as_deref(),
        &body.password,
    )
    .await?;

    let jar = issue_session(&state, jar, &identity).await?;
    Ok((jar, Json(SessionUser::from(&identity))))
}

/// `POST /auth/logout` — clear all session cookies and drop the opaque
/// handle. Idempotent: a second call is a no-op, not an error.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    if let Some(cookie) = jar.get(HANDLE_COOKIE) {
        state.sessions.delete(cookie.value()).await?;
    }
    let mut jar = jar;
    for cookie in cookies::clear_cookies(state.config.secure_cookies) {
        jar = jar.add(cookie);
    }
    Ok((jar, Json(LogoutResponse { success: true })))
}

/// `GET /auth/session` — the resolved identity, or `null` when no
/// source yields one. Never errors on an absent or malformed session.
pub async fn session_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Json<Option<SessionUser>> {
    let resolved = session::resolve(&state, &jar).await;
    Json(resolved.as_ref().map(SessionUser::from))
}
