//! # coursedeck_api
//!
//! HTTP API library for the Coursedeck authentication service.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use coursedeck_core::auth::oauth::StateStore;
use coursedeck_core::store::{SessionHandleStore, UserStore};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, health, members, oauth};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistent user store.
    pub users: Arc<dyn UserStore>,
    /// Volatile opaque-handle store.
    pub sessions: Arc<dyn SessionHandleStore>,
    /// One-time OAuth correlation nonces.
    pub oauth_states: Arc<StateStore>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Run embedded database migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    coursedeck_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
///
/// Auth routes are mounted outside the guarded subtree so sign-in and
/// the OAuth callback are always reachable; only `/admin/*` runs the
/// route guard.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/healthz", get(health::health_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/session", get(auth::session_handler))
        .route("/auth/oauth/login", get(oauth::oauth_login_handler))
        .route("/auth/oauth/callback", get(oauth::oauth_callback_handler));

    let admin = Router::new()
        .route(
            "/admin/members/{id}",
            delete(members::delete_member_handler),
        )
        .route(
            "/admin/members/{id}/role",
            put(members::update_member_role_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::guard::admin_guard,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .layer(cors)
        .with_state(state)
}
