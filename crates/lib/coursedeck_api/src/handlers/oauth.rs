//! OAuth endpoints: initiate the redirect dance and handle the callback.
//!
//! Browser-facing, so every failure is a redirect back to sign-in with
//! an error indicator — never a raw error body.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use coursedeck_core::auth::credentials;
use coursedeck_core::auth::oauth::{self, ExchangeFailure, ExchangeOutcome};
use coursedeck_core::auth::token;
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;
use crate::middleware::guard::{HOME_PATH, SIGNIN_PATH};
use crate::services::cookies;

/// Query parameters on the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn signin_error(reason: &str) -> Response {
    // The reason may echo provider-controlled input; encode it so it
    // cannot break the Location header or smuggle extra parameters.
    let reason: String = url::form_urlencoded::byte_serialize(reason.as_bytes()).collect();
    Redirect::to(&format!("{SIGNIN_PATH}?error={reason}")).into_response()
}

/// `GET /auth/oauth/login` — mint a correlation state and redirect to
/// the provider. With no provider configured the dance short-circuits
/// straight to our own callback, which will resolve the demo identity.
pub async fn oauth_login_handler(State(state): State<AppState>) -> Response {
    let nonce = oauth::generate_state();
    state.oauth_states.insert(nonce.clone());

    if state.config.oauth.is_configured() {
        if let Some(url) = state.config.oauth.authorize_redirect(&nonce) {
            return Redirect::to(&url).into_response();
        }
        warn!("oauth authorize URL invalid, falling back to demo dance");
    }
    Redirect::to(&format!("/auth/oauth/callback?code=demo&state={nonce}")).into_response()
}

/// `GET /auth/oauth/callback` — authorization-code callback.
///
/// Provider errors, a missing code, and a correlation mismatch are all
/// terminal redirects with no cookie set. A resolved or degraded
/// exchange finds-or-creates the identity (role `user`, never admin)
/// and signs it in.
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(err) = params.error {
        warn!(provider_error = %err, "oauth callback carried provider error");
        return signin_error(&err);
    }
    let code = match params.code {
        None => return signin_error("missing_code"),
        Some(c) => c,
    };
    let consumed = params
        .state
        .as_deref()
        .map(|s| state.oauth_states.take(s))
        .unwrap_or(false);
    if !consumed {
        warn!("oauth callback state missing, reused, or expired");
        return signin_error("state_mismatch");
    }

    let outcome = oauth::run_exchange(&state.config.oauth, &code).await;
    let profile = match outcome {
        ExchangeOutcome::Resolved(profile) => {
            info!(email = %profile.email, "oauth exchange resolved against provider");
            profile
        }
        ExchangeOutcome::Degraded(profile) => {
            info!(email = %profile.email, "oauth exchange degraded to demo identity");
            profile
        }
        ExchangeOutcome::Failed(failure) => {
            warn!(?failure, "oauth exchange failed");
            let reason = match failure {
                ExchangeFailure::ProviderError(e) => e,
                ExchangeFailure::MissingCode => "missing_code".into(),
                ExchangeFailure::StateMismatch => "state_mismatch".into(),
                ExchangeFailure::CallbackError(_) => "callback_error".into(),
            };
            return signin_error(&reason);
        }
    };

    let identity = match credentials::find_or_create_oauth_user(
        state.users.as_ref(),
        &profile.email,
        profile.name.as_deref(),
    )
    .await
    {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "oauth identity persistence failed");
            return signin_error("server_error");
        }
    };

    let tok = match token::issue(state.config.session_secret.as_bytes(), &identity) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "session token issuance failed after oauth");
            return signin_error("server_error");
        }
    };

    let jar = jar.add(cookies::session_cookie(&tok, state.config.secure_cookies));
    (jar, Redirect::to(HOME_PATH)).into_response()
}
