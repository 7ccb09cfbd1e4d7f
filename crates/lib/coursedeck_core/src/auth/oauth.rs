//! Third-party OAuth authorization-code exchange.
//!
//! The callback outcome is an explicit sum type so handlers and tests
//! can assert which branch ran: a real provider exchange (`Resolved`),
//! the demo-identity fallback for unconfigured or unreachable providers
//! (`Degraded`), or a terminal failure (`Failed`).

use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::RngCore;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

/// TTL for correlation-state entries (10 minutes).
const STATE_TTL: Duration = Duration::from_secs(600);

/// Timeout applied to provider HTTP calls.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed identity used when the exchange degrades.
pub const DEMO_EMAIL: &str = "demo@coursedeck.dev";
pub const DEMO_NAME: &str = "Demo Learner";

/// Provider endpoints and client credentials, read from the environment.
///
/// Missing client credentials are not an error; they switch the
/// exchange into degraded mode.
#[derive(Debug, Clone, Default)]
pub struct OAuthProvider {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_uri: String,
}

impl OAuthProvider {
    /// Read provider settings from `OAUTH_*` environment variables.
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).unwrap_or_default();
        Self {
            client_id: var("OAUTH_CLIENT_ID"),
            client_secret: var("OAUTH_CLIENT_SECRET"),
            authorize_url: var("OAUTH_AUTHORIZE_URL"),
            token_url: var("OAUTH_TOKEN_URL"),
            userinfo_url: var("OAUTH_USERINFO_URL"),
            redirect_uri: var("OAUTH_REDIRECT_URI"),
        }
    }

    /// Whether client credentials are present. When false every
    /// exchange short-circuits to the demo identity.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Build the provider authorize URL for the redirect dance.
    pub fn authorize_redirect(&self, state: &str) -> Option<String> {
        let mut url = Url::parse(&self.authorize_url).ok()?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", "openid email profile")
            .append_pair("state", state);
        Some(url.into())
    }
}

// =============================================================================
// Correlation state
// =============================================================================

/// Generate a cryptographic state nonce (CSRF correlation value).
pub fn generate_state() -> String {
    use base64::Engine;

    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// One-time store correlating an outbound redirect with its callback.
///
/// Entries are consumed on `take` and expire after 10 minutes.
#[derive(Default)]
pub struct StateStore {
    states: DashMap<String, Instant>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly minted state nonce.
    pub fn insert(&self, state: String) {
        self.states.insert(state, Instant::now());
    }

    /// Consume a state nonce. Returns false if absent or expired.
    pub fn take(&self, state: &str) -> bool {
        match self.states.remove(state) {
            Some((_, created_at)) => created_at.elapsed() <= STATE_TTL,
            None => false,
        }
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        self.states.retain(|_, created_at| created_at.elapsed() <= STATE_TTL);
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// Profile returned by the provider (or synthesized in degraded mode).
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthProfile {
    pub email: String,
    pub name: Option<String>,
}

/// Terminal failure reasons for a callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeFailure {
    /// Provider sent `error=` on the callback.
    ProviderError(String),
    /// Callback carried no authorization code.
    MissingCode,
    /// Correlation state absent, reused, or expired.
    StateMismatch,
    /// Userinfo fetch failed after a successful token exchange.
    CallbackError(String),
}

/// Outcome of one callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// Profile fetched from the real provider.
    Resolved(OAuthProfile),
    /// Demo identity substituted: provider unconfigured or unreachable.
    Degraded(OAuthProfile),
    Failed(ExchangeFailure),
}

fn demo_profile() -> OAuthProfile {
    OAuthProfile {
        email: DEMO_EMAIL.to_string(),
        name: Some(DEMO_NAME.to_string()),
    }
}

/// Response from the provider's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
}

/// Userinfo document. Only email and name are consumed.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    email: String,
    name: Option<String>,
}

/// Run the authorization-code exchange for one callback.
///
/// Token-endpoint failures degrade to the demo identity rather than
/// failing the request; a userinfo failure after a good token exchange
/// is terminal, since no fallback exists past that point.
pub async fn run_exchange(provider: &OAuthProvider, code: &str) -> ExchangeOutcome {
    if !provider.is_configured() {
        debug!("oauth client credentials not configured, using demo identity");
        return ExchangeOutcome::Degraded(demo_profile());
    }

    let client = match reqwest::Client::builder().timeout(PROVIDER_TIMEOUT).build() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "http client build failed, degrading exchange");
            return ExchangeOutcome::Degraded(demo_profile());
        }
    };

    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", provider.client_id.as_str()),
        ("client_secret", provider.client_secret.as_str()),
        ("redirect_uri", provider.redirect_uri.as_str()),
    ];

    let token_resp = match client.post(&provider.token_url).form(&params).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "token exchange unreachable, degrading to demo identity");
            return ExchangeOutcome::Degraded(demo_profile());
        }
    };
    if !token_resp.status().is_success() {
        warn!(status = %token_resp.status(), "token exchange rejected, degrading to demo identity");
        return ExchangeOutcome::Degraded(demo_profile());
    }
    let token = match token_resp.json::<TokenEndpointResponse>().await {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "token response unparseable, degrading to demo identity");
            return ExchangeOutcome::Degraded(demo_profile());
        }
    };

    // Userinfo failures are hard: a live provider granted a token, so
    // substituting the demo identity here would misattribute the login.
    let info_resp = match client
        .get(&provider.userinfo_url)
        .bearer_auth(&token.access_token)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            return ExchangeOutcome::Failed(ExchangeFailure::CallbackError(format!(
                "userinfo unreachable: {e}"
            )));
        }
    };
    if !info_resp.status().is_success() {
        return ExchangeOutcome::Failed(ExchangeFailure::CallbackError(format!(
            "userinfo HTTP {}",
            info_resp.status()
        )));
    }
    match info_resp.json::<UserInfoResponse>().await {
        Ok(info) => ExchangeOutcome::Resolved(OAuthProfile {
            email: info.email.to_lowercase(),
            name: info.name,
        }),
        Err(e) => {
            ExchangeOutcome::Failed(ExchangeFailure::CallbackError(format!(
                "userinfo unparseable: {e}"
            )))
        }
    }
}
