//! API server configuration.

use coursedeck_core::auth::oauth::OAuthProvider;
use thiserror::Error;

/// Configuration errors. All of these abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SESSION_SECRET must be set (no fallback is permitted)")]
    MissingSessionSecret,
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3400").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Session token signing secret. Required; startup fails without it.
    pub session_secret: String,
    /// Mark cookies `Secure` (set when serving over HTTPS).
    pub secure_cookies: bool,
    /// Accept the unverified legacy-token decode. Default on, matching
    /// historical behavior; disable for strict verification only.
    pub allow_weak_decode: bool,
    /// Third-party OAuth provider settings. Unconfigured credentials
    /// switch the exchange into degraded (demo identity) mode.
    pub oauth: OAuthProvider,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                 | Default                          |
    /// |--------------------------|----------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:3400`                 |
    /// | `DATABASE_URL`           | `postgres://localhost:5432/coursedeck` |
    /// | `SESSION_SECRET`         | **required**                     |
    /// | `SECURE_COOKIES`         | `false`                          |
    /// | `ALLOW_WEAK_DECODE`      | `true`                           |
    /// | `OAUTH_*`                | unset (degraded mode)            |
    pub fn from_env() -> Result<Self, ConfigError> {
        let session_secret = std::env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSessionSecret)?;

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3400".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/coursedeck".into()),
            session_secret,
            secure_cookies: env_flag("SECURE_COOKIES", false),
            allow_weak_decode: env_flag("ALLOW_WEAK_DECODE", true),
            oauth: OAuthProvider::from_env(),
        })
    }
}

/// Parse a boolean environment flag with a default.
fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}
