//! Session resolution — priority-ordered fallback over token sources.
//!
//! Each source is a strategy; resolution is a fold over the ordered
//! list, stopping at the first verified identity. Malformed or expired
//! tokens never error, they fall through to the next source.

use async_trait::async_trait;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use coursedeck_core::auth::token;
use coursedeck_core::models::Role;
use coursedeck_core::store::{SessionHandleStore, UserStore};
use tracing::debug;

use super::cookies::{HANDLE_COOKIE, LEGACY_COOKIE, SESSION_COOKIE};
use crate::AppState;

/// Which source produced a resolved session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Primary signed cookie, signature verified.
    Primary,
    /// Legacy signed cookie, signature verified.
    Legacy,
    /// Legacy cookie accepted via the unverified payload decode.
    /// Weaker than the others; admin actions always re-check the store.
    WeakLegacy,
    /// Opaque handle looked up in the session store.
    Handle,
}

/// Identity recovered from an inbound request.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub identity_id: String,
    pub email: String,
    /// Role as claimed by the token source. Advisory; the authorization
    /// gate re-reads the store before acting on it.
    pub role: Role,
    pub source: TokenSource,
}

struct ResolveContext<'a> {
    jar: &'a CookieJar,
    secret: &'a [u8],
    allow_weak_decode: bool,
    users: &'a dyn UserStore,
    sessions: &'a dyn SessionHandleStore,
}

#[async_trait]
trait TokenStrategy: Sync {
    async fn try_resolve(&self, cx: &ResolveContext<'_>) -> Option<ResolvedSession>;
}

/// Primary session cookie: full signature + expiry verification.
struct PrimaryCookie;

#[async_trait]
impl TokenStrategy for PrimaryCookie {
    async fn try_resolve(&self, cx: &ResolveContext<'_>) -> Option<ResolvedSession> {
        let cookie = cx.jar.get(SESSION_COOKIE)?;
        let claims = token::verify(cx.secret, cookie.value())?;
        Some(ResolvedSession {
            identity_id: claims.sub,
            email: claims.email,
            role: claims.role,
            source: TokenSource::Primary,
        })
    }
}

/// Legacy cookie: verified with the same secret; on cryptographic
/// failure, optionally fall back to the unverified payload decode,
/// accepted only while `exp` is in the future.
struct LegacyCookie;

#[async_trait]
impl TokenStrategy for LegacyCookie {
    async fn try_resolve(&self, cx: &ResolveContext<'_>) -> Option<ResolvedSession> {
        let cookie = cx.jar.get(LEGACY_COOKIE)?;
        if let Some(claims) = token::verify(cx.secret, cookie.value()) {
            return Some(ResolvedSession {
                identity_id: claims.sub,
                email: claims.email,
                role: claims.role,
                source: TokenSource::Legacy,
            });
        }
        if !cx.allow_weak_decode {
            return None;
        }
        let claims = token::decode_unverified(cookie.value())?;
        if claims.exp <= Utc::now().timestamp() {
            return None;
        }
        debug!(email = %claims.email, "accepted legacy token via unverified decode");
        Some(ResolvedSession {
            identity_id: claims.sub,
            email: claims.email,
            role: claims.role,
            source: TokenSource::WeakLegacy,
        })
    }
}

/// Opaque handle: present in the key-value mapping or invalid.
struct OpaqueHandle;

#[async_trait]
impl TokenStrategy for OpaqueHandle {
    async fn try_resolve(&self, cx: &ResolveContext<'_>) -> Option<ResolvedSession> {
        let cookie = cx.jar.get(HANDLE_COOKIE)?;
        let identity_id = cx.sessions.get(cookie.value()).await.ok()??;
        let record = cx.users.find_by_id(&identity_id).await.ok()??;
        Some(ResolvedSession {
            identity_id: record.identity.id,
            email: record.identity.email,
            role: record.identity.role,
            source: TokenSource::Handle,
        })
    }
}

/// Attempt each token source in priority order; `None` means
/// unauthenticated. Never errors.
pub async fn resolve(state: &AppState, jar: &CookieJar) -> Option<ResolvedSession> {
    let cx = ResolveContext {
        jar,
        secret: state.config.session_secret.as_bytes(),
        allow_weak_decode: state.config.allow_weak_decode,
        users: state.users.as_ref(),
        sessions: state.sessions.as_ref(),
    };
    let chain: [&dyn TokenStrategy; 3] = [&PrimaryCookie, &LegacyCookie, &OpaqueHandle];
    for strategy in chain {
        if let Some(session) = strategy.try_resolve(&cx).await {
            return Some(session);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum_extra::extract::cookie::Cookie;
    use coursedeck_core::auth::oauth::StateStore;
    use coursedeck_core::auth::token::issue_with_ttl;
    use coursedeck_core::models::Identity;
    use coursedeck_core::store::memory::MemoryStore;

    use super::*;
    use crate::config::ApiConfig;

    const SECRET: &str = "test-secret";

    fn test_state(store: Arc<MemoryStore>) -> AppState {
        AppState {
            users: store.clone(),
            sessions: store,
            oauth_states: Arc::new(StateStore::new()),
            config: ApiConfig {
                bind_addr: "127.0.0.1:0".into(),
                database_url: String::new(),
                session_secret: SECRET.into(),
                secure_cookies: false,
                allow_weak_decode: true,
                oauth: Default::default(),
            },
        }
    }

    fn identity() -> Identity {
        Identity {
            id: "id-1".into(),
            email: "alice@example.com".into(),
            display_name: Some("Alice".into()),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn primary_cookie_resolves_first() {
        let state = test_state(Arc::new(MemoryStore::new()));
        let tok = coursedeck_core::auth::token::issue(SECRET.as_bytes(), &identity()).unwrap();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, tok));

        let resolved = resolve(&state, &jar).await.expect("resolves");
        assert_eq!(resolved.source, TokenSource::Primary);
        assert_eq!(resolved.email, "alice@example.com");
    }

    #[tokio::test]
    async fn expired_primary_falls_through_to_legacy() {
        let state = test_state(Arc::new(MemoryStore::new()));
        let expired = issue_with_ttl(SECRET.as_bytes(), &identity(), -3600).unwrap();
        let legacy = coursedeck_core::auth::token::issue(SECRET.as_bytes(), &identity()).unwrap();
        let jar = CookieJar::new()
            .add(Cookie::new(SESSION_COOKIE, expired))
            .add(Cookie::new(LEGACY_COOKIE, legacy));

        let resolved = resolve(&state, &jar).await.expect("resolves");
        assert_eq!(resolved.source, TokenSource::Legacy);
    }

    #[tokio::test]
    async fn foreign_signature_uses_weak_decode_when_enabled() {
        let state = test_state(Arc::new(MemoryStore::new()));
        // Signed with a different secret: verification fails, payload decodes.
        let foreign = coursedeck_core::auth::token::issue(b"other-secret", &identity()).unwrap();
        let jar = CookieJar::new().add(Cookie::new(LEGACY_COOKIE, foreign));

        let resolved = resolve(&state, &jar).await.expect("weak decode accepts");
        assert_eq!(resolved.source, TokenSource::WeakLegacy);
        assert_eq!(resolved.email, "alice@example.com");
    }

    #[tokio::test]
    async fn weak_decode_rejects_expired_payload() {
        let state = test_state(Arc::new(MemoryStore::new()));
        let foreign = issue_with_ttl(b"other-secret", &identity(), -3600).unwrap();
        let jar = CookieJar::new().add(Cookie::new(LEGACY_COOKIE, foreign));

        assert!(resolve(&state, &jar).await.is_none());
    }

    #[tokio::test]
    async fn weak_decode_can_be_disabled() {
        let store = Arc::new(MemoryStore::new());
        let mut state = test_state(store);
        state.config.allow_weak_decode = false;
        let foreign = coursedeck_core::auth::token::issue(b"other-secret", &identity()).unwrap();
        let jar = CookieJar::new().add(Cookie::new(LEGACY_COOKIE, foreign));

        assert!(resolve(&state, &jar).await.is_none());
    }

    #[tokio::test]
    async fn opaque_handle_is_the_last_resort() {
        let store = Arc::new(MemoryStore::new());
        let created = UserStore::create(
            store.as_ref(),
            coursedeck_core::models::NewUser {
                email: "bob@example.com".into(),
                display_name: None,
                role: Role::User,
                password_digest: None,
            },
        )
        .await
        .unwrap();
        SessionHandleStore::put(store.as_ref(), "handle-1", &created.id)
            .await
            .unwrap();

        let state = test_state(store);
        let jar = CookieJar::new().add(Cookie::new(HANDLE_COOKIE, "handle-1"));

        let resolved = resolve(&state, &jar).await.expect("handle resolves");
        assert_eq!(resolved.source, TokenSource::Handle);
        assert_eq!(resolved.email, "bob@example.com");
    }

    #[tokio::test]
    async fn no_cookies_means_unauthenticated() {
        let state = test_state(Arc::new(MemoryStore::new()));
        assert!(resolve(&state, &CookieJar::new()).await.is_none());
    }

    #[tokio::test]
    async fn malformed_tokens_never_error() {
        let state = test_state(Arc::new(MemoryStore::new()));
        let jar = CookieJar::new()
            .add(Cookie::new(SESSION_COOKIE, "garbage"))
            .add(Cookie::new(LEGACY_COOKIE, "also.garbage"))
            .add(Cookie::new(HANDLE_COOKIE, "unknown-handle"));

        assert!(resolve(&state, &jar).await.is_none());
    }
}
