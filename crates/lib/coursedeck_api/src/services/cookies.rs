//! Cookie service — build and clear the session cookies.
//!
//! Three cookie sources exist for historical compatibility: the primary
//! signed session cookie, the legacy signed cookie, and the opaque
//! handle. All are httpOnly, `SameSite=Lax`, path `/`, 7-day max-age;
//! `Secure` follows the deployment environment.

use axum_extra::extract::cookie::{Cookie, SameSite};
use coursedeck_core::auth::token::SESSION_TTL_SECS;
use time::Duration;

/// Cookie name for the primary session token.
pub const SESSION_COOKIE: &str = "coursedeck_session";
/// Cookie name for the legacy session token.
pub const LEGACY_COOKIE: &str = "coursedeck_token";
/// Cookie name for the opaque session handle.
pub const HANDLE_COOKIE: &str = "coursedeck_sid";

fn build(name: &str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(max_age)
        .build()
}

/// Primary session cookie carrying the signed token.
pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    build(
        SESSION_COOKIE,
        token.to_string(),
        Duration::seconds(SESSION_TTL_SECS),
        secure,
    )
}

/// Opaque-handle cookie for the key-value session path.
pub fn handle_cookie(handle: &str, secure: bool) -> Cookie<'static> {
    build(
        HANDLE_COOKIE,
        handle.to_string(),
        Duration::seconds(SESSION_TTL_SECS),
        secure,
    )
}

/// Expired cookies clearing all three sources on logout.
pub fn clear_cookies(secure: bool) -> [Cookie<'static>; 3] {
    [
        build(SESSION_COOKIE, String::new(), Duration::ZERO, secure),
        build(LEGACY_COOKIE, String::new(), Duration::ZERO, secure),
        build(HANDLE_COOKIE, String::new(), Duration::ZERO, secure),
    ]
}
