//! Session token generation and verification.
//!
//! Tokens are self-contained HS256 JWTs with a 7-day lifetime. Besides
//! the normal verified decode there is an explicit *unverified* decode
//! used only by the legacy-cookie fallback; it skips the signature and
//! must be gated on expiry by the caller.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::models::{Identity, Role};

/// Session token lifetime: 7 days.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject — identity ID.
    pub sub: String,
    /// Identity email, lowercased.
    pub email: String,
    /// Role at issue time. Advisory only; admin actions re-read the store.
    pub role: Role,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// Mint a signed session token for a resolved identity.
pub fn issue(secret: &[u8], identity: &Identity) -> Result<String, AuthError> {
    issue_with_ttl(secret, identity, SESSION_TTL_SECS)
}

/// Mint a token with an explicit lifetime in seconds. Negative values
/// produce an already-expired token (used by tests).
pub fn issue_with_ttl(
    secret: &[u8],
    identity: &Identity,
    ttl_secs: i64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: identity.id.clone(),
        email: identity.email.clone(),
        role: identity.role,
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Token(format!("jwt encode: {e}")))
}

/// Verify a session token, returning the claims on success.
///
/// Signature and expiry failures both yield `None`; a malformed token
/// never errors.
pub fn verify(secret: &[u8], token: &str) -> Option<SessionClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<SessionClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Claims shape tolerated by the unverified decode. Legacy tokens may
/// lack `sub` or `role`.
#[derive(Debug, Deserialize)]
struct LooseClaims {
    sub: Option<String>,
    email: String,
    role: Option<Role>,
    exp: i64,
    iat: Option<i64>,
}

/// Decode a token's payload segment **without** verifying the signature.
///
/// Used only by the legacy-cookie fallback; the resolver must reject the
/// result when `exp` is in the past, and the authorization gate always
/// re-reads the role from the store, so an unverified `role` claim can
/// never grant admin by itself.
pub fn decode_unverified(token: &str) -> Option<SessionClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let loose: LooseClaims = serde_json::from_slice(&bytes).ok()?;
    Some(SessionClaims {
        sub: loose.sub.unwrap_or_default(),
        email: loose.email.to_lowercase(),
        role: loose.role.unwrap_or(Role::User),
        exp: loose.exp,
        iat: loose.iat.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id: "id-1".into(),
            email: "alice@example.com".into(),
            display_name: Some("Alice".into()),
            role: Role::User,
        }
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let token = issue(b"secret", &identity()).unwrap();
        let claims = verify(b"secret", &token).expect("valid token");
        assert_eq!(claims.sub, "id-1");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::User);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = issue(b"secret", &identity()).unwrap();
        assert!(verify(b"other-secret", &token).is_none());
    }

    #[test]
    fn verify_rejects_expired_token() {
        // Well past the default validation leeway.
        let token = issue_with_ttl(b"secret", &identity(), -3600).unwrap();
        assert!(verify(b"secret", &token).is_none());
    }

    #[test]
    fn verify_never_panics_on_garbage() {
        assert!(verify(b"secret", "not-a-token").is_none());
        assert!(verify(b"secret", "a.b.c").is_none());
        assert!(verify(b"secret", "").is_none());
    }

    #[test]
    fn unverified_decode_ignores_signature() {
        let token = issue(b"secret", &identity()).unwrap();
        // Tamper with the signature segment.
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[2] = "AAAA";
        let tampered = parts.join(".");
        assert!(verify(b"secret", &tampered).is_none());
        let claims = decode_unverified(&tampered).expect("payload decodes");
        assert_eq!(claims.email, "alice@example.com");
    }

    #[test]
    fn unverified_decode_rejects_garbage() {
        assert!(decode_unverified("garbage").is_none());
        assert!(decode_unverified("a.!!!.c").is_none());
    }
}
