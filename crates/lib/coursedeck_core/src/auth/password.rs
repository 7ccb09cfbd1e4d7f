//! Password digestion.
//!
//! Deterministic SHA-256 hex digests: the same input always yields the
//! same digest, so `verify` is a recompute-and-compare. Digests are
//! one-way; plaintext is never stored.

use sha2::{Digest, Sha256};

/// Digest a plaintext password for storage.
pub fn digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify a plaintext password against a stored digest.
pub fn verify(password: &str, stored: &str) -> bool {
    digest(password) == stored
}
