//! # coursedeck_core
//!
//! Core domain logic for the Coursedeck authentication service:
//! identity models, password digestion, session tokens, credential
//! and OAuth flows, and the user/session store abstractions.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
