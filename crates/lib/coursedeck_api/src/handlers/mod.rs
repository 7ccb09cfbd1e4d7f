//! Request handlers.

pub mod auth;
pub mod health;
pub mod members;
pub mod oauth;
