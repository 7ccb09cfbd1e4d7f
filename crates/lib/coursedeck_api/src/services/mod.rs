//! Service layer.

pub mod authz;
pub mod cookies;
pub mod session;
