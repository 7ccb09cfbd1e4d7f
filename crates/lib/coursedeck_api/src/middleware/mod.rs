//! Request middleware.

pub mod guard;
