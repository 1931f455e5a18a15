//! Admin authentication

pub mod admin_auth;

pub use admin_auth::{AdminIdentity, Role};
