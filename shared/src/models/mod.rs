//! Data models
//!
//! Shared between the server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL).

pub mod admin_log;
pub mod image;
pub mod product;

// Re-exports
pub use admin_log::*;
pub use image::*;
pub use product::*;
