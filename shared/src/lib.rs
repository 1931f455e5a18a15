//! Shared types for the storefront
//!
//! Error system, catalog models and small utilities used by the server
//! and by anything that speaks its HTTP API.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
