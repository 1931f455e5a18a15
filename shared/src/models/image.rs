//! Product Image Model

use serde::{Deserialize, Serialize};

/// Image row of a product gallery
///
/// Exactly one row per product carries `is_main = true` at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    /// Fully-qualified public URL, derived from the blob key
    pub image_url: String,
    pub is_main: bool,
    pub created_at: i64,
}
