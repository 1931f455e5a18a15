//! Admin Audit Log Model

use serde::{Deserialize, Serialize};

/// Audit row written by admin operations
///
/// `description` is a JSON status document whose shape depends on `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AdminLog {
    pub id: i64,
    pub admin_id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub description: serde_json::Value,
    pub created_at: i64,
}
