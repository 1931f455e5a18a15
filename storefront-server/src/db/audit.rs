//! Admin audit log (`admin_logs`)

use async_trait::async_trait;
use shared::models::AdminLog;
use sqlx::PgPool;

use crate::error::{RepoError, RepoResult};
use crate::media::store::{AuditLog, NewAuditEntry};

#[derive(Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn open(&self, entry: NewAuditEntry) -> RepoResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO admin_logs (admin_id, action, target_type, target_id, description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(entry.admin_id)
        .bind(&entry.action)
        .bind(&entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.description)
        .bind(shared::util::now_millis())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn close(&self, id: i64, description: &serde_json::Value) -> RepoResult<()> {
        let result = sqlx::query("UPDATE admin_logs SET description = $2 WHERE id = $1")
            .bind(id)
            .bind(description)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("admin log {id}")));
        }
        Ok(())
    }

    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: i64,
        limit: i64,
    ) -> RepoResult<Vec<AdminLog>> {
        let rows = sqlx::query_as::<_, AdminLog>(
            "SELECT id, admin_id, action, target_type, target_id, description, created_at \
             FROM admin_logs \
             WHERE target_type = $1 AND target_id = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3",
        )
        .bind(target_type)
        .bind(target_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
