//! Blob cleanup queue (outbox)
//!
//! Rows are inserted in the same transaction that drops the last reference
//! to a blob, so a crash between the metadata commit and the blob delete
//! never loses track of the object.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::error::RepoResult;
use crate::media::store::{CleanupQueue, PendingBlobDeletion};

/// Queue URLs on an open connection or transaction (idempotent per URL)
pub async fn enqueue_on(
    conn: &mut PgConnection,
    image_urls: &[String],
    now: i64,
) -> Result<(), sqlx::Error> {
    if image_urls.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO blob_cleanup_queue (image_url, attempts, next_attempt_at, created_at)
        SELECT url, 0, $2, $2 FROM UNNEST($1::text[]) AS url
        ON CONFLICT (image_url) DO NOTHING
        "#,
    )
    .bind(image_urls)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgCleanupQueue {
    pool: PgPool,
}

impl PgCleanupQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CleanupQueue for PgCleanupQueue {
    async fn enqueue(&self, image_urls: &[String]) -> RepoResult<()> {
        let mut conn = self.pool.acquire().await?;
        enqueue_on(&mut conn, image_urls, shared::util::now_millis()).await?;
        Ok(())
    }

    async fn fetch_due(&self, now: i64, limit: i64) -> RepoResult<Vec<PendingBlobDeletion>> {
        let rows = sqlx::query_as::<_, PendingBlobDeletion>(
            r#"
            SELECT id, image_url, attempts, last_error, next_attempt_at, created_at
            FROM blob_cleanup_queue
            WHERE next_attempt_at <= $1
            ORDER BY next_attempt_at, id
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn complete(&self, image_url: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM blob_cleanup_queue WHERE image_url = $1")
            .bind(image_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reschedule(&self, id: i64, next_attempt_at: i64, error: &str) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE blob_cleanup_queue
            SET attempts = attempts + 1, last_error = $2, next_attempt_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
