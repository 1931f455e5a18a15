//! Storage seams of the media engine
//!
//! The reconciler only talks to these traits. PostgreSQL implementations
//! live in `crate::db`; tests plug in in-memory ones.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::{AdminLog, NewProduct, Product, ProductImage, ProductPatch};

use crate::error::RepoResult;

/// Product image metadata store
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// All images of a product, main image first, then by id
    async fn list_by_product(&self, product_id: i64) -> RepoResult<Vec<ProductImage>>;

    /// Insert an additional (non-main) image row
    async fn insert_additional(&self, product_id: i64, image_url: &str)
    -> RepoResult<ProductImage>;

    /// Point the main row at `image_url`, creating it when missing.
    ///
    /// Returns the previous main URL, which is queued for blob cleanup in the
    /// same transaction.
    async fn replace_main_url(&self, product_id: i64, image_url: &str)
    -> RepoResult<Option<String>>;

    /// Delete the given rows of one product and queue their blobs for cleanup.
    ///
    /// Ids that are missing or belong to another product are ignored, so
    /// replaying a chunk is harmless. Returns the rows actually deleted.
    async fn delete_by_ids(&self, product_id: i64, ids: &[i64]) -> RepoResult<Vec<ProductImage>>;
}

/// Product and category store
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_product(&self, product_id: i64) -> RepoResult<Option<Product>>;

    async fn category_exists(&self, category_id: i64) -> RepoResult<bool>;

    /// Insert a product with its main and additional images atomically
    async fn create_product(
        &self,
        data: &NewProduct,
        main_url: &str,
        additional_urls: &[String],
    ) -> RepoResult<Product>;

    /// Apply a scalar patch and return the updated product
    async fn update_product(&self, product_id: i64, patch: &ProductPatch) -> RepoResult<Product>;
}

/// Audit row to open
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub admin_id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub description: serde_json::Value,
}

/// Admin audit log store
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Insert an entry and return its id
    async fn open(&self, entry: NewAuditEntry) -> RepoResult<i64>;

    /// Replace the status document of an open entry
    async fn close(&self, id: i64, description: &serde_json::Value) -> RepoResult<()>;

    /// Most recent entries for one target
    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: i64,
        limit: i64,
    ) -> RepoResult<Vec<AdminLog>>;
}

/// Queued blob deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingBlobDeletion {
    pub id: i64,
    pub image_url: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: i64,
    pub created_at: i64,
}

/// Outbox of blobs awaiting deletion
#[async_trait]
pub trait CleanupQueue: Send + Sync {
    /// Queue URLs for deletion (already-queued URLs are left as they are)
    async fn enqueue(&self, image_urls: &[String]) -> RepoResult<()>;

    /// Entries whose `next_attempt_at` has passed, oldest first
    async fn fetch_due(&self, now: i64, limit: i64) -> RepoResult<Vec<PendingBlobDeletion>>;

    /// Drop the entry for a blob that is gone
    async fn complete(&self, image_url: &str) -> RepoResult<()>;

    /// Record a failed attempt and push the entry back
    async fn reschedule(&self, id: i64, next_attempt_at: i64, error: &str) -> RepoResult<()>;
}
