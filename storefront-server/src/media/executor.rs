//! Deletion executor
//!
//! Deletes planned image rows in bounded chunks, then removes their blobs.
//!
//! ```text
//! Planned -> MetadataDeleting -> MetadataDeleted -> BlobDeleting -> Done
//!                  |
//!                  +-> Error (chunk exhausted its retries)
//! ```
//!
//! Chunks commit independently: a failure in chunk N leaves chunks before it
//! deleted. Row deletes queue their blob in the same transaction, so a blob
//! that cannot be removed here is picked up later by the cleanup worker.

use std::sync::Arc;

use futures::future::join_all;
use shared::models::ProductImage;

use super::audit::AuditTrail;
use super::blob::BlobGateway;
use super::error::MediaError;
use super::keep_list::ValidKeepIds;
use super::retry::RetryPolicy;
use super::store::{CleanupQueue, ImageRepository};
use crate::error::RepoError;

/// Maximum rows per metadata delete call
pub const METADATA_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPhase {
    Planned,
    MetadataDeleting,
    MetadataDeleted,
    BlobDeleting,
    Done,
    Error,
}

/// What a successful run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionOutcome {
    /// Rows removed from the metadata store
    pub deleted: Vec<ProductImage>,
    /// Blob URLs left in the cleanup queue
    pub deferred_blobs: Vec<String>,
}

pub struct DeletionExecutor {
    images: Arc<dyn ImageRepository>,
    cleanup: Arc<dyn CleanupQueue>,
    gateway: Arc<BlobGateway>,
    policy: RetryPolicy,
    chunk_size: usize,
}

struct PhaseTracker {
    product_id: i64,
    phase: DeletionPhase,
}

impl PhaseTracker {
    fn advance(&mut self, next: DeletionPhase) {
        tracing::debug!(
            product_id = self.product_id,
            from = ?self.phase,
            to = ?next,
            "Deletion phase"
        );
        self.phase = next;
    }
}

impl DeletionExecutor {
    pub fn new(
        images: Arc<dyn ImageRepository>,
        cleanup: Arc<dyn CleanupQueue>,
        gateway: Arc<BlobGateway>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            images,
            cleanup,
            gateway,
            policy,
            chunk_size: METADATA_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Delete `targets` of `product_id`, bracketed by an audit entry.
    ///
    /// Nothing is written (not even the audit entry) when there is nothing to
    /// delete.
    pub async fn execute(
        &self,
        product_id: i64,
        targets: &[ProductImage],
        valid_keep: &ValidKeepIds,
        audit: &AuditTrail,
    ) -> Result<DeletionOutcome, MediaError> {
        if targets.is_empty() {
            return Ok(DeletionOutcome::default());
        }

        let mut tracker = PhaseTracker {
            product_id,
            phase: DeletionPhase::Planned,
        };
        let open = audit.open(valid_keep.to_vec()).await?;

        tracker.advance(DeletionPhase::MetadataDeleting);
        let mut deleted = Vec::with_capacity(targets.len());
        for (index, chunk) in targets.chunks(self.chunk_size).enumerate() {
            let ids: Vec<i64> = chunk.iter().map(|img| img.id).collect();
            match self.delete_chunk(product_id, &ids).await {
                Ok(rows) => deleted.extend(rows),
                Err(e) => {
                    tracker.advance(DeletionPhase::Error);
                    tracing::error!(
                        product_id,
                        chunk = index,
                        deleted_so_far = deleted.len(),
                        error = %e,
                        "Image metadata delete failed"
                    );
                    let err = MediaError::MetadataDelete {
                        attempts: self.policy.max_attempts,
                        source: e,
                    };
                    audit.fail(open, &err.to_string()).await;
                    return Err(err);
                }
            }
        }
        tracker.advance(DeletionPhase::MetadataDeleted);

        tracker.advance(DeletionPhase::BlobDeleting);
        let results = join_all(deleted.iter().map(|img| self.delete_blob(&img.image_url))).await;
        let deferred_blobs: Vec<String> = deleted
            .iter()
            .zip(results)
            .filter(|(_, removed)| !removed)
            .map(|(img, _)| img.image_url.clone())
            .collect();

        tracker.advance(DeletionPhase::Done);
        audit.succeed(open, deleted.len()).await;

        tracing::info!(
            product_id,
            deleted = deleted.len(),
            deferred_blobs = deferred_blobs.len(),
            "Product images deleted"
        );
        Ok(DeletionOutcome {
            deleted,
            deferred_blobs,
        })
    }

    async fn delete_chunk(&self, product_id: i64, ids: &[i64]) -> Result<Vec<ProductImage>, RepoError> {
        let images = &self.images;
        self.policy
            .run(
                "image metadata delete",
                || async move { images.delete_by_ids(product_id, ids).await },
                RepoError::is_transient,
            )
            .await
    }

    /// Remove one blob; returns whether it is gone.
    ///
    /// On failure the URL stays in the cleanup queue.
    pub async fn delete_blob(&self, url: &str) -> bool {
        let gateway = &self.gateway;
        let result = self
            .policy
            .run(
                "blob delete",
                || async move { gateway.delete(url).await },
                MediaError::is_transient,
            )
            .await;

        match result {
            Ok(()) => {
                if let Err(e) = self.cleanup.complete(url).await {
                    tracing::warn!(url = %url, error = %e, "Failed to clear cleanup queue entry");
                }
                true
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Blob delete failed, left for cleanup worker");
                false
            }
        }
    }
}
