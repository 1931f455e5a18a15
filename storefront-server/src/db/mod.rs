//! PostgreSQL implementations of the media engine stores

pub mod audit;
pub mod cleanup_queue;
pub mod image;
pub mod product;

use std::sync::Arc;

use sqlx::PgPool;

use crate::media::MediaStores;

/// All stores backed by one pool
pub fn stores(pool: &PgPool) -> MediaStores {
    MediaStores {
        catalog: Arc::new(product::PgCatalogStore::new(pool.clone())),
        images: Arc::new(image::PgImageRepository::new(pool.clone())),
        audit: Arc::new(audit::PgAuditLog::new(pool.clone())),
        cleanup: Arc::new(cleanup_queue::PgCleanupQueue::new(pool.clone())),
    }
}
