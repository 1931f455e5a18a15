//! Application state for storefront-server

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::BoxError;
use crate::media::s3::S3BlobStore;
use crate::media::{BlobGateway, MediaService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Product media engine
    pub media: Arc<MediaService>,
    /// JWT secret for admin authentication
    pub jwt_secret: Arc<str>,
    /// Per-file upload limit, also bounds request bodies
    pub max_file_bytes: usize,
}

impl AppState {
    /// Create a new AppState: connect, migrate, wire the S3 gateway
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let store =
            S3BlobStore::from_env(&config.media_bucket, config.media_endpoint.as_deref()).await;
        let gateway = Arc::new(BlobGateway::new(
            Arc::new(store),
            &config.media_public_domain,
        ));
        let media = MediaService::new(
            crate::db::stores(&pool),
            gateway,
            config.media_max_file_bytes,
        );

        tracing::info!(
            bucket = %config.media_bucket,
            public_domain = %config.media_public_domain,
            "Media store ready"
        );

        Ok(Self::from_parts(
            media,
            &config.jwt_secret,
            config.media_max_file_bytes,
        ))
    }

    /// Assemble state from an already built engine
    pub fn from_parts(media: MediaService, jwt_secret: &str, max_file_bytes: usize) -> Self {
        Self {
            media: Arc::new(media),
            jwt_secret: Arc::from(jwt_secret),
            max_file_bytes,
        }
    }
}
