//! Server configuration

use crate::error::BoxError;

/// Server configuration, loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for admin authentication
    pub jwt_secret: String,
    /// Bucket holding product images
    pub media_bucket: String,
    /// S3-compatible endpoint (R2, MinIO); AWS S3 when unset
    pub media_endpoint: Option<String>,
    /// Public domain serving the bucket, e.g. `cdn.example.com`
    pub media_public_domain: String,
    /// Per-file upload limit
    pub media_max_file_bytes: usize,
    /// Seconds between cleanup queue sweeps
    pub cleanup_interval_secs: u64,
    /// Queue entries handled per sweep
    pub cleanup_batch_size: i64,
}

/// 10MB
const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_or("HTTP_PORT", 8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            media_bucket: std::env::var("MEDIA_BUCKET")
                .unwrap_or_else(|_| "storefront-media".into()),
            media_endpoint: std::env::var("MEDIA_ENDPOINT").ok().filter(|s| !s.is_empty()),
            media_public_domain: std::env::var("MEDIA_PUBLIC_DOMAIN")
                .map_err(|_| "MEDIA_PUBLIC_DOMAIN must be set")?,
            media_max_file_bytes: env_or("MEDIA_MAX_FILE_BYTES", DEFAULT_MAX_FILE_BYTES),
            cleanup_interval_secs: env_or::<u64>("CLEANUP_INTERVAL_SECS", 60).max(1),
            cleanup_batch_size: env_or::<i64>("CLEANUP_BATCH_SIZE", 100).max(1),
            environment,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
