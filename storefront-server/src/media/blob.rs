//! Blob gateway
//!
//! Stores image bytes under generated keys and translates between keys and
//! the public URLs recorded in `product_images`.
//!
//! Keys look like `products/main/<uuid>.<ext>`; the public URL is
//! `https://{public_domain}/{key}`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::error::MediaError;

/// Accepted upload extensions
pub const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Extension used when the upload has none
const FALLBACK_EXTENSION: &str = "bin";

#[derive(Debug, Error)]
pub enum BlobError {
    /// Network trouble, throttling, 5xx: worth another try
    #[error("transient object store failure: {0}")]
    Transient(String),
    /// Permission or request errors: retrying will not help
    #[error("object store rejected request: {0}")]
    Rejected(String),
}

impl BlobError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BlobError::Transient(_))
    }
}

/// Object store
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobError>;

    /// `Ok(None)` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError>;

    /// Deleting a missing key succeeds
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Uploaded file as received from a multipart form
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercased extension of the original file name
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Reject empty, oversized and non-image uploads
    pub fn validate(&self, field: &'static str, max_bytes: usize) -> Result<(), MediaError> {
        if self.is_empty() {
            return Err(MediaError::invalid(field, "Empty file"));
        }
        if self.bytes.len() > max_bytes {
            return Err(MediaError::invalid(
                field,
                format!(
                    "File too large: {} bytes (max {max_bytes})",
                    self.bytes.len()
                ),
            ));
        }
        match self.extension() {
            Some(ext) if !SUPPORTED_FORMATS.contains(&ext.as_str()) => Err(MediaError::invalid(
                field,
                format!(
                    "Unsupported format: {ext}. Supported: {}",
                    SUPPORTED_FORMATS.join(", ")
                ),
            )),
            _ => Ok(()),
        }
    }

    fn resolved_content_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first_raw())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

/// Logical folder of a product image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Main,
    Additional,
}

impl MediaFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFolder::Main => "products/main",
            MediaFolder::Additional => "products/additional",
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlob {
    pub key: String,
    pub url: String,
}

/// Key/URL aware front of a [`BlobStore`]
#[derive(Clone)]
pub struct BlobGateway {
    store: Arc<dyn BlobStore>,
    public_domain: String,
}

impl BlobGateway {
    /// `public_domain` may be given with or without scheme and trailing slash
    pub fn new(store: Arc<dyn BlobStore>, public_domain: &str) -> Self {
        let domain = public_domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        Self {
            store,
            public_domain: domain,
        }
    }

    /// Fresh collision-free key for an upload
    pub fn generate_key(folder: MediaFolder, file: &IncomingFile) -> String {
        let ext = file
            .extension()
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        format!("{}/{}.{ext}", folder.as_str(), uuid::Uuid::new_v4())
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}/{key}", self.public_domain)
    }

    /// Key behind a public URL, `None` for URLs not served by this gateway
    pub fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))?;
        let key = rest.strip_prefix(self.public_domain.as_str())?.strip_prefix('/')?;
        let key = key.split(['?', '#']).next().unwrap_or_default();
        (!key.is_empty()).then_some(key)
    }

    pub async fn upload(
        &self,
        file: &IncomingFile,
        folder: MediaFolder,
    ) -> Result<UploadedBlob, MediaError> {
        let key = Self::generate_key(folder, file);
        let content_type = file.resolved_content_type();

        self.store
            .put(&key, file.bytes.clone(), &content_type)
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "Blob upload failed");
                MediaError::Upload(e)
            })?;

        tracing::debug!(key = %key, size = file.bytes.len(), "Blob uploaded");
        Ok(UploadedBlob {
            url: self.public_url(&key),
            key,
        })
    }

    /// Delete the blob behind a public URL.
    ///
    /// URLs outside the public domain have no key here and are skipped.
    pub async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let Some(key) = self.key_from_url(url) else {
            tracing::warn!(url = %url, "URL is not served by the media domain, skipping delete");
            return Ok(());
        };
        self.store.delete(key).await.map_err(MediaError::Delete)
    }

    /// Read a blob by key
    pub async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        self.store.get(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    }

    #[async_trait]
    impl BlobStore for MapStore {
        async fn put(&self, key: &str, bytes: Vec<u8>, ct: &str) -> Result<(), BlobError> {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), (bytes, ct.to_string()));
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
            Ok(self.objects.lock().unwrap().get(key).map(|(b, _)| b.clone()))
        }

        async fn delete(&self, key: &str) -> Result<(), BlobError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn file(name: Option<&str>, bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            file_name: name.map(str::to_string),
            content_type: None,
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn key_layout() {
        let key = BlobGateway::generate_key(MediaFolder::Main, &file(Some("Photo.PNG"), b"x"));
        assert!(key.starts_with("products/main/"));
        assert!(key.ends_with(".png"));

        let key = BlobGateway::generate_key(MediaFolder::Additional, &file(None, b"x"));
        assert!(key.starts_with("products/additional/"));
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn keys_are_unique() {
        let f = file(Some("a.jpg"), b"x");
        let a = BlobGateway::generate_key(MediaFolder::Main, &f);
        let b = BlobGateway::generate_key(MediaFolder::Main, &f);
        assert_ne!(a, b);
    }

    #[test]
    fn url_key_round_trip() {
        let gw = BlobGateway::new(Arc::new(MapStore::default()), "https://cdn.example.com/");
        let url = gw.public_url("products/main/abc.png");
        assert_eq!(url, "https://cdn.example.com/products/main/abc.png");
        assert_eq!(gw.key_from_url(&url), Some("products/main/abc.png"));
    }

    #[test]
    fn foreign_urls_have_no_key() {
        let gw = BlobGateway::new(Arc::new(MapStore::default()), "cdn.example.com");
        assert_eq!(gw.key_from_url("https://other.example.com/products/main/a.png"), None);
        assert_eq!(gw.key_from_url("https://cdn.example.com.evil.io/a.png"), None);
        assert_eq!(gw.key_from_url("https://cdn.example.com/"), None);
        assert_eq!(gw.key_from_url("not a url"), None);
    }

    #[test]
    fn validation() {
        assert!(file(Some("a.png"), b"").validate("main_image", 10).is_err());
        assert!(file(Some("a.png"), &[0; 11]).validate("main_image", 10).is_err());
        assert!(file(Some("a.exe"), b"x").validate("main_image", 10).is_err());
        assert!(file(Some("a.webp"), b"x").validate("main_image", 10).is_ok());
        assert!(file(None, b"x").validate("main_image", 10).is_ok());
    }

    #[test]
    fn content_type_falls_back_to_extension() {
        assert_eq!(file(Some("a.png"), b"x").resolved_content_type(), "image/png");
        let mut f = file(Some("a.png"), b"x");
        f.content_type = Some("image/webp".into());
        assert_eq!(f.resolved_content_type(), "image/webp");
        assert_eq!(file(None, b"x").resolved_content_type(), "application/octet-stream");
    }

    #[tokio::test]
    async fn upload_then_delete() {
        let store = Arc::new(MapStore::default());
        let gw = BlobGateway::new(store.clone(), "cdn.example.com");

        let uploaded = gw
            .upload(&file(Some("a.jpg"), b"jpeg"), MediaFolder::Additional)
            .await
            .unwrap();
        assert_eq!(gw.key_from_url(&uploaded.url), Some(uploaded.key.as_str()));
        assert_eq!(gw.fetch(&uploaded.key).await.unwrap(), Some(b"jpeg".to_vec()));
        assert_eq!(store.objects.lock().unwrap()[&uploaded.key].1, "image/jpeg");

        gw.delete(&uploaded.url).await.unwrap();
        assert_eq!(gw.fetch(&uploaded.key).await.unwrap(), None);
        // foreign URL is a no-op
        gw.delete("https://elsewhere.example.com/x.png").await.unwrap();
    }
}
