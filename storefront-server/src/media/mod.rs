//! Product media consistency engine
//!
//! Keeps `product_images` rows and the blobs in the object store in step
//! across create and update requests.

pub mod audit;
pub mod blob;
pub mod cleanup;
pub mod error;
pub mod executor;
pub mod keep_list;
pub mod planner;
pub mod retry;
pub mod s3;
pub mod service;
pub mod store;

pub use blob::{BlobError, BlobGateway, BlobStore, IncomingFile, MediaFolder};
pub use error::MediaError;
pub use keep_list::KeepList;
pub use retry::RetryPolicy;
pub use service::{MainImageUpdate, MediaService, MediaStores, ProductCreate, ProductUpdate};
pub use store::{AuditLog, CatalogStore, CleanupQueue, ImageRepository};
