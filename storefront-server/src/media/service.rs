//! Product media reconciliation
//!
//! Drives a create or update request across both stores:
//!
//! 1. validate input and run the destructive-update guard (nothing mutated yet)
//! 2. replace the main image, upload and attach new additional images
//! 3. plan and execute deletions of images that are no longer kept (only
//!    when the request carried a keep list)
//! 4. apply scalar product fields last
//! 5. re-read the product and check the main image invariant
//!
//! Blobs uploaded for a request that then fails are queued for cleanup so
//! they do not linger unreferenced.

use std::collections::HashSet;
use std::sync::Arc;

use shared::models::{AdminLog, NewProduct, Product, ProductPatch, ProductWithImages};

use super::audit::{AuditTrail, TARGET_PRODUCT};
use super::blob::{BlobGateway, IncomingFile, MediaFolder};
use super::cleanup::CleanupWorker;
use super::error::MediaError;
use super::executor::{DeletionExecutor, DeletionOutcome, METADATA_CHUNK_SIZE};
use super::keep_list::{KeepList, guard_destructive_update};
use super::planner::plan_deletions;
use super::retry::RetryPolicy;
use super::store::{AuditLog, CatalogStore, CleanupQueue, ImageRepository};

/// Store handles used by the engine
#[derive(Clone)]
pub struct MediaStores {
    pub catalog: Arc<dyn CatalogStore>,
    pub images: Arc<dyn ImageRepository>,
    pub audit: Arc<dyn AuditLog>,
    pub cleanup: Arc<dyn CleanupQueue>,
}

/// What to do with the main image on update
#[derive(Debug, Clone)]
pub enum MainImageUpdate {
    /// Field absent or sent as text: keep the current image
    Keep,
    Replace(IncomingFile),
}

/// Validated update request
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub product_id: i64,
    pub admin_id: i64,
    pub patch: ProductPatch,
    pub main_image: MainImageUpdate,
    pub additional_images: Vec<IncomingFile>,
    /// `None` when the request carried no keep list: the gallery is left
    /// as is. `Some` of an empty list clears it.
    pub keep_image_ids: Option<KeepList>,
}

/// Validated create request
#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub admin_id: i64,
    pub product: NewProduct,
    pub main_image: IncomingFile,
    pub additional_images: Vec<IncomingFile>,
}

pub struct MediaService {
    stores: MediaStores,
    gateway: Arc<BlobGateway>,
    policy: RetryPolicy,
    max_file_bytes: usize,
    chunk_size: usize,
}

impl MediaService {
    pub fn new(stores: MediaStores, gateway: Arc<BlobGateway>, max_file_bytes: usize) -> Self {
        Self {
            stores,
            gateway,
            policy: RetryPolicy::default(),
            max_file_bytes,
            chunk_size: METADATA_CHUNK_SIZE,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn gateway(&self) -> &BlobGateway {
        &self.gateway
    }

    /// Background worker draining the cleanup queue through this gateway
    pub fn cleanup_worker(&self, batch_size: i64) -> CleanupWorker {
        CleanupWorker::new(self.stores.cleanup.clone(), self.gateway.clone(), batch_size)
    }

    fn executor(&self) -> DeletionExecutor {
        DeletionExecutor::new(
            self.stores.images.clone(),
            self.stores.cleanup.clone(),
            self.gateway.clone(),
            self.policy.clone(),
        )
        .with_chunk_size(self.chunk_size)
    }

    /// Product with its images, main first
    pub async fn get_product(&self, product_id: i64) -> Result<ProductWithImages, MediaError> {
        let product = self
            .stores
            .catalog
            .find_product(product_id)
            .await?
            .ok_or(MediaError::ProductNotFound(product_id))?;
        let images = self.stores.images.list_by_product(product_id).await?;
        Ok(ProductWithImages { product, images })
    }

    /// Audit entries of a product, newest first
    pub async fn audit_history(
        &self,
        product_id: i64,
        limit: i64,
    ) -> Result<Vec<AdminLog>, MediaError> {
        Ok(self
            .stores
            .audit
            .list_for_target(TARGET_PRODUCT, product_id, limit)
            .await?)
    }

    pub async fn update_product(
        &self,
        update: ProductUpdate,
    ) -> Result<ProductWithImages, MediaError> {
        let ProductUpdate {
            product_id,
            admin_id,
            patch,
            main_image,
            additional_images,
            keep_image_ids,
        } = update;

        let product = self
            .stores
            .catalog
            .find_product(product_id)
            .await?
            .ok_or(MediaError::ProductNotFound(product_id))?;
        if let Some(Some(category_id)) = patch.category_id {
            self.ensure_category(category_id).await?;
        }
        if let MainImageUpdate::Replace(file) = &main_image {
            file.validate("main_image", self.max_file_bytes)?;
        }
        let additional = self.attached_files(additional_images)?;

        let existing = self.stores.images.list_by_product(product_id).await?;
        let current_ids: HashSet<i64> = existing.iter().map(|img| img.id).collect();
        let valid_keep = keep_image_ids
            .as_ref()
            .map(|keep| keep.validate_against(&current_ids))
            .unwrap_or_default();
        let existing_additional = existing.iter().filter(|img| !img.is_main).count();
        guard_destructive_update(product_id, &valid_keep, additional.len(), existing_additional)?;

        if let MainImageUpdate::Replace(file) = &main_image {
            self.replace_main(product_id, file).await?;
        }
        let fresh_urls = self.attach_additional(product_id, &additional).await?;

        let targets = if keep_image_ids.is_some() {
            plan_deletions(&existing, &valid_keep, &fresh_urls)
        } else {
            tracing::debug!(product_id, "No keep list sent, gallery left unchanged");
            Vec::new()
        };
        let audit = AuditTrail::new(self.stores.audit.clone(), admin_id, product_id);
        let DeletionOutcome {
            deleted,
            deferred_blobs,
        } = self
            .executor()
            .execute(product_id, &targets, &valid_keep, &audit)
            .await?;

        let product = if patch.is_empty() {
            product
        } else {
            self.stores
                .catalog
                .update_product(product_id, &patch)
                .await?
        };

        tracing::info!(
            product_id,
            admin_id,
            added = fresh_urls.len(),
            deleted = deleted.len(),
            deferred_blobs = deferred_blobs.len(),
            "Product updated"
        );
        self.with_images(product).await
    }

    pub async fn create_product(
        &self,
        request: ProductCreate,
    ) -> Result<ProductWithImages, MediaError> {
        let ProductCreate {
            admin_id,
            product,
            main_image,
            additional_images,
        } = request;

        if let Some(category_id) = product.category_id {
            self.ensure_category(category_id).await?;
        }
        main_image.validate("main_image", self.max_file_bytes)?;
        let additional = self.attached_files(additional_images)?;

        let mut uploaded = Vec::with_capacity(additional.len() + 1);
        for (file, folder) in std::iter::once((&main_image, MediaFolder::Main))
            .chain(additional.iter().map(|f| (f, MediaFolder::Additional)))
        {
            match self.gateway.upload(file, folder).await {
                Ok(blob) => uploaded.push(blob.url),
                Err(e) => {
                    self.abandon(&uploaded).await;
                    return Err(e);
                }
            }
        }

        let (main_url, additional_urls) = uploaded
            .split_first()
            .ok_or_else(|| MediaError::invalid("main_image", "Main image is required"))?;
        let created = match self
            .stores
            .catalog
            .create_product(&product, main_url, additional_urls)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                self.abandon(&uploaded).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            product_id = created.id,
            admin_id,
            images = uploaded.len(),
            "Product created"
        );
        self.with_images(created).await
    }

    async fn ensure_category(&self, category_id: i64) -> Result<(), MediaError> {
        if self.stores.catalog.category_exists(category_id).await? {
            Ok(())
        } else {
            Err(MediaError::invalid(
                "category_id",
                format!("Category {category_id} does not exist"),
            ))
        }
    }

    /// Non-empty additional files, validated
    fn attached_files(&self, files: Vec<IncomingFile>) -> Result<Vec<IncomingFile>, MediaError> {
        let files: Vec<IncomingFile> = files.into_iter().filter(|f| !f.is_empty()).collect();
        for file in &files {
            file.validate("additional_images", self.max_file_bytes)?;
        }
        Ok(files)
    }

    async fn replace_main(&self, product_id: i64, file: &IncomingFile) -> Result<(), MediaError> {
        let uploaded = self.gateway.upload(file, MediaFolder::Main).await?;
        let previous = match self
            .stores
            .images
            .replace_main_url(product_id, &uploaded.url)
            .await
        {
            Ok(previous) => previous,
            Err(e) => {
                self.abandon(std::slice::from_ref(&uploaded.url)).await;
                return Err(e.into());
            }
        };

        tracing::info!(product_id, key = %uploaded.key, "Main image replaced");
        if let Some(old_url) = previous.filter(|old| *old != uploaded.url) {
            self.executor().delete_blob(&old_url).await;
        }
        Ok(())
    }

    async fn attach_additional(
        &self,
        product_id: i64,
        files: &[IncomingFile],
    ) -> Result<Vec<String>, MediaError> {
        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            let uploaded = self.gateway.upload(file, MediaFolder::Additional).await?;
            if let Err(e) = self
                .stores
                .images
                .insert_additional(product_id, &uploaded.url)
                .await
            {
                self.abandon(std::slice::from_ref(&uploaded.url)).await;
                return Err(e.into());
            }
            urls.push(uploaded.url);
        }
        Ok(urls)
    }

    /// Queue blobs that no committed row references
    async fn abandon(&self, urls: &[String]) {
        if urls.is_empty() {
            return;
        }
        if let Err(e) = self.stores.cleanup.enqueue(urls).await {
            tracing::error!(count = urls.len(), error = %e, "Failed to queue orphaned blobs");
        } else {
            tracing::warn!(count = urls.len(), "Orphaned blobs queued for cleanup");
        }
    }

    /// Re-read the image set after a write; exactly one main image must remain
    async fn with_images(&self, product: Product) -> Result<ProductWithImages, MediaError> {
        let images = self.stores.images.list_by_product(product.id).await?;
        let main_count = images.iter().filter(|img| img.is_main).count();
        if main_count != 1 {
            tracing::error!(
                product_id = product.id,
                main_count,
                "Product does not have exactly one main image"
            );
            return Err(MediaError::MainImageMissing(product.id));
        }
        Ok(ProductWithImages { product, images })
    }
}
