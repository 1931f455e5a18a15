//! In-memory stores for engine and API tests
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::models::{AdminLog, NewProduct, Product, ProductImage, ProductPatch};
use storefront_server::error::{RepoError, RepoResult};
use storefront_server::media::store::{NewAuditEntry, PendingBlobDeletion};
use storefront_server::media::{
    AuditLog, BlobError, BlobGateway, BlobStore, CatalogStore, CleanupQueue, ImageRepository,
    IncomingFile, KeepList, MainImageUpdate, MediaService, MediaStores, ProductUpdate, RetryPolicy,
};

pub const DOMAIN: &str = "cdn.test.local";
pub const MAX_FILE_BYTES: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// Relational side
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Tables {
    pub categories: HashSet<i64>,
    pub products: BTreeMap<i64, Product>,
    pub images: BTreeMap<i64, ProductImage>,
    pub logs: BTreeMap<i64, AdminLog>,
    pub queue: BTreeMap<i64, PendingBlobDeletion>,
    next_product: i64,
    next_image: i64,
    next_log: i64,
    next_queue: i64,
    clock: i64,
}

impl Tables {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn add_image(&mut self, product_id: i64, url: &str, is_main: bool) -> ProductImage {
        self.next_image += 1;
        let image = ProductImage {
            id: self.next_image,
            product_id,
            image_url: url.to_string(),
            is_main,
            created_at: self.tick(),
        };
        self.images.insert(image.id, image.clone());
        image
    }

    fn enqueue(&mut self, url: &str) {
        if self.queue.values().any(|e| e.image_url == url) {
            return;
        }
        self.next_queue += 1;
        let now = self.tick();
        self.queue.insert(
            self.next_queue,
            PendingBlobDeletion {
                id: self.next_queue,
                image_url: url.to_string(),
                attempts: 0,
                last_error: None,
                next_attempt_at: 0,
                created_at: now,
            },
        );
    }
}

/// Every relational store over one set of tables
#[derive(Default)]
pub struct MemoryDb {
    pub tables: Mutex<Tables>,
    /// `delete_by_ids` calls made so far
    pub delete_calls: AtomicUsize,
    /// Calls with index >= this value fail (transiently)
    pub fail_deletes_from_call: Mutex<Option<usize>>,
    /// The next N `delete_by_ids` calls fail (transiently)
    pub flaky_deletes: AtomicUsize,
    pub fail_audit_open: AtomicBool,
    pub fail_audit_close: AtomicBool,
    pub fail_product_insert: AtomicBool,
}

impl MemoryDb {
    pub fn images_of(&self, product_id: i64) -> Vec<ProductImage> {
        sorted_images(&self.tables.lock().unwrap(), product_id)
    }

    pub fn logs(&self) -> Vec<AdminLog> {
        self.tables.lock().unwrap().logs.values().cloned().collect()
    }

    pub fn queued_urls(&self) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .queue
            .values()
            .map(|e| e.image_url.clone())
            .collect()
    }

    /// Raw image row, bypassing every store rule
    pub fn insert_image(&self, product_id: i64, url: &str, is_main: bool) -> ProductImage {
        self.tables.lock().unwrap().add_image(product_id, url, is_main)
    }

    pub fn enqueue_url(&self, url: &str) {
        self.tables.lock().unwrap().enqueue(url);
    }

    pub fn add_category(&self, id: i64) {
        self.tables.lock().unwrap().categories.insert(id);
    }
}

fn sorted_images(tables: &Tables, product_id: i64) -> Vec<ProductImage> {
    let mut rows: Vec<ProductImage> = tables
        .images
        .values()
        .filter(|img| img.product_id == product_id)
        .cloned()
        .collect();
    rows.sort_by_key(|img| (!img.is_main, img.created_at, img.id));
    rows
}

#[async_trait]
impl CatalogStore for MemoryDb {
    async fn find_product(&self, product_id: i64) -> RepoResult<Option<Product>> {
        Ok(self.tables.lock().unwrap().products.get(&product_id).cloned())
    }

    async fn category_exists(&self, category_id: i64) -> RepoResult<bool> {
        Ok(self.tables.lock().unwrap().categories.contains(&category_id))
    }

    async fn create_product(
        &self,
        data: &NewProduct,
        main_url: &str,
        additional_urls: &[String],
    ) -> RepoResult<Product> {
        if self.fail_product_insert.load(Ordering::SeqCst) {
            return Err(RepoError::Database("insert failed".into()));
        }
        let mut t = self.tables.lock().unwrap();
        t.next_product += 1;
        let product = Product {
            id: t.next_product,
            name: data.name.clone(),
            description: data.description.clone(),
            price: data.price,
            stock: data.stock,
            category_id: data.category_id,
            created_at: t.tick(),
        };
        t.products.insert(product.id, product.clone());
        t.add_image(product.id, main_url, true);
        for url in additional_urls {
            t.add_image(product.id, url, false);
        }
        Ok(product)
    }

    async fn update_product(&self, product_id: i64, patch: &ProductPatch) -> RepoResult<Product> {
        let mut t = self.tables.lock().unwrap();
        let product = t
            .products
            .get_mut(&product_id)
            .ok_or_else(|| RepoError::NotFound(format!("product {product_id}")))?;
        patch.apply_to(product);
        Ok(product.clone())
    }
}

#[async_trait]
impl ImageRepository for MemoryDb {
    async fn list_by_product(&self, product_id: i64) -> RepoResult<Vec<ProductImage>> {
        Ok(self.images_of(product_id))
    }

    async fn insert_additional(
        &self,
        product_id: i64,
        image_url: &str,
    ) -> RepoResult<ProductImage> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .add_image(product_id, image_url, false))
    }

    async fn replace_main_url(
        &self,
        product_id: i64,
        image_url: &str,
    ) -> RepoResult<Option<String>> {
        let mut t = self.tables.lock().unwrap();
        let main = t
            .images
            .values_mut()
            .find(|img| img.product_id == product_id && img.is_main);
        match main {
            Some(img) => {
                let old = std::mem::replace(&mut img.image_url, image_url.to_string());
                if old != image_url {
                    t.enqueue(&old);
                }
                Ok(Some(old))
            }
            None => {
                t.add_image(product_id, image_url, true);
                Ok(None)
            }
        }
    }

    async fn delete_by_ids(&self, product_id: i64, ids: &[i64]) -> RepoResult<Vec<ProductImage>> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(from) = *self.fail_deletes_from_call.lock().unwrap()
            && call >= from
        {
            return Err(RepoError::Database(format!("delete call {call} failed")));
        }
        if self
            .flaky_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RepoError::Database("connection reset".into()));
        }

        let mut t = self.tables.lock().unwrap();
        let mut deleted = Vec::new();
        for id in ids {
            let matches = t
                .images
                .get(id)
                .is_some_and(|img| img.product_id == product_id && !img.is_main);
            if matches && let Some(img) = t.images.remove(id) {
                t.enqueue(&img.image_url);
                deleted.push(img);
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl AuditLog for MemoryDb {
    async fn open(&self, entry: NewAuditEntry) -> RepoResult<i64> {
        if self.fail_audit_open.load(Ordering::SeqCst) {
            return Err(RepoError::Database("audit insert failed".into()));
        }
        let mut t = self.tables.lock().unwrap();
        t.next_log += 1;
        let log = AdminLog {
            id: t.next_log,
            admin_id: entry.admin_id,
            action: entry.action,
            target_type: entry.target_type,
            target_id: entry.target_id,
            description: entry.description,
            created_at: t.tick(),
        };
        t.logs.insert(log.id, log.clone());
        Ok(log.id)
    }

    async fn close(&self, id: i64, description: &serde_json::Value) -> RepoResult<()> {
        if self.fail_audit_close.load(Ordering::SeqCst) {
            return Err(RepoError::Database("audit update failed".into()));
        }
        let mut t = self.tables.lock().unwrap();
        let log = t
            .logs
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(format!("admin log {id}")))?;
        log.description = description.clone();
        Ok(())
    }

    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: i64,
        limit: i64,
    ) -> RepoResult<Vec<AdminLog>> {
        let t = self.tables.lock().unwrap();
        Ok(t.logs
            .values()
            .rev()
            .filter(|l| l.target_type == target_type && l.target_id == target_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CleanupQueue for MemoryDb {
    async fn enqueue(&self, image_urls: &[String]) -> RepoResult<()> {
        let mut t = self.tables.lock().unwrap();
        for url in image_urls {
            t.enqueue(url);
        }
        Ok(())
    }

    async fn fetch_due(&self, now: i64, limit: i64) -> RepoResult<Vec<PendingBlobDeletion>> {
        let t = self.tables.lock().unwrap();
        Ok(t.queue
            .values()
            .filter(|e| e.next_attempt_at <= now)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn complete(&self, image_url: &str) -> RepoResult<()> {
        self.tables
            .lock()
            .unwrap()
            .queue
            .retain(|_, e| e.image_url != image_url);
        Ok(())
    }

    async fn reschedule(&self, id: i64, next_attempt_at: i64, error: &str) -> RepoResult<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(entry) = t.queue.get_mut(&id) {
            entry.attempts += 1;
            entry.next_attempt_at = next_attempt_at;
            entry.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob side
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryBlobStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_deletes: AtomicBool,
    pub fail_puts: AtomicBool,
    pub delete_calls: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), BlobError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(BlobError::Rejected("put refused".into()));
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Transient("store unreachable".into()));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub db: Arc<MemoryDb>,
    pub blobs: Arc<MemoryBlobStore>,
    pub gateway: Arc<BlobGateway>,
}

impl Harness {
    pub fn new() -> Self {
        let blobs = Arc::new(MemoryBlobStore::default());
        Self {
            db: Arc::new(MemoryDb::default()),
            gateway: Arc::new(BlobGateway::new(blobs.clone(), DOMAIN)),
            blobs,
        }
    }

    pub fn stores(&self) -> MediaStores {
        MediaStores {
            catalog: self.db.clone(),
            images: self.db.clone(),
            audit: self.db.clone(),
            cleanup: self.db.clone(),
        }
    }

    /// Engine with immediate retries (3 attempts)
    pub fn service(&self) -> MediaService {
        MediaService::new(self.stores(), self.gateway.clone(), MAX_FILE_BYTES)
            .with_retry_policy(RetryPolicy::immediate(3))
    }

    /// Product with a main image and `additional` extra images, blobs stored.
    ///
    /// On a fresh harness the main image gets id 1 and the extras 2, 3, ...
    pub fn seed_product(&self, additional: usize) -> i64 {
        let urls: Vec<String> = (0..=additional)
            .map(|n| {
                let folder = if n == 0 { "main" } else { "additional" };
                let key = format!("products/{folder}/seed-{n}.png");
                self.blobs
                    .objects
                    .lock()
                    .unwrap()
                    .insert(key.clone(), b"seed".to_vec());
                self.gateway.public_url(&key)
            })
            .collect();

        let mut t = self.db.tables.lock().unwrap();
        t.next_product += 1;
        let product_id = t.next_product;
        let created_at = t.tick();
        t.products.insert(
            product_id,
            Product {
                id: product_id,
                name: "Seeded".into(),
                description: String::new(),
                price: 1000,
                stock: 1,
                category_id: None,
                created_at,
            },
        );
        for (n, url) in urls.iter().enumerate() {
            t.add_image(product_id, url, n == 0);
        }
        product_id
    }

    pub fn blob_exists(&self, url: &str) -> bool {
        self.gateway
            .key_from_url(url)
            .is_some_and(|key| self.blobs.contains(key))
    }
}

pub fn png(name: &str) -> IncomingFile {
    IncomingFile {
        file_name: Some(name.to_string()),
        content_type: Some("image/png".into()),
        bytes: b"\x89PNG fake".to_vec(),
    }
}

/// Update request that only touches images
pub fn image_update(product_id: i64, keep: &str, files: Vec<IncomingFile>) -> ProductUpdate {
    ProductUpdate {
        product_id,
        admin_id: 1,
        patch: ProductPatch::default(),
        main_image: MainImageUpdate::Keep,
        additional_images: files,
        keep_image_ids: Some(KeepList::from_form_values(&[keep])),
    }
}
