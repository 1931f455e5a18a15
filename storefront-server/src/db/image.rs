//! Product image metadata (`product_images`)

use async_trait::async_trait;
use shared::models::ProductImage;
use sqlx::PgPool;

use super::cleanup_queue::enqueue_on;
use crate::error::RepoResult;
use crate::media::store::ImageRepository;

const IMAGE_COLUMNS: &str = "id, product_id, image_url, is_main, created_at";

#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn list_by_product(&self, product_id: i64) -> RepoResult<Vec<ProductImage>> {
        let rows = sqlx::query_as::<_, ProductImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM product_images \
             WHERE product_id = $1 \
             ORDER BY is_main DESC, created_at, id"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_additional(
        &self,
        product_id: i64,
        image_url: &str,
    ) -> RepoResult<ProductImage> {
        let row = sqlx::query_as::<_, ProductImage>(&format!(
            "INSERT INTO product_images (product_id, image_url, is_main, created_at) \
             VALUES ($1, $2, FALSE, $3) \
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(product_id)
        .bind(image_url)
        .bind(shared::util::now_millis())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn replace_main_url(
        &self,
        product_id: i64,
        image_url: &str,
    ) -> RepoResult<Option<String>> {
        let now = shared::util::now_millis();
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64, String)> = sqlx::query_as(
            "SELECT id, image_url FROM product_images \
             WHERE product_id = $1 AND is_main \
             FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let previous = match current {
            Some((id, old_url)) => {
                sqlx::query("UPDATE product_images SET image_url = $2 WHERE id = $1")
                    .bind(id)
                    .bind(image_url)
                    .execute(&mut *tx)
                    .await?;
                if old_url != image_url {
                    enqueue_on(&mut tx, std::slice::from_ref(&old_url), now).await?;
                }
                Some(old_url)
            }
            None => {
                sqlx::query(
                    "INSERT INTO product_images (product_id, image_url, is_main, created_at) \
                     VALUES ($1, $2, TRUE, $3)",
                )
                .bind(product_id)
                .bind(image_url)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                None
            }
        };

        tx.commit().await?;
        Ok(previous)
    }

    async fn delete_by_ids(&self, product_id: i64, ids: &[i64]) -> RepoResult<Vec<ProductImage>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut tx = self.pool.begin().await?;

        // The main row is never deleted here, whatever the caller passes.
        let deleted = sqlx::query_as::<_, ProductImage>(&format!(
            "DELETE FROM product_images \
             WHERE product_id = $1 AND id = ANY($2) AND NOT is_main \
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(product_id)
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        let urls: Vec<String> = deleted.iter().map(|img| img.image_url.clone()).collect();
        enqueue_on(&mut tx, &urls, shared::util::now_millis()).await?;

        tx.commit().await?;
        tracing::debug!(product_id, requested = ids.len(), deleted = deleted.len(), "Image rows deleted");
        Ok(deleted)
    }
}
