//! Products and categories

use async_trait::async_trait;
use shared::models::{NewProduct, Product, ProductPatch};
use sqlx::PgPool;

use crate::error::{RepoError, RepoResult};
use crate::media::store::CatalogStore;

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, category_id, created_at";

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_product(&self, product_id: i64) -> RepoResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn category_exists(&self, category_id: i64) -> RepoResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_product(
        &self,
        data: &NewProduct,
        main_url: &str,
        additional_urls: &[String],
    ) -> RepoResult<Product> {
        let now = shared::util::now_millis();
        let mut tx = self.pool.begin().await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, description, price, stock, category_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.stock)
        .bind(data.category_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO product_images (product_id, image_url, is_main, created_at) \
             VALUES ($1, $2, TRUE, $3)",
        )
        .bind(product.id)
        .bind(main_url)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if !additional_urls.is_empty() {
            sqlx::query(
                "INSERT INTO product_images (product_id, image_url, is_main, created_at) \
                 SELECT $1, url, FALSE, $3 FROM UNNEST($2::text[]) AS url",
            )
            .bind(product.id)
            .bind(additional_urls)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    async fn update_product(&self, product_id: i64, patch: &ProductPatch) -> RepoResult<Product> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                price = COALESCE($4, price), \
                stock = COALESCE($5, stock), \
                category_id = CASE WHEN $6 THEN $7 ELSE category_id END \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .bind(patch.stock)
        .bind(patch.category_id.is_some())
        .bind(patch.category_id.flatten())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepoError::NotFound(format!("product {product_id}")))
    }
}
