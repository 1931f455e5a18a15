//! Product Model

use serde::{Deserialize, Serialize};

use super::image::ProductImage;

/// Product entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Price in minor currency units, always positive
    pub price: i64,
    pub stock: i64,
    pub category_id: Option<i64>,
    pub created_at: i64,
}

/// Product together with its image set (main image first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWithImages {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
}

impl ProductWithImages {
    /// The primary image, if the product has one
    pub fn main_image(&self) -> Option<&ProductImage> {
        self.images.iter().find(|img| img.is_main)
    }

    /// Secondary images in display order
    pub fn additional_images(&self) -> impl Iterator<Item = &ProductImage> {
        self.images.iter().filter(|img| !img.is_main)
    }
}

/// Create product payload (validated scalar fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub category_id: Option<i64>,
}

/// Partial update of scalar product fields
///
/// `None` leaves a field untouched; `category_id: Some(None)` clears the
/// category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
    pub category_id: Option<Option<i64>>,
}

impl ProductPatch {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category_id.is_none()
    }

    /// Apply the patch to an in-memory product
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
    }
}
