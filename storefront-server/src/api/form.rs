//! Multipart product form
//!
//! Collects text fields and file parts, then validates them into typed
//! create/update requests before any store is touched.

use std::collections::HashMap;

use axum::extract::Multipart;
use shared::error::{AppError, ErrorCode};
use shared::models::{NewProduct, ProductPatch};

use crate::media::{IncomingFile, KeepList, MainImageUpdate, ProductCreate, ProductUpdate};

/// Raw `main_image` part
#[derive(Debug, Clone)]
pub enum MainImageField {
    File(IncomingFile),
    /// Sent as text (usually the current URL): leave the image alone
    Text,
}

/// Parsed but not yet validated product form
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    /// Scalar text fields; a repeated field keeps its last value
    pub fields: HashMap<String, String>,
    pub main_image: Option<MainImageField>,
    pub additional_images: Vec<IncomingFile>,
    /// `None` when no `keep_image_ids` part was sent
    pub keep_image_ids: Option<Vec<String>>,
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::with_message(ErrorCode::InvalidRequest, format!("Multipart error: {e}"))
}

fn field_error(field: &str, message: impl Into<String>) -> AppError {
    AppError::validation(message).with_detail("field", field)
}

impl ProductForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = ProductForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            match (name.as_str(), file_name) {
                ("main_image", Some(file_name)) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    form.main_image = Some(MainImageField::File(IncomingFile {
                        file_name: Some(file_name),
                        content_type,
                        bytes: bytes.to_vec(),
                    }));
                }
                ("main_image", None) => form.main_image = Some(MainImageField::Text),
                ("additional_images" | "additional_images[]", Some(file_name)) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    form.additional_images.push(IncomingFile {
                        file_name: Some(file_name),
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                ("keep_image_ids" | "keep_image_ids[]", None) => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.keep_image_ids.get_or_insert_with(Vec::new).push(value);
                }
                (_, None) => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name.clone(), value);
                }
                (_, Some(_)) => {
                    tracing::debug!(field = %name, "Ignoring unexpected file part");
                }
            }
        }

        Ok(form)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn patch(&self) -> Result<ProductPatch, AppError> {
        Ok(ProductPatch {
            name: self.text("name").map(parse_name).transpose()?,
            description: self.text("description").map(str::to_string),
            price: self.text("price").map(parse_price).transpose()?,
            stock: self.text("stock").map(parse_stock).transpose()?,
            category_id: self.text("category_id").map(parse_category).transpose()?,
        })
    }

    /// Validate into an update of `product_id` by `admin_id`
    pub fn into_update(self, product_id: i64, admin_id: i64) -> Result<ProductUpdate, AppError> {
        let patch = self.patch()?;
        let main_image = match self.main_image {
            Some(MainImageField::File(file)) => MainImageUpdate::Replace(file),
            Some(MainImageField::Text) | None => MainImageUpdate::Keep,
        };
        Ok(ProductUpdate {
            product_id,
            admin_id,
            patch,
            main_image,
            additional_images: self.additional_images,
            keep_image_ids: self
                .keep_image_ids
                .as_deref()
                .map(KeepList::from_form_values),
        })
    }

    /// Validate into a create request; name, price and a main image file are required
    pub fn into_create(self, admin_id: i64) -> Result<ProductCreate, AppError> {
        let patch = self.patch()?;
        let name = patch
            .name
            .ok_or_else(|| field_error("name", "name is required"))?;
        let price = patch
            .price
            .ok_or_else(|| field_error("price", "price is required"))?;
        let Some(MainImageField::File(main_image)) = self.main_image else {
            return Err(field_error("main_image", "main_image file is required"));
        };

        Ok(ProductCreate {
            admin_id,
            product: NewProduct {
                name,
                description: patch.description.unwrap_or_default(),
                price,
                stock: patch.stock.unwrap_or(0),
                category_id: patch.category_id.flatten(),
            },
            main_image,
            additional_images: self.additional_images,
        })
    }
}

fn parse_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(field_error("name", "name must not be empty"));
    }
    Ok(name.to_string())
}

fn parse_price(raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(price) if price > 0 => Ok(price),
        _ => Err(field_error("price", "price must be a positive integer")),
    }
}

fn parse_stock(raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(stock) if stock >= 0 => Ok(stock),
        _ => Err(field_error("stock", "stock must be a non-negative integer")),
    }
}

/// Empty or `null` clears the category
fn parse_category(raw: &str) -> Result<Option<i64>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(Some(id)),
        _ => Err(field_error("category_id", "category_id must be a positive integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> ProductForm {
        ProductForm {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn png(bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            file_name: Some("a.png".into()),
            content_type: Some("image/png".into()),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn scalar_parsing() {
        assert_eq!(parse_price(" 1200 ").unwrap(), 1200);
        assert!(parse_price("0").is_err());
        assert!(parse_price("12.5").is_err());
        assert_eq!(parse_stock("0").unwrap(), 0);
        assert!(parse_stock("-1").is_err());
        assert_eq!(parse_category("").unwrap(), None);
        assert_eq!(parse_category("null").unwrap(), None);
        assert_eq!(parse_category("3").unwrap(), Some(3));
        assert!(parse_category("x").is_err());
        assert!(parse_name("   ").is_err());
    }

    #[test]
    fn invalid_field_is_reported() {
        let err = form(&[("price", "free")]).into_update(1, 9).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.details.unwrap()["field"], "price");
    }

    #[test]
    fn update_with_only_some_fields() {
        let mut f = form(&[("stock", "5"), ("category_id", "")]);
        f.keep_image_ids = Some(vec!["[2,4]".into()]);
        let update = f.into_update(1, 9).unwrap();

        assert_eq!(update.product_id, 1);
        assert_eq!(update.admin_id, 9);
        assert_eq!(update.patch.stock, Some(5));
        assert_eq!(update.patch.category_id, Some(None));
        assert_eq!(update.patch.name, None);
        assert!(matches!(update.main_image, MainImageUpdate::Keep));
        let keep = update.keep_image_ids.unwrap();
        assert_eq!(keep.ids().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn absent_keep_list_differs_from_empty() {
        let update = form(&[("price", "999")]).into_update(1, 9).unwrap();
        assert!(update.keep_image_ids.is_none());

        let mut f = form(&[]);
        f.keep_image_ids = Some(vec!["[]".into()]);
        let keep = f.into_update(1, 9).unwrap().keep_image_ids.unwrap();
        assert!(keep.is_empty());
    }

    #[test]
    fn text_main_image_keeps_current() {
        let mut f = form(&[]);
        f.main_image = Some(MainImageField::Text);
        assert!(matches!(
            f.into_update(1, 9).unwrap().main_image,
            MainImageUpdate::Keep
        ));

        let mut f = form(&[]);
        f.main_image = Some(MainImageField::File(png(b"img")));
        assert!(matches!(
            f.into_update(1, 9).unwrap().main_image,
            MainImageUpdate::Replace(_)
        ));
    }

    #[test]
    fn create_requires_name_price_and_main_file() {
        let err = form(&[("price", "100")]).into_create(9).unwrap_err();
        assert_eq!(err.details.unwrap()["field"], "name");

        let err = form(&[("name", "Mug"), ("price", "100")])
            .into_create(9)
            .unwrap_err();
        assert_eq!(err.details.unwrap()["field"], "main_image");

        let mut f = form(&[("name", " Mug "), ("price", "100"), ("category_id", "2")]);
        f.main_image = Some(MainImageField::File(png(b"img")));
        let create = f.into_create(9).unwrap();
        assert_eq!(create.product.name, "Mug");
        assert_eq!(create.product.stock, 0);
        assert_eq!(create.product.category_id, Some(2));
    }
}
