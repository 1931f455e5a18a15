//! Product API
//!
//! GET  /api/products/{id}        : product with images (public)
//! POST /api/admin/products       : multipart create
//! PUT  /api/admin/products/{id}  : multipart update with image reconciliation

use axum::Extension;
use axum::extract::{Multipart, Path, State};
use shared::error::ApiResponse;
use shared::models::ProductWithImages;

use crate::auth::AdminIdentity;
use crate::state::AppState;

use super::ApiResult;
use super::form::ProductForm;

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> ApiResult<ProductWithImages> {
    let product = state.media.get_product(product_id).await?;
    Ok(ApiResponse::success(product))
}

/// POST /api/admin/products
pub async fn create_product(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    multipart: Multipart,
) -> ApiResult<ProductWithImages> {
    let request = ProductForm::from_multipart(multipart)
        .await?
        .into_create(identity.user_id)?;
    let product = state.media.create_product(request).await?;
    Ok(ApiResponse::success_with_message("Product created", product))
}

/// PUT /api/admin/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Path(product_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<ProductWithImages> {
    let update = ProductForm::from_multipart(multipart)
        .await?
        .into_update(product_id, identity.user_id)?;
    let product = state.media.update_product(update).await?;
    Ok(ApiResponse::success(product))
}
