//! Product audit trail endpoint

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::AdminLog;

use crate::state::AppState;

use super::ApiResult;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// GET /api/admin/products/{id}/audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AdminLog>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let entries = state.media.audit_history(product_id, limit).await?;
    Ok(ApiResponse::success(entries))
}
