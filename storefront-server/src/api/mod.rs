//! API routes for storefront-server

pub mod audit;
pub mod form;
pub mod health;
pub mod media;
pub mod product;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use shared::error::{ApiResponse, AppError};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::admin_auth::admin_auth_middleware;
use crate::state::AppState;

pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Files one product form may carry (main + additional)
const MAX_FILES_PER_REQUEST: usize = 16;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_file_bytes.saturating_mul(MAX_FILES_PER_REQUEST);

    // Product management (admin JWT)
    let admin = Router::new()
        .route("/api/admin/products", post(product::create_product))
        .route("/api/admin/products/{id}", put(product::update_product))
        .route(
            "/api/admin/products/{id}/audit-logs",
            get(audit::list_audit_logs),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    // Storefront reads (no auth)
    let public = Router::new()
        .route("/api/products/{id}", get(product::get_product))
        .route("/api/media/{*key}", get(media::serve_blob));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(public)
        .merge(admin)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .with_state(state)
}
