//! Blob passthrough for environments without a CDN in front of the bucket

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::header;
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

/// GET /api/media/{*key}
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    if key.is_empty() || key.split('/').any(|seg| seg.is_empty() || seg == "..") {
        return Err(AppError::invalid_request("Invalid media key"));
    }

    let bytes = state.media.gateway().fetch(&key).await.map_err(|e| {
        tracing::error!(key = %key, error = %e, "Blob fetch failed");
        AppError::new(ErrorCode::InternalError).with_diagnostic(e)
    })?;

    let Some(bytes) = bytes else {
        return Err(AppError::not_found("Media"));
    };
    let content_type = mime_guess::from_path(&key).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, content_type.essence_str().to_string()),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
        ],
        bytes,
    )
        .into_response())
}
