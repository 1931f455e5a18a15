//! Media engine errors

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use super::blob::BlobError;
use crate::error::RepoError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("product {0} not found")]
    ProductNotFound(i64),

    /// Rejected input, detected before anything was mutated
    #[error("{message}")]
    Invalid { field: &'static str, message: String },

    #[error(
        "refusing to replace all {existing} additional images of product {product_id} \
         without an explicit keep list"
    )]
    DangerousOperation { product_id: i64, existing: usize },

    #[error("blob upload failed: {0}")]
    Upload(#[source] BlobError),

    #[error("blob delete failed: {0}")]
    Delete(#[source] BlobError),

    #[error("image metadata delete failed after {attempts} attempts: {source}")]
    MetadataDelete {
        attempts: usize,
        #[source]
        source: RepoError,
    },

    #[error("product {0} does not have exactly one main image after reconciliation")]
    MainImageMissing(i64),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl MediaError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        MediaError::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Whether a blob call failed in a way worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            MediaError::Upload(e) | MediaError::Delete(e) => e.is_transient(),
            MediaError::Repo(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::ProductNotFound(id) => AppError::new(ErrorCode::ProductNotFound)
                .with_detail("product_id", id),
            MediaError::Invalid { field, message } => {
                AppError::validation(message).with_detail("field", field)
            }
            MediaError::DangerousOperation { .. } => {
                AppError::with_message(ErrorCode::DangerousOperation, err.to_string())
            }
            MediaError::Upload(ref e) => {
                tracing::error!(error = %e, "Blob upload failed");
                AppError::new(ErrorCode::InternalError)
                    .with_detail("cause", ErrorCode::UploadError.name())
                    .with_diagnostic(e)
            }
            MediaError::Delete(ref e) => {
                tracing::error!(error = %e, "Blob delete failed");
                AppError::new(ErrorCode::InternalError)
                    .with_detail("cause", ErrorCode::DeleteError.name())
                    .with_diagnostic(e)
            }
            MediaError::MetadataDelete { .. } | MediaError::MainImageMissing(_) => {
                tracing::error!(error = %err, "Image reconciliation failed");
                AppError::new(ErrorCode::InternalError).with_diagnostic(err)
            }
            MediaError::Repo(RepoError::NotFound(what)) => AppError::not_found(what),
            MediaError::Repo(e) => e.into(),
        }
    }
}
