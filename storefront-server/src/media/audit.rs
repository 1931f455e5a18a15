//! Audit trail for image deletions
//!
//! Every request that deletes images writes one `admin_logs` row. It is
//! opened as `processing` before the first mutation and closed as `success`
//! or `error` once the executor is done.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::store::{AuditLog, NewAuditEntry};
use crate::error::RepoResult;

pub const ACTION_DELETE_IMAGES: &str = "delete_images";
pub const TARGET_PRODUCT: &str = "product";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Processing,
    Success,
    Error,
}

/// `admin_logs.description` document of a `delete_images` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionAuditRecord {
    pub status: AuditStatus,
    pub keep_image_ids: Vec<i64>,
    /// RFC 3339
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Audit entry in `processing` state
#[derive(Debug)]
pub struct OpenAudit {
    pub id: i64,
    record: DeletionAuditRecord,
    started: Instant,
}

/// Writes the deletion audit trail of one product on behalf of one admin
pub struct AuditTrail {
    log: Arc<dyn AuditLog>,
    admin_id: i64,
    product_id: i64,
}

impl AuditTrail {
    pub fn new(log: Arc<dyn AuditLog>, admin_id: i64, product_id: i64) -> Self {
        Self {
            log,
            admin_id,
            product_id,
        }
    }

    /// Insert the `processing` entry
    pub async fn open(&self, keep_image_ids: Vec<i64>) -> RepoResult<OpenAudit> {
        let record = DeletionAuditRecord {
            status: AuditStatus::Processing,
            keep_image_ids,
            start_time: shared::util::millis_to_rfc3339(shared::util::now_millis()),
            deleted_count: None,
            elapsed_ms: None,
            error: None,
        };
        let id = self
            .log
            .open(NewAuditEntry {
                admin_id: self.admin_id,
                action: ACTION_DELETE_IMAGES.to_string(),
                target_type: TARGET_PRODUCT.to_string(),
                target_id: self.product_id,
                description: serde_json::to_value(&record)?,
            })
            .await?;

        tracing::debug!(audit_id = id, product_id = self.product_id, "Audit entry opened");
        Ok(OpenAudit {
            id,
            record,
            started: Instant::now(),
        })
    }

    pub async fn succeed(&self, open: OpenAudit, deleted_count: usize) {
        let OpenAudit {
            id,
            mut record,
            started,
        } = open;
        record.status = AuditStatus::Success;
        record.deleted_count = Some(deleted_count);
        record.elapsed_ms = Some(started.elapsed().as_millis() as u64);
        self.close(id, record).await;
    }

    pub async fn fail(&self, open: OpenAudit, error: &str) {
        let OpenAudit {
            id,
            mut record,
            started,
        } = open;
        record.status = AuditStatus::Error;
        record.elapsed_ms = Some(started.elapsed().as_millis() as u64);
        record.error = Some(error.to_string());
        self.close(id, record).await;
    }

    /// A close failure leaves the entry in `processing`; the deletions it
    /// describes already happened, so it is logged rather than propagated.
    async fn close(&self, id: i64, record: DeletionAuditRecord) {
        let result = match serde_json::to_value(&record) {
            Ok(doc) => self.log.close(id, &doc).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(
                audit_id = id,
                product_id = self.product_id,
                status = ?record.status,
                error = %e,
                "Failed to close audit entry"
            );
        }
    }
}
