//! Background blob cleanup
//!
//! Drains `blob_cleanup_queue`: blobs whose metadata row was deleted (or
//! never committed) but which could not be removed inline. Failed attempts
//! are pushed back with capped exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use super::blob::BlobGateway;
use super::retry::Backoff;
use super::store::CleanupQueue;
use crate::error::RepoResult;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub rescheduled: usize,
}

pub struct CleanupWorker {
    queue: Arc<dyn CleanupQueue>,
    gateway: Arc<BlobGateway>,
    batch_size: i64,
    backoff: Backoff,
}

impl CleanupWorker {
    pub fn new(queue: Arc<dyn CleanupQueue>, gateway: Arc<BlobGateway>, batch_size: i64) -> Self {
        Self {
            queue,
            gateway,
            batch_size,
            backoff: Backoff::Exponential {
                base: Duration::from_secs(30),
                max: Duration::from_secs(3600),
            },
        }
    }

    /// Process every entry that is due at `now` (Unix millis)
    pub async fn sweep(&self, now: i64) -> RepoResult<CleanupReport> {
        let due = self.queue.fetch_due(now, self.batch_size).await?;
        let mut report = CleanupReport::default();

        for entry in due {
            match self.gateway.delete(&entry.image_url).await {
                Ok(()) => {
                    self.queue.complete(&entry.image_url).await?;
                    report.deleted += 1;
                }
                Err(e) => {
                    let failures = u32::try_from(entry.attempts).unwrap_or(0).saturating_add(1);
                    let delay = self.backoff.delay_for(failures);
                    let next = now.saturating_add(delay.as_millis() as i64);
                    tracing::warn!(
                        url = %entry.image_url,
                        attempts = failures,
                        retry_in_secs = delay.as_secs(),
                        error = %e,
                        "Queued blob delete failed"
                    );
                    self.queue.reschedule(entry.id, next, &e.to_string()).await?;
                    report.rescheduled += 1;
                }
            }
        }

        Ok(report)
    }

    /// Sweep every `interval` until the task is dropped
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match self.sweep(shared::util::now_millis()).await {
                Ok(report) if report.deleted + report.rescheduled > 0 => {
                    tracing::info!(
                        deleted = report.deleted,
                        rescheduled = report.rescheduled,
                        "Blob cleanup sweep"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Blob cleanup sweep failed"),
            }
        }
    }
}
