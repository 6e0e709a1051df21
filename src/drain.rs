//! Scan-then-delete until a table is empty.
//!
//! The loop trusts whatever each scan returns: it is not snapshot
//! consistent, and writers adding items concurrently can keep it running
//! forever. Pass a deadline to bound it.

use anyhow::{anyhow, bail, Context, Result};
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::dynamodb::{Backend, BatchWriter, RetryPolicy, TableHandle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Scan calls, including the final empty one.
    pub scans: usize,
    /// Non-empty pages that were deleted.
    pub pages: usize,
    /// BatchWriteItem calls, resubmissions included.
    pub delete_requests: usize,
    pub deleted: usize,
}

/// Deletes every item in the table, `page_size` at a time.
pub async fn drain<B: Backend + ?Sized>(
    backend: &B,
    handle: &TableHandle,
    page_size: usize,
    retry: RetryPolicy,
    deadline: Option<Duration>,
) -> Result<DrainReport> {
    if page_size == 0 {
        bail!("page size must be at least 1");
    }

    info!("Deleting all items in table {}", handle.name());
    let started = Instant::now();
    let mut report = DrainReport::default();

    loop {
        if let Some(deadline) = deadline {
            if started.elapsed() >= deadline {
                bail!(
                    "Drain of '{}' exceeded {:?} after deleting {} items",
                    handle.name(),
                    deadline,
                    report.deleted
                );
            }
        }

        let page = backend
            .scan(handle.name(), page_size)
            .await
            .with_context(|| format!("Failed to scan '{}'", handle.name()))?;
        report.scans += 1;

        if page.is_empty() {
            debug!("Table {} is empty after {} scans", handle.name(), report.scans);
            return Ok(report);
        }

        let keys = page
            .iter()
            .map(|item| {
                item.key(handle.hash_key())
                    .ok_or_else(|| anyhow!("Scanned item has no '{}' attribute", handle.hash_key()))
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Deleting up to {} items", page_size);
        let stats = BatchWriter::scope(backend, handle.name(), page_size, retry, |batch| {
            for key in keys {
                batch.delete(key);
            }
            Ok(())
        })
        .await
        .with_context(|| format!("Failed to delete page from '{}'", handle.name()))?;

        report.pages += 1;
        report.deleted += stats.deletes;
        report.delete_requests += stats.requests;
    }
}
