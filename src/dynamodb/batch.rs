use anyhow::{bail, Result};
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::dynamodb::backend::{Backend, WriteOp, MAX_BATCH_WRITE};
use crate::dynamodb::Item;
use crate::utils::Backoff;

/// How unprocessed operations are resubmitted.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_retries: 8,
        }
    }
}

/// Totals for one writer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub puts: usize,
    pub deletes: usize,
    /// BatchWriteItem calls, resubmissions included.
    pub requests: usize,
}

/// Buffers puts and deletes against one table and sends them as batched
/// writes of at most `batch_size` operations.
///
/// Prefer [`BatchWriter::scope`], which flushes on every exit path. A writer
/// used directly must be [`close`](BatchWriter::close)d; dropping one with
/// pending operations loses them and logs a warning.
pub struct BatchWriter<'a, B: Backend + ?Sized> {
    backend: &'a B,
    table_name: &'a str,
    batch_size: usize,
    retry: RetryPolicy,
    pending: Vec<WriteOp>,
    stats: BatchStats,
}

impl<'a, B: Backend + ?Sized> BatchWriter<'a, B> {
    /// Opens a writer. `batch_size` is clamped to `1..=25`.
    pub fn open(backend: &'a B, table_name: &'a str, batch_size: usize) -> Self {
        Self {
            backend,
            table_name,
            batch_size: batch_size.clamp(1, MAX_BATCH_WRITE),
            retry: RetryPolicy::default(),
            pending: Vec::new(),
            stats: BatchStats::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Opens a writer, lets `fill` enqueue operations, then flushes.
    ///
    /// The flush runs even when `fill` fails; in that case `fill`'s error is
    /// returned after whatever was enqueued has been written.
    pub async fn scope<F>(
        backend: &'a B,
        table_name: &'a str,
        batch_size: usize,
        retry: RetryPolicy,
        fill: F,
    ) -> Result<BatchStats>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let mut writer = Self::open(backend, table_name, batch_size).with_retry(retry);
        let filled = fill(&mut writer);
        let closed = writer.close().await;
        filled?;
        closed
    }

    pub fn put(&mut self, item: Item) {
        self.stats.puts += 1;
        self.pending.push(WriteOp::Put(item));
    }

    pub fn delete(&mut self, key: Item) {
        self.stats.deletes += 1;
        self.pending.push(WriteOp::Delete(key));
    }

    /// Sends everything pending, `batch_size` operations per request.
    pub async fn flush(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            let take = self.pending.len().min(self.batch_size);
            let batch: Vec<_> = self.pending.drain(..take).collect();
            self.send(batch).await?;
        }
        Ok(())
    }

    /// Flushes and returns the writer's totals.
    pub async fn close(mut self) -> Result<BatchStats> {
        self.flush().await?;
        Ok(self.stats)
    }

    async fn send(&mut self, mut batch: Vec<WriteOp>) -> Result<()> {
        let mut backoff = Backoff::new(self.retry.initial_delay, self.retry.max_retries);
        loop {
            self.stats.requests += 1;
            let unprocessed = self.backend.batch_write(self.table_name, batch).await?;
            if unprocessed.is_empty() {
                return Ok(());
            }

            let reason = format!("{} operations unprocessed", unprocessed.len());
            if !backoff.wait(&reason).await {
                bail!(
                    "{} operations on '{}' still unprocessed after {} retries",
                    unprocessed.len(),
                    self.table_name,
                    backoff.retries()
                );
            }
            debug!("Resubmitting {} operations", unprocessed.len());
            batch = unprocessed;
        }
    }
}

impl<B: Backend + ?Sized> Drop for BatchWriter<'_, B> {
    fn drop(&mut self) {
        if !self.pending.is_empty() && !std::thread::panicking() {
            warn!(
                "Batch writer for '{}' dropped with {} unflushed operations",
                self.table_name,
                self.pending.len()
            );
        }
    }
}
