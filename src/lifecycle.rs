//! Table lifecycle: create-if-absent, wait until active, delete-if-present.

use anyhow::{bail, Context, Result};
use aws_sdk_dynamodb::types::TableStatus;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use crate::dynamodb::{Backend, ErrorKind, Table, TableHandle};

/// Polling behavior for [`await_active`].
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(500)),
        }
    }
}

/// What [`delete_table`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The table was already gone.
    Missing,
    /// The table was busy; deletion was not retried and the table may remain.
    InUse,
}

/// Creates the table, or reuses it when a table of that name already exists.
pub async fn ensure_table<B: Backend + ?Sized>(
    backend: &B,
    table: &Table,
) -> Result<TableHandle> {
    info!("Creating table {}", table.name());
    match backend.create_table(table).await {
        Ok(()) => Ok(TableHandle::new(table, true)),
        Err(e) => match e.kind() {
            ErrorKind::AlreadyExists => {
                info!("Table {} already exists, skipping creation.", table.name());
                Ok(TableHandle::new(table, false))
            }
            ErrorKind::NotFound | ErrorKind::InUse | ErrorKind::Other => {
                Err(e).with_context(|| format!("Failed to create table '{}'", table.name()))
            }
        },
    }
}

/// Polls until the table reports `ACTIVE`.
///
/// A table that is not visible yet (`NotFound`) is polled again, since
/// creation is eventually consistent. A table that disappears after
/// reporting `DELETING` will never become active, so that fails the wait.
pub async fn await_active<B: Backend + ?Sized>(
    backend: &B,
    handle: &TableHandle,
    options: WaitOptions,
) -> Result<()> {
    info!("Waiting for table {} to be created", handle.name());
    let started = Instant::now();
    let mut deleting = false;

    loop {
        match backend.table_status(handle.name()).await {
            Ok(TableStatus::Active) => {
                info!("Table {} is active", handle.name());
                return Ok(());
            }
            Ok(TableStatus::Deleting) => {
                warn!("Table {} is being deleted", handle.name());
                deleting = true;
            }
            Ok(status) => debug!("Table {} is {:?}", handle.name(), status),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if deleting {
                    bail!(
                        "Table '{}' was deleted while waiting for it to become active",
                        handle.name()
                    );
                }
                debug!("Table {} not visible yet", handle.name())
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to describe table '{}'", handle.name()))
            }
        }

        if let Some(timeout) = options.timeout {
            if started.elapsed() >= timeout {
                bail!(
                    "Timed out after {:?} waiting for table '{}' to become active",
                    timeout,
                    handle.name()
                );
            }
        }
        sleep(options.poll_interval).await;
    }
}

/// Requests deletion of the table.
///
/// A missing table counts as deleted. A table in use is logged and left
/// alone; no retry is attempted.
pub async fn delete_table<B: Backend + ?Sized>(
    backend: &B,
    table_name: &str,
) -> Result<DeleteOutcome> {
    info!("Deleting table {}", table_name);
    match backend.delete_table(table_name).await {
        Ok(()) => Ok(DeleteOutcome::Deleted),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => {
                info!("Table {} does not exist, skipping deletion.", table_name);
                Ok(DeleteOutcome::Missing)
            }
            ErrorKind::InUse => {
                warn!("Table {} is in use, try again later.", table_name);
                Ok(DeleteOutcome::InUse)
            }
            ErrorKind::AlreadyExists | ErrorKind::Other => {
                Err(e).with_context(|| format!("Failed to delete table '{table_name}'"))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamodb::InMemoryBackend;

    fn quick(timeout: Option<Duration>) -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_millis(1),
            timeout,
        }
    }

    #[tokio::test]
    async fn second_ensure_reuses_the_table() {
        let backend = InMemoryBackend::new();
        let table = Table::new("my_table", "id");

        let first = ensure_table(&backend, &table).await.unwrap();
        let second = ensure_table(&backend, &table).await.unwrap();

        assert!(first.created());
        assert!(!second.created());
        assert_eq!(first.name(), second.name());
        assert_eq!(backend.table_names().await, vec!["my_table".to_string()]);
        assert_eq!(backend.stats().await.create_table, 2);
    }

    #[tokio::test]
    async fn await_active_polls_through_creating() {
        let backend = InMemoryBackend::new();
        backend.set_activation_polls(3).await;
        let handle = ensure_table(&backend, &Table::new("t", "id")).await.unwrap();

        await_active(&backend, &handle, quick(None)).await.unwrap();
        assert_eq!(backend.stats().await.status_polls, 4);
    }

    #[tokio::test]
    async fn await_active_keeps_polling_a_missing_table_until_timeout() {
        let backend = InMemoryBackend::new();
        let handle = TableHandle::new(&Table::new("ghost", "id"), false);

        let err = await_active(&backend, &handle, quick(Some(Duration::from_millis(20))))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
        assert!(backend.stats().await.status_polls > 1);
    }

    #[tokio::test]
    async fn await_active_fails_once_a_deleting_table_is_gone() {
        let backend = InMemoryBackend::new();
        let handle = ensure_table(&backend, &Table::new("t", "id")).await.unwrap();
        backend.begin_deleting("t", 2).await;

        let err = await_active(&backend, &handle, quick(None)).await.unwrap_err();
        assert!(err.to_string().contains("deleted while waiting"));
        assert_eq!(backend.stats().await.status_polls, 3);
        assert!(backend.table_names().await.is_empty());
    }

    #[test]
    fn default_wait_is_bounded() {
        assert_eq!(WaitOptions::default().timeout, Some(Duration::from_secs(500)));
    }

    #[tokio::test]
    async fn delete_outcomes() {
        let backend = InMemoryBackend::new();
        ensure_table(&backend, &Table::new("t", "id")).await.unwrap();
        ensure_table(&backend, &Table::new("busy", "id")).await.unwrap();
        backend.mark_in_use("busy").await;

        assert_eq!(delete_table(&backend, "t").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(delete_table(&backend, "t").await.unwrap(), DeleteOutcome::Missing);
        assert_eq!(delete_table(&backend, "busy").await.unwrap(), DeleteOutcome::InUse);
        assert_eq!(backend.table_names().await, vec!["busy".to_string()]);
    }
}
