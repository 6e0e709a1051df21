//! In-memory backend.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, TableStatus};
use tokio::sync::Mutex;
use tracing::debug;

use crate::dynamodb::backend::{Backend, WriteOp, MAX_BATCH_WRITE};
use crate::dynamodb::error::{Result, StoreError};
use crate::dynamodb::{Item, Table};

/// Storage backend that keeps tables in a process-local map.
///
/// Mirrors the DynamoDB behaviors the demo depends on: duplicate creates
/// fail with `AlreadyExists`, operations on a missing table fail with
/// `NotFound`, batch writes are capped at 25 operations. A few knobs let
/// tests provoke the slower paths (tables that stay `CREATING` or vanish
/// while `DELETING`, tables in use, throttled batch writes) and every call
/// is counted in [`CallStats`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

/// Per-call counters recorded by [`InMemoryBackend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStats {
    pub create_table: usize,
    pub delete_table: usize,
    pub status_polls: usize,
    pub scans: usize,
    /// Number of operations in each `batch_write` call, in call order.
    pub batch_writes: Vec<usize>,
    /// Number of deletes in each `batch_write` call that carried any.
    pub delete_batches: Vec<usize>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, MemTable>,
    in_use: HashSet<String>,
    activation_polls: usize,
    throttled_writes: usize,
    calls: CallStats,
}

#[derive(Debug)]
struct MemTable {
    hash_key: String,
    pending_polls: usize,
    /// Status calls left before a table being deleted disappears.
    deleting_polls: Option<usize>,
    items: BTreeMap<String, Item>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self) -> CallStats {
        self.state.lock().await.calls.clone()
    }
}

#[cfg(test)]
impl InMemoryBackend {
    /// Tables created from now on report `CREATING` for `polls` status calls.
    pub async fn set_activation_polls(&self, polls: usize) {
        self.state.lock().await.activation_polls = polls;
    }

    /// Marks a table as busy: deleting it fails with `InUse`.
    pub async fn mark_in_use(&self, table_name: &str) {
        self.state.lock().await.in_use.insert(table_name.to_string());
    }

    /// The table reports `DELETING` for `polls` status calls, then is gone.
    pub async fn begin_deleting(&self, table_name: &str, polls: usize) {
        if let Some(table) = self.state.lock().await.tables.get_mut(table_name) {
            table.deleting_polls = Some(polls);
        }
    }

    /// The next `calls` batch writes process only their first operation.
    pub async fn throttle_writes(&self, calls: usize) {
        self.state.lock().await.throttled_writes = calls;
    }

    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().await.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn item_count(&self, table_name: &str) -> Option<usize> {
        self.state
            .lock()
            .await
            .tables
            .get(table_name)
            .map(|table| table.items.len())
    }
}

impl State {
    fn table_mut(&mut self, table_name: &str) -> Result<&mut MemTable> {
        self.tables
            .get_mut(table_name)
            .ok_or_else(|| StoreError::NotFound {
                table: table_name.to_string(),
            })
    }
}

impl MemTable {
    fn key_of(&self, item: &Item) -> Result<String> {
        match item.attributes.get(&self.hash_key) {
            Some(AttributeValue::S(value)) => Ok(value.clone()),
            _ => Err(StoreError::Other(format!(
                "ValidationException: item is missing string key '{}'",
                self.hash_key
            ))),
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn create_table(&self, table: &Table) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.create_table += 1;

        if state.tables.contains_key(table.name()) {
            return Err(StoreError::AlreadyExists {
                table: table.name().to_string(),
            });
        }

        let pending_polls = state.activation_polls;
        state.tables.insert(
            table.name().to_string(),
            MemTable {
                hash_key: table.hash_key().to_string(),
                pending_polls,
                deleting_polls: None,
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn table_status(&self, table_name: &str) -> Result<TableStatus> {
        let mut state = self.state.lock().await;
        state.calls.status_polls += 1;

        let table = state.table_mut(table_name)?;
        let deleting_polls = table.deleting_polls;
        match deleting_polls {
            Some(0) => {
                state.tables.remove(table_name);
                return Err(StoreError::NotFound {
                    table: table_name.to_string(),
                });
            }
            Some(polls) => {
                table.deleting_polls = Some(polls - 1);
                return Ok(TableStatus::Deleting);
            }
            None => {}
        }
        if table.pending_polls > 0 {
            table.pending_polls -= 1;
            return Ok(TableStatus::Creating);
        }
        Ok(TableStatus::Active)
    }

    async fn delete_table(&self, table_name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.delete_table += 1;

        if state.in_use.contains(table_name) {
            return Err(StoreError::InUse {
                table: table_name.to_string(),
            });
        }
        state
            .tables
            .remove(table_name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                table: table_name.to_string(),
            })
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<()> {
        let mut state = self.state.lock().await;
        let table = state.table_mut(table_name)?;
        let key = table.key_of(&item)?;
        table.items.insert(key, item);
        Ok(())
    }

    async fn scan(&self, table_name: &str, limit: usize) -> Result<Vec<Item>> {
        let mut state = self.state.lock().await;
        state.calls.scans += 1;

        let table = state.table_mut(table_name)?;
        Ok(table.items.values().take(limit).cloned().collect())
    }

    async fn batch_write(&self, table_name: &str, ops: Vec<WriteOp>) -> Result<Vec<WriteOp>> {
        if ops.len() > MAX_BATCH_WRITE {
            return Err(StoreError::Other(format!(
                "ValidationException: {} operations exceed the batch limit of {MAX_BATCH_WRITE}",
                ops.len()
            )));
        }

        let mut state = self.state.lock().await;
        let deletes = ops
            .iter()
            .filter(|op| matches!(op, WriteOp::Delete(_)))
            .count();
        state.calls.batch_writes.push(ops.len());
        if deletes > 0 {
            state.calls.delete_batches.push(deletes);
        }

        let (ops, unprocessed) = if state.throttled_writes > 0 && ops.len() > 1 {
            state.throttled_writes -= 1;
            let mut ops = ops;
            let rest = ops.split_off(1);
            (ops, rest)
        } else {
            (ops, Vec::new())
        };

        let table = state.table_mut(table_name)?;
        for op in ops {
            match op {
                WriteOp::Put(item) => {
                    let key = table.key_of(&item)?;
                    table.items.insert(key, item);
                }
                WriteOp::Delete(key) => {
                    let key = table.key_of(&key)?;
                    table.items.remove(&key);
                }
            }
        }

        debug!(
            "Batch write on '{table_name}' left {} unprocessed",
            unprocessed.len()
        );
        Ok(unprocessed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamodb::ErrorKind;

    #[tokio::test]
    async fn duplicate_create_is_reported() {
        let backend = InMemoryBackend::new();
        let table = Table::new("t", "id");

        backend.create_table(&table).await.unwrap();
        let err = backend.create_table(&table).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(backend.table_names().await, vec!["t".to_string()]);
    }

    #[tokio::test]
    async fn missing_table_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = backend.scan("nope", 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = backend.delete_table("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let backend = InMemoryBackend::new();
        backend.create_table(&Table::new("t", "id")).await.unwrap();

        let ops = (0..26)
            .map(|i| WriteOp::Put(Item::new().set_string("id", i.to_string())))
            .collect();
        let err = backend.batch_write("t", ops).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(backend.item_count("t").await, Some(0));
    }

    #[tokio::test]
    async fn throttled_write_returns_the_tail() {
        let backend = InMemoryBackend::new();
        backend.create_table(&Table::new("t", "id")).await.unwrap();
        backend.throttle_writes(1).await;

        let ops: Vec<_> = (0..3)
            .map(|i| WriteOp::Put(Item::new().set_string("id", i.to_string())))
            .collect();
        let unprocessed = backend.batch_write("t", ops.clone()).await.unwrap();
        assert_eq!(unprocessed, ops[1..].to_vec());
        assert_eq!(backend.item_count("t").await, Some(1));

        let unprocessed = backend.batch_write("t", unprocessed).await.unwrap();
        assert!(unprocessed.is_empty());
        assert_eq!(backend.item_count("t").await, Some(3));
    }

    #[tokio::test]
    async fn new_tables_can_start_in_creating() {
        let backend = InMemoryBackend::new();
        backend.set_activation_polls(2).await;
        backend.create_table(&Table::new("t", "id")).await.unwrap();

        assert_eq!(backend.table_status("t").await.unwrap(), TableStatus::Creating);
        assert_eq!(backend.table_status("t").await.unwrap(), TableStatus::Creating);
        assert_eq!(backend.table_status("t").await.unwrap(), TableStatus::Active);
    }
}
