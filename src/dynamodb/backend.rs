use async_trait::async_trait;
use aws_sdk_dynamodb::types::TableStatus;

use crate::dynamodb::error::Result;
use crate::dynamodb::{Item, Table};

/// Maximum number of operations DynamoDB accepts in one BatchWriteItem call.
pub const MAX_BATCH_WRITE: usize = 25;

/// A single mutation inside a batched write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put(Item),
    /// Delete by key; the item holds only the key attributes.
    Delete(Item),
}

/// The remote capabilities the demo relies on.
///
/// Every function takes the backend explicitly, so tests substitute
/// [`InMemoryBackend`](super::InMemoryBackend) for the real
/// [`DynamoDb`](super::DynamoDb) client.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Creates a table. A duplicate name yields `StoreError::AlreadyExists`.
    async fn create_table(&self, table: &Table) -> Result<()>;

    /// Reports the current status of a table.
    async fn table_status(&self, table_name: &str) -> Result<TableStatus>;

    /// Requests deletion of a table.
    async fn delete_table(&self, table_name: &str) -> Result<()>;

    async fn put_item(&self, table_name: &str, item: Item) -> Result<()>;

    /// Fetches a single page of at most `limit` items, in no particular order.
    async fn scan(&self, table_name: &str, limit: usize) -> Result<Vec<Item>>;

    /// Submits up to [`MAX_BATCH_WRITE`] operations and returns the ones the
    /// service left unprocessed.
    async fn batch_write(&self, table_name: &str, ops: Vec<WriteOp>) -> Result<Vec<WriteOp>>;
}
