//! # DynamoDB Module
//!
//! The storage side of the demo: a [`Backend`] trait covering the remote
//! calls the program makes, the real [`DynamoDb`] adapter, an
//! [`InMemoryBackend`] for tests and dry runs, and a [`BatchWriter`] that
//! groups puts and deletes into `BatchWriteItem` requests.
//!
//! ## Usage
//!
//! The AWS adapter reads its credentials from the usual environment:
//!
//! - `AWS_ACCESS_KEY_ID`: Your AWS access key ID.
//! - `AWS_SECRET_ACCESS_KEY`: Your AWS secret access key.
//! - `AWS_REGION`: The AWS region where your DynamoDB tables are located.
//!
//! Optionally, you can also set:
//! - `AWS_SESSION_TOKEN`: If you're using temporary credentials.
//! - `AWS_ENDPOINT_URL`: For using a custom endpoint (e.g., DynamoDB Local).
//!
//! ## Example
//!
//! ```rust
//! let config = aws_config::load_from_env().await;
//! let ddb = DynamoDb::new(&config);
//!
//! let table = Table::new("my_table", "id");
//! ddb.create_table(&table).await?;
//!
//! let record = Record { id: "0-0".into(), name: "item-0-0".into() };
//! let stats = BatchWriter::scope(&ddb, table.name(), 25, RetryPolicy::default(), |batch| {
//!     batch.put(Item::from_record(&record)?);
//!     Ok(())
//! })
//! .await?;
//! ```

mod backend;
mod batch;
mod client;
mod error;
mod item;
mod memory;
mod table;

pub use backend::{Backend, MAX_BATCH_WRITE};
pub use batch::{BatchWriter, RetryPolicy};
pub use client::DynamoDb;
pub use error::ErrorKind;
pub use item::{Item, Record};
pub use memory::InMemoryBackend;
pub use table::{Table, TableHandle, Throughput};
