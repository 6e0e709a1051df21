//! Error kinds reported by a [`Backend`](super::Backend).
//!
//! The SDK adapter translates modeled DynamoDB service errors into
//! [`StoreError`] so callers can switch on the kind instead of inspecting
//! exception names.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::delete_table::DeleteTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("table '{table}' already exists")]
    AlreadyExists { table: String },

    #[error("table '{table}' not found")]
    NotFound { table: String },

    #[error("table '{table}' is in use")]
    InUse { table: String },

    #[error("{0}")]
    Other(String),
}

/// The four outcomes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    InUse,
    Other,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::InUse { .. } => ErrorKind::InUse,
            StoreError::Other(_) => ErrorKind::Other,
        }
    }
}

impl From<BuildError> for StoreError {
    fn from(err: BuildError) -> Self {
        StoreError::Other(format!("invalid request: {err}"))
    }
}

/// Map a CreateTable SDK error. DynamoDB answers a duplicate create with
/// `ResourceInUseException`.
pub fn map_create_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<CreateTableError, R>,
    table: &str,
) -> StoreError {
    classify_create_table(err.into_service_error(), table)
}

pub fn map_delete_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteTableError, R>,
    table: &str,
) -> StoreError {
    classify_delete_table(err.into_service_error(), table)
}

pub fn map_describe_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DescribeTableError, R>,
    table: &str,
) -> StoreError {
    classify_describe_table(err.into_service_error(), table)
}

pub fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
    table: &str,
) -> StoreError {
    classify_put_item(err.into_service_error(), table)
}

pub fn map_scan_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ScanError, R>,
    table: &str,
) -> StoreError {
    classify_scan(err.into_service_error(), table)
}

pub fn map_batch_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchWriteItemError, R>,
    table: &str,
) -> StoreError {
    classify_batch_write(err.into_service_error(), table)
}

fn classify_create_table(err: CreateTableError, table: &str) -> StoreError {
    match err {
        CreateTableError::ResourceInUseException(_) => StoreError::AlreadyExists {
            table: table.to_string(),
        },
        err => other("CreateTable", &err),
    }
}

fn classify_delete_table(err: DeleteTableError, table: &str) -> StoreError {
    match err {
        DeleteTableError::ResourceNotFoundException(_) => StoreError::NotFound {
            table: table.to_string(),
        },
        DeleteTableError::ResourceInUseException(_) => StoreError::InUse {
            table: table.to_string(),
        },
        err => other("DeleteTable", &err),
    }
}

fn classify_describe_table(err: DescribeTableError, table: &str) -> StoreError {
    match err {
        DescribeTableError::ResourceNotFoundException(_) => StoreError::NotFound {
            table: table.to_string(),
        },
        err => other("DescribeTable", &err),
    }
}

fn classify_put_item(err: PutItemError, table: &str) -> StoreError {
    match err {
        PutItemError::ResourceNotFoundException(_) => StoreError::NotFound {
            table: table.to_string(),
        },
        err => other("PutItem", &err),
    }
}

fn classify_scan(err: ScanError, table: &str) -> StoreError {
    match err {
        ScanError::ResourceNotFoundException(_) => StoreError::NotFound {
            table: table.to_string(),
        },
        err => other("Scan", &err),
    }
}

fn classify_batch_write(err: BatchWriteItemError, table: &str) -> StoreError {
    match err {
        BatchWriteItemError::ResourceNotFoundException(_) => StoreError::NotFound {
            table: table.to_string(),
        },
        err => other("BatchWriteItem", &err),
    }
}

fn other(operation: &str, err: &(dyn std::error::Error + 'static)) -> StoreError {
    StoreError::Other(format!("{operation} failed: {}", DisplayErrorContext(err)))
}
