use anyhow::{ensure, Result};
use clap::Parser;
use tokio::time::Duration;
use tracing::Level;

use crate::dynamodb::{RetryPolicy, Table, Throughput, MAX_BATCH_WRITE};
use crate::lifecycle::WaitOptions;

/// Creates a DynamoDB table, fills it, drains it with scan + batch delete,
/// and deletes it again.
///
/// Every flag can also be set from the environment (a `.env` file is
/// loaded first).
#[derive(Debug, Clone, Parser)]
#[command(name = "ddb-drain", version)]
pub struct Config {
    /// Table to create, fill, drain and delete.
    #[arg(long, env = "TABLE_NAME", default_value = "my_table")]
    pub table_name: String,

    /// Hash key attribute of the table.
    #[arg(long, env = "HASH_KEY", default_value = "id")]
    pub hash_key: String,

    /// Overrides the region from the AWS environment.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom endpoint, e.g. `http://localhost:8000` for DynamoDB Local.
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Number of item groups (the `i` in `"{i}-{j}"`).
    #[arg(long, default_value_t = 10)]
    pub groups: usize,

    /// Items per group (the `j` in `"{i}-{j}"`).
    #[arg(long, default_value_t = 25)]
    pub items_per_group: usize,

    /// Operations per BatchWriteItem request when writing (1..=25).
    #[arg(long, env = "BATCH_WRITE_SIZE", default_value_t = 25)]
    pub batch_size: usize,

    /// Items fetched per scan page while draining.
    #[arg(long, env = "BATCH_DELETE_SIZE", default_value_t = 25)]
    pub page_size: usize,

    #[arg(long, default_value_t = 5)]
    pub read_capacity: i64,

    #[arg(long, default_value_t = 5)]
    pub write_capacity: i64,

    /// Seconds between table status polls.
    #[arg(long, default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Give up waiting for the table after this many seconds. 0 waits forever.
    #[arg(long, env = "WAIT_TIMEOUT_SECS", default_value_t = 500)]
    pub wait_timeout_secs: u64,

    /// Give up draining after this many seconds. Unset drains until empty.
    #[arg(long, env = "DRAIN_TIMEOUT_SECS")]
    pub drain_timeout_secs: Option<u64>,

    /// Retries for unprocessed batch operations.
    #[arg(long, default_value_t = 8)]
    pub max_retries: usize,

    /// Run against a process-local table instead of DynamoDB.
    #[arg(long)]
    pub in_memory: bool,

    #[arg(long, env = "LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.table_name.is_empty(), "table name must not be empty");
        ensure!(!self.hash_key.is_empty(), "hash key must not be empty");
        ensure!(
            (1..=MAX_BATCH_WRITE).contains(&self.batch_size),
            "batch size must be between 1 and {MAX_BATCH_WRITE}, got {}",
            self.batch_size
        );
        ensure!(self.page_size >= 1, "page size must be at least 1");
        ensure!(
            self.read_capacity > 0 && self.write_capacity > 0,
            "capacity units must be positive"
        );
        Ok(())
    }

    pub fn table(&self) -> Table {
        Table::new(&self.table_name, &self.hash_key)
            .with_throughput(Throughput::new(self.read_capacity, self.write_capacity))
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            timeout: (self.wait_timeout_secs > 0)
                .then(|| Duration::from_secs(self.wait_timeout_secs)),
        }
    }

    pub fn drain_deadline(&self) -> Option<Duration> {
        self.drain_timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("ddb-drain").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--table-name",
            "orders",
            "--page-size",
            "7",
            "--wait-timeout-secs",
            "30",
            "--in-memory",
        ]);
        assert_eq!(config.table_name, "orders");
        assert_eq!(config.page_size, 7);
        assert!(config.in_memory);
        assert_eq!(config.wait_options().timeout, Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn table_wait_is_bounded_unless_disabled() {
        let config = parse(&[]);
        assert_eq!(config.wait_options().timeout, Some(Duration::from_secs(500)));
        let config = parse(&["--wait-timeout-secs", "0"]);
        assert_eq!(config.wait_options().timeout, None);
    }

    #[test]
    fn table_uses_configured_capacity() {
        let config = parse(&["--read-capacity", "3", "--write-capacity", "4"]);
        let table = config.table();
        assert_eq!(table.throughput(), Throughput::new(3, 4));
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let config = parse(&["--batch-size", "26"]);
        assert!(config.validate().is_err());
        let config = parse(&["--page-size", "0"]);
        assert!(config.validate().is_err());
    }
}
