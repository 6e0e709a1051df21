mod config;
mod drain;
mod dynamodb;
mod lifecycle;
mod logging;
mod utils;
mod writer;


use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use crate::config::Config;
use crate::dynamodb::{Backend, DynamoDb, InMemoryBackend};
use crate::lifecycle::DeleteOutcome;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = Config::parse();
    logging::init_logging(config.log_level)?;
    config.validate()?;

    if config.in_memory {
        info!("Using in-memory backend");
        let backend = InMemoryBackend::new();
        run(&backend, &config).await?;
        info!("In-memory backend calls: {:?}", backend.stats().await);
        return Ok(());
    }

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    let sdk_config = loader.load().await;

    let ddb = DynamoDb::new(&sdk_config);
    ddb.check_auth().await?;

    run(&ddb, &config).await
}

/// Create (or reuse) the table, fill it, drain it, delete it.
async fn run<B: Backend + ?Sized>(backend: &B, config: &Config) -> Result<()> {
    let retry = config.retry_policy();

    let handle = lifecycle::ensure_table(backend, &config.table()).await?;
    lifecycle::await_active(backend, &handle, config.wait_options()).await?;
    if !handle.created() {
        warn!(
            "Table {} existed before this run; its items will be drained too",
            handle.name()
        );
    }

    let items = writer::generate_items(config.groups, config.items_per_group)?;
    let written = writer::write_items(backend, &handle, items, config.batch_size, retry).await?;
    info!(
        "Wrote {} items in {} batches ({} requests)",
        written.items, written.batches, written.requests
    );

    let drained = drain::drain(
        backend,
        &handle,
        config.page_size,
        retry,
        config.drain_deadline(),
    )
    .await?;
    info!(
        "Deleted {} items in {} pages over {} scans ({} requests)",
        drained.deleted, drained.pages, drained.scans, drained.delete_requests
    );

    match lifecycle::delete_table(backend, handle.name()).await? {
        DeleteOutcome::Deleted => info!("Table {} deleted", handle.name()),
        DeleteOutcome::Missing => {}
        DeleteOutcome::InUse => warn!("Table {} was left behind", handle.name()),
    }

    Ok(())
}
