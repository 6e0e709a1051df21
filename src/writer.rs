use anyhow::{ensure, Context, Result};
use tracing::info;

use crate::dynamodb::{
    Backend, BatchWriter, Item, Record, RetryPolicy, TableHandle, MAX_BATCH_WRITE,
};

/// Totals from [`write_items`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub items: usize,
    pub batches: usize,
    /// Write calls, resubmissions included.
    pub requests: usize,
}

/// Builds the demo rows: ids `"{i}-{j}"` and names `"item-{i}-{j}"` for
/// `i` in `0..groups`, `j` in `0..per_group`.
pub fn generate_records(groups: usize, per_group: usize) -> Vec<Record> {
    (0..groups)
        .flat_map(|i| {
            (0..per_group).map(move |j| Record {
                id: format!("{i}-{j}"),
                name: format!("item-{i}-{j}"),
            })
        })
        .collect()
}

pub fn generate_items(groups: usize, per_group: usize) -> Result<Vec<Item>> {
    generate_records(groups, per_group)
        .iter()
        .map(|record| {
            Item::from_record(record).with_context(|| format!("Failed to encode {}", record.id))
        })
        .collect()
}

/// Writes `items` in batches of `batch_size`, one batch writer per batch.
/// A batch holding a single item goes out as a plain PutItem.
///
/// Nothing is rolled back if a batch fails part way through.
pub async fn write_items<B: Backend + ?Sized>(
    backend: &B,
    handle: &TableHandle,
    items: Vec<Item>,
    batch_size: usize,
    retry: RetryPolicy,
) -> Result<WriteReport> {
    ensure!(
        (1..=MAX_BATCH_WRITE).contains(&batch_size),
        "batch size must be between 1 and {MAX_BATCH_WRITE}, got {batch_size}"
    );
    info!("Batch writing all items to table {}", handle.name());
    let mut report = WriteReport::default();

    for chunk in items.chunks(batch_size) {
        info!("Writing {} items", chunk.len());
        report.batches += 1;

        if let [item] = chunk {
            backend
                .put_item(handle.name(), item.clone())
                .await
                .with_context(|| format!("Failed to put item into '{}'", handle.name()))?;
            report.items += 1;
            report.requests += 1;
            continue;
        }

        let stats = BatchWriter::scope(backend, handle.name(), batch_size, retry, |batch| {
            for item in chunk {
                batch.put(item.clone());
            }
            Ok(())
        })
        .await
        .with_context(|| format!("Failed to write batch to '{}'", handle.name()))?;

        report.items += stats.puts;
        report.requests += stats.requests;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamodb::{InMemoryBackend, Table};
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique() {
        let records = generate_records(10, 25);
        assert_eq!(records.len(), 250);

        let ids: HashSet<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 250);
        assert!(ids.contains("0-0"));
        assert!(ids.contains("9-24"));
        assert!(!ids.contains("10-0"));
    }

    #[test]
    fn names_follow_ids() {
        let records = generate_records(2, 2);
        assert_eq!(records[3].id, "1-1");
        assert_eq!(records[3].name, "item-1-1");
    }

    #[test]
    fn items_carry_id_and_name() {
        let items = generate_items(1, 3).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].get_string("id"), Some(&"0-2".to_string()));
        assert_eq!(items[2].get_string("name"), Some(&"item-0-2".to_string()));
    }

    fn handle(name: &str) -> TableHandle {
        TableHandle::new(&Table::new(name, "id"), true)
    }

    #[tokio::test]
    async fn batch_size_outside_service_limit_is_rejected() {
        let backend = InMemoryBackend::new();
        let handle = handle("t");

        for size in [0, MAX_BATCH_WRITE + 1] {
            let items = generate_items(1, 3).unwrap();
            let err = write_items(&backend, &handle, items, size, RetryPolicy::default())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("batch size"));
        }
        assert!(backend.stats().await.batch_writes.is_empty());
    }

    #[tokio::test]
    async fn trailing_single_item_is_put_directly() {
        let backend = InMemoryBackend::new();
        backend.create_table(&Table::new("t", "id")).await.unwrap();

        let items = generate_items(1, 26).unwrap();
        let report = write_items(&backend, &handle("t"), items, 25, RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(report.items, 26);
        assert_eq!(report.batches, 2);
        assert_eq!(report.requests, 2);
        assert_eq!(backend.stats().await.batch_writes, vec![25]);
        assert_eq!(backend.item_count("t").await, Some(26));
    }
}
