//! Sequential batch upserts into a [`SearchIndex`].

use std::sync::Arc;

use retail_sync_algolia::{MAX_BATCH_SIZE, SearchIndex};
use retail_sync_models::NormalizedRecord;

use crate::progress::ProgressCallback;

/// Result of pushing a record list into the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Object IDs the index confirmed.
    pub records_indexed: u64,
    /// Batches sent.
    pub batches_submitted: u64,
    /// Batches that failed.
    pub batches_failed: u64,
}

/// Clamps a configured batch size to `1..=MAX_BATCH_SIZE`. Zero means the
/// maximum.
#[must_use]
pub const fn effective_batch_size(batch_size: usize) -> usize {
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        MAX_BATCH_SIZE
    } else {
        batch_size
    }
}

/// Upserts `records` in contiguous batches, one request at a time.
///
/// A failed batch is logged and counted; later batches are still sent.
pub async fn index_in_batches(
    index: &dyn SearchIndex,
    records: &[NormalizedRecord],
    batch_size: usize,
    progress: &Arc<dyn ProgressCallback>,
) -> BatchOutcome {
    let batch_size = effective_batch_size(batch_size);
    let total_batches = records.len().div_ceil(batch_size);
    let mut outcome = BatchOutcome::default();

    for (i, batch) in records.chunks(batch_size).enumerate() {
        let batch_num = i + 1;
        outcome.batches_submitted += 1;

        match index.save_objects(batch).await {
            Ok(response) => {
                outcome.records_indexed += response.object_ids.len() as u64;
                log::info!(
                    "[{}] Batch {batch_num}/{total_batches}: indexed {} records (task {})",
                    index.name(),
                    response.object_ids.len(),
                    response.task_id
                );
            }
            Err(e) => {
                outcome.batches_failed += 1;
                log::error!(
                    "[{}] Batch {batch_num}/{total_batches} ({} records) failed: {e}",
                    index.name(),
                    batch.len()
                );
            }
        }

        progress.inc(batch.len() as u64);
    }

    outcome
}
