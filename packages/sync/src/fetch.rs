//! Paged reads from a [`RecordSource`].
//!
//! [`record_pages`] turns Airtable's offset cursor into a pull-based
//! [`Stream`]: nothing is requested until the caller polls, and the next
//! page is only requested after the previous one has been handed over.
//! [`fetch_all`] drains that stream for jobs that need the whole table in
//! memory.

use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, StreamExt as _};
use retail_sync_airtable::{AirtableError, ListQuery, RecordSource};
use retail_sync_models::SourceRecord;

use crate::SyncError;
use crate::progress::ProgressCallback;

/// Streams `table` one page at a time.
///
/// The stream ends after the first page that carries no continuation
/// offset. A paging error is yielded once and ends the stream.
pub fn record_pages<'a>(
    source: &'a dyn RecordSource,
    table: &'a str,
    query: &'a ListQuery,
) -> impl Stream<Item = Result<Vec<SourceRecord>, AirtableError>> + Send + 'a {
    try_stream! {
        let mut offset: Option<String> = None;
        let mut page_num = 0u32;

        loop {
            let page = source.list_page(table, query, offset.as_deref()).await?;
            page_num += 1;

            log::debug!(
                "[{table}] Page {page_num}: {} records (more: {})",
                page.records.len(),
                page.offset.is_some()
            );

            let next = page.offset;
            yield page.records;

            match next {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
    }
}

/// Reads every record of `table` into memory.
///
/// # Errors
///
/// Returns [`SyncError::Fetch`] if any page fails. Records from earlier
/// pages are discarded.
pub async fn fetch_all(
    source: &dyn RecordSource,
    table: &str,
    query: &ListQuery,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<SourceRecord>, SyncError> {
    let mut pages = std::pin::pin!(record_pages(source, table, query));
    let mut records = Vec::new();

    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| fetch_error(table, e))?;
        progress.inc(page.len() as u64);
        records.extend(page);
    }

    log::info!("[{table}] Fetched {} records", records.len());
    Ok(records)
}

pub(crate) fn fetch_error(table: &str, source: AirtableError) -> SyncError {
    log::error!("[{table}] Error fetching records: {source}");
    SyncError::Fetch {
        table: table.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::null_progress;
    use crate::testing::{FakeTable, record};
    use futures::TryStreamExt as _;
    use serde_json::json;

    fn records(n: usize) -> Vec<SourceRecord> {
        (0..n)
            .map(|i| record(&format!("rec{i}"), &json!({ "n": i })))
            .collect()
    }

    #[tokio::test]
    async fn follows_offsets_until_last_page() {
        let table = FakeTable::paged(records(250), 100);
        let query = ListQuery::view("All Inventory");

        let pages: Vec<Vec<SourceRecord>> = record_pages(&table, "Inventory", &query)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(
            pages.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![100, 100, 50]
        );
        assert_eq!(
            *table.requested_offsets.lock().unwrap(),
            vec![None, Some("page-1".to_string()), Some("page-2".to_string())]
        );
    }

    #[tokio::test]
    async fn pulls_pages_lazily() {
        let table = FakeTable::paged(records(300), 100);
        let query = ListQuery::view("All Inventory");
        let mut pages = std::pin::pin!(record_pages(&table, "Inventory", &query));

        assert_eq!(table.list_calls(), 0);
        pages.next().await.unwrap().unwrap();
        assert_eq!(table.list_calls(), 1);
    }

    #[tokio::test]
    async fn empty_table_yields_one_empty_page() {
        let table = FakeTable::default();
        let query = ListQuery::view("Grid view");

        let all = fetch_all(&table, "Retailers", &query, &null_progress())
            .await
            .unwrap();

        assert!(all.is_empty());
        assert_eq!(table.list_calls(), 1);
    }

    #[tokio::test]
    async fn fetch_all_keeps_order() {
        let table = FakeTable::paged(records(230), 100);
        let query = ListQuery::view("All Inventory");

        let all = fetch_all(&table, "Inventory", &query, &null_progress())
            .await
            .unwrap();

        assert_eq!(all.len(), 230);
        assert!(all.iter().enumerate().all(|(i, r)| r.id == format!("rec{i}")));
    }

    #[tokio::test]
    async fn paging_error_discards_partial_result() {
        let mut table = FakeTable::paged(records(300), 100);
        table.fail_page = Some(1);
        let query = ListQuery::view("All Inventory");

        let err = fetch_all(&table, "Inventory", &query, &null_progress())
            .await
            .unwrap_err();

        match err {
            SyncError::Fetch { table, source } => {
                assert_eq!(table, "Inventory");
                assert!(matches!(source, AirtableError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(table.list_calls(), 2);
    }
}
