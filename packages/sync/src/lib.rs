#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sync jobs between Airtable, Algolia and the Google geocoder.
//!
//! Three jobs, each run to completion per invocation:
//!
//! - **Index sync** ([`run_index_sync`]): reads the inventory table,
//!   normalizes every record and upserts the result into the search index
//!   in batches.
//! - **Geocode sync** ([`run_geocode_sync`]): reads the retailer table page
//!   by page, geocodes retailers that have an address but no coordinates,
//!   and writes the coordinates back.
//! - **Map feed** ([`map::build_map`]): reads retailer hits from the search
//!   index and returns them as a `GeoJSON` `FeatureCollection`.
//!
//! The `run_*` functions take their clients as trait objects. The `sync_*`
//! functions look up the job definition, build real clients from a
//! [`SyncConfig`] and delegate to them.

pub mod config;
pub mod enrich;
pub mod fetch;
pub mod indexer;
pub mod job_registry;
pub mod map;
pub mod normalize;
pub mod progress;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use futures::StreamExt as _;
use geojson::FeatureCollection;
use retail_sync_airtable::{AirtableError, ListQuery, RecordSource};
use retail_sync_algolia::{AlgoliaError, SearchIndex};
use retail_sync_geocoder::Geocoder;
use retail_sync_models::{GeocodeSummary, IndexSummary};

use crate::config::{ConfigError, SyncConfig};
use crate::job_registry::{
    GeocodeFields, INVENTORY_JOB_ID, IndexRules, JobDefinition, JobKind, RETAILERS_JOB_ID,
    find_job,
};
use crate::progress::ProgressCallback;

/// User agent sent to every external service.
const USER_AGENT: &str = concat!("retail-sync/", env!("CARGO_PKG_VERSION"));

/// Errors that abort a sync job.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Required configuration is missing.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
    /// Reading the source table failed.
    #[error("Error fetching records from {table}: {source}")]
    Fetch {
        /// Table being read.
        table: String,
        /// Underlying Airtable error.
        source: AirtableError,
    },
    /// A search index request failed.
    #[error("Search error: {0}")]
    Search(#[from] AlgoliaError),
    /// No job with this ID is registered.
    #[error("Unknown job: {id}")]
    UnknownJob {
        /// Requested job ID.
        id: String,
    },
    /// The job exists but is not of the expected kind.
    #[error("Job {id} is not of kind '{expected}'")]
    WrongJobKind {
        /// Job ID.
        id: String,
        /// Kind the caller needed.
        expected: &'static str,
    },
}

/// Reads `table`, normalizes every record and upserts the result into
/// `index`.
///
/// Records without a usable key are skipped and counted. Failed batches are
/// counted but do not fail the run.
///
/// # Errors
///
/// Returns [`SyncError::Fetch`] if reading the table fails.
pub async fn run_index_sync(
    source: &dyn RecordSource,
    index: &dyn SearchIndex,
    table: &str,
    query: &ListQuery,
    rules: &IndexRules,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<IndexSummary, SyncError> {
    progress.set_message(format!("Fetching {table}"));
    let records = fetch::fetch_all(source, table, query, progress).await?;
    let records_fetched = records.len() as u64;

    let mut records_skipped = 0u64;
    let normalized: Vec<_> = records
        .into_iter()
        .filter_map(|record| match normalize::normalize_record(record, rules) {
            Ok(record) => Some(record),
            Err(e) => {
                records_skipped += 1;
                log::warn!("[{table}] Skipping record: {e}");
                None
            }
        })
        .collect();

    log::info!(
        "[{table}] Indexing {} records into {} ({records_skipped} skipped)",
        normalized.len(),
        index.name()
    );
    progress.set_message(format!("Indexing into {}", index.name()));
    progress.set_total(normalized.len() as u64);

    let outcome = indexer::index_in_batches(index, &normalized, rules.batch_size, progress).await;

    let summary = IndexSummary {
        records_fetched,
        records_indexed: outcome.records_indexed,
        records_skipped,
        batches_submitted: outcome.batches_submitted,
        batches_failed: outcome.batches_failed,
    };
    log::info!(
        "[{table}] Index sync complete: {} fetched, {} indexed, {} skipped, {}/{} batches failed",
        summary.records_fetched,
        summary.records_indexed,
        summary.records_skipped,
        summary.batches_failed,
        summary.batches_submitted
    );
    progress.finish(format!("{} records indexed", summary.records_indexed));
    Ok(summary)
}

/// Pages through `table`, geocoding and updating records that need it.
///
/// Each page is fully processed before the next one is requested.
///
/// # Errors
///
/// Returns [`SyncError::Fetch`] if reading a page fails. Counts for pages
/// already processed are discarded; their updates have been written.
pub async fn run_geocode_sync(
    source: &dyn RecordSource,
    geocoder: &dyn Geocoder,
    table: &str,
    query: &ListQuery,
    fields: &GeocodeFields,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<GeocodeSummary, SyncError> {
    log::info!("[{table}] Starting geocoding process");
    progress.set_message(format!("Geocoding {table}"));

    let mut summary = GeocodeSummary::default();
    let mut pages = std::pin::pin!(fetch::record_pages(source, table, query));

    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| fetch::fetch_error(table, e))?;
        enrich::enrich_page(source, geocoder, table, &page, fields, &mut summary, progress).await;
    }

    log::info!(
        "[{table}] Completed processing all records. Reviewed: {}, updated: {}, without address: {}, already geocoded: {}, failed: {}",
        summary.total_records,
        summary.updated_count,
        summary.no_address_count,
        summary.already_geocoded_count,
        summary.failed_count
    );
    progress.finish(format!("{} records updated", summary.updated_count));
    Ok(summary)
}

/// Builds the shared HTTP client.
///
/// # Errors
///
/// Returns [`SyncError::Client`] if the TLS backend fails to initialize.
pub fn http_client() -> Result<reqwest::Client, SyncError> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// Runs the inventory index job with clients built from `config`.
///
/// # Errors
///
/// Returns [`SyncError::Config`] if a required variable is unset, or any
/// error from [`run_index_sync`].
pub async fn sync_index(
    config: &SyncConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<IndexSummary, SyncError> {
    let job = job(INVENTORY_JOB_ID)?;
    let JobKind::Index(rules) = &job.kind else {
        return Err(wrong_kind(&job, "index"));
    };

    let table = config.table_for(&job)?;
    let http = http_client()?;
    let source = config.airtable_client(&http)?;
    let index = config.search_index(&http)?;

    run_index_sync(&source, &index, table, &job.list_query(), rules, progress).await
}

/// Runs the retailer geocode job with clients built from `config`.
///
/// # Errors
///
/// Returns [`SyncError::Config`] if a required variable is unset, or any
/// error from [`run_geocode_sync`].
pub async fn sync_geocode(
    config: &SyncConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<GeocodeSummary, SyncError> {
    let job = job(RETAILERS_JOB_ID)?;
    let JobKind::Geocode(fields) = &job.kind else {
        return Err(wrong_kind(&job, "geocode"));
    };

    let table = config.table_for(&job)?;
    let http = http_client()?;
    let source = config.airtable_client(&http)?;
    let geocoder = config.geocoder(&http)?;

    run_geocode_sync(&source, &geocoder, table, &job.list_query(), fields, progress).await
}

/// Builds the retailer map feed with a client built from `config`.
///
/// # Errors
///
/// Returns [`SyncError::Config`] if a required variable is unset, or
/// [`SyncError::Search`] if the query fails.
pub async fn sync_map(config: &SyncConfig) -> Result<FeatureCollection, SyncError> {
    let http = http_client()?;
    let index = config.map_index(&http)?;
    map::build_map(&index).await
}

fn job(id: &str) -> Result<JobDefinition, SyncError> {
    find_job(id).ok_or_else(|| SyncError::UnknownJob { id: id.to_string() })
}

fn wrong_kind(job: &JobDefinition, expected: &'static str) -> SyncError {
    SyncError::WrongJobKind {
        id: job.id.clone(),
        expected,
    }
}
