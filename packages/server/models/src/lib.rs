#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the retail sync server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the job summary types so the response contract can keep its
//! established field names while the summaries evolve.

use retail_sync_models::{GeocodeSummary, IndexSummary};
use serde::Serialize;

/// Message returned by a successful index sync.
pub const INDEX_SYNC_MESSAGE: &str = "Data processing complete.";

/// Message returned by a successful geocode sync.
pub const GEOCODE_SYNC_MESSAGE: &str = "Airtable update completed successfully.";

/// Response of `GET /api/algolia`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIndexSyncResponse {
    /// Always [`INDEX_SYNC_MESSAGE`].
    pub message: String,
    /// Object IDs confirmed by the search index.
    pub records_indexed: u64,
    /// Records skipped for lack of a usable key.
    pub records_skipped: u64,
    /// Batches the search index rejected.
    pub batches_failed: u64,
}

impl From<IndexSummary> for ApiIndexSyncResponse {
    fn from(summary: IndexSummary) -> Self {
        Self {
            message: INDEX_SYNC_MESSAGE.to_string(),
            records_indexed: summary.records_indexed,
            records_skipped: summary.records_skipped,
            batches_failed: summary.batches_failed,
        }
    }
}

/// Response of `GET /api/geocode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGeocodeSyncResponse {
    /// Always [`GEOCODE_SYNC_MESSAGE`].
    pub message: String,
    /// Records geocoded and written back.
    pub updated_count: u64,
    /// Records without an address.
    pub no_address_count: u64,
    /// Every record reviewed.
    pub total_records: u64,
    /// Records that already had coordinates.
    pub already_geocoded_count: u64,
    /// Records whose lookup or write-back failed.
    pub failed_count: u64,
}

impl From<GeocodeSummary> for ApiGeocodeSyncResponse {
    fn from(summary: GeocodeSummary) -> Self {
        Self {
            message: GEOCODE_SYNC_MESSAGE.to_string(),
            updated_count: summary.updated_count,
            no_address_count: summary.no_address_count,
            total_records: summary.total_records,
            already_geocoded_count: summary.already_geocoded_count,
            failed_count: summary.failed_count,
        }
    }
}

/// Error body returned with a 500.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Human-readable error.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
