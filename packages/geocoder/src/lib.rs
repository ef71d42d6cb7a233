#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for retailer records.
//!
//! Converts a one-line street address to latitude/longitude. The only
//! provider is the [Google Geocoding API](google); the geocode sync job
//! depends on the [`Geocoder`] trait so it can be driven by a canned
//! provider in tests.
//!
//! Callers are expected to issue one request at a time. Nothing here rate
//! limits on its own.

pub mod google;

use async_trait::async_trait;
use retail_sync_models::GeoPoint;
use thiserror::Error;

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered but refused or failed the lookup.
    #[error("Geocoder returned status {status}: {message}")]
    Status {
        /// Provider status (HTTP code or API status string).
        status: String,
        /// Provider error message, if any.
        message: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit or quota exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Resolves addresses to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocodes a free-form address.
    ///
    /// Returns `Ok(None)` when the provider has no match for the address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the provider rejects
    /// it.
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}
