//! Environment configuration for the sync jobs.
//!
//! Everything is read once per invocation with [`SyncConfig::from_env`].
//! Nothing is required up front: each client builder checks for the
//! variables it needs and reports the first missing one as
//! [`ConfigError::MissingEnv`], so a geocode run does not need Algolia
//! credentials and vice versa.
//!
//! # Environment Variables
//!
//! | Variable | Used by | Description |
//! |---|---|---|
//! | `AIRTABLE_API_KEY` | index, geocode | Airtable personal access token |
//! | `AIRTABLE_BASE_ID` | index, geocode | Airtable base ID |
//! | `AIRTABLE_TABLE_NAME` | index | Inventory table name |
//! | `AIRTABLE_RETAILER_TABLE_NAME` | geocode | Retailer table name |
//! | `AIRTABLE_API_URL` | | Airtable host override |
//! | `ALGOLIA_APP_ID` | index, map | Algolia application ID |
//! | `ALGOLIA_ADMIN_API_KEY` | index | Write key |
//! | `ALGOLIA_API_KEY` | map | Search key (falls back to the admin key) |
//! | `ALGOLIA_INDEX_NAME` | index, map | Inventory index name |
//! | `ALGOLIA_MAP_INDEX_NAME` | map | Retailer index (default `{ALGOLIA_INDEX_NAME}-retailers`) |
//! | `ALGOLIA_API_URL` | | Algolia host override |
//! | `GOOGLE_API_KEY` | geocode | Geocoding API key |
//! | `GOOGLE_GEOCODE_URL` | | Geocoding host override |
//!
//! The Algolia variables also accept the `VITE_`-prefixed names the
//! frontend build uses.

use std::collections::BTreeMap;

use retail_sync_airtable::AirtableClient;
use retail_sync_algolia::AlgoliaIndex;
use retail_sync_geocoder::google::GoogleGeocoder;

use crate::job_registry::{JobDefinition, all_jobs};

/// Suffix appended to the inventory index name to get the retailer index.
pub const RETAILER_INDEX_SUFFIX: &str = "-retailers";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },
}

/// Settings for every external service the jobs talk to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// `AIRTABLE_API_KEY`.
    pub airtable_api_key: Option<String>,
    /// `AIRTABLE_BASE_ID`.
    pub airtable_base_id: Option<String>,
    /// `AIRTABLE_API_URL`.
    pub airtable_api_url: Option<String>,
    /// Table names keyed by the environment variable they were read from.
    pub tables: BTreeMap<String, String>,
    /// `ALGOLIA_APP_ID`.
    pub algolia_app_id: Option<String>,
    /// `ALGOLIA_ADMIN_API_KEY`.
    pub algolia_admin_api_key: Option<String>,
    /// `ALGOLIA_API_KEY`.
    pub algolia_search_api_key: Option<String>,
    /// `ALGOLIA_INDEX_NAME`.
    pub algolia_index_name: Option<String>,
    /// `ALGOLIA_MAP_INDEX_NAME`.
    pub algolia_map_index_name: Option<String>,
    /// `ALGOLIA_API_URL`.
    pub algolia_api_url: Option<String>,
    /// `GOOGLE_API_KEY`.
    pub google_api_key: Option<String>,
    /// `GOOGLE_GEOCODE_URL`.
    pub google_geocode_url: Option<String>,
}

impl SyncConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as
    /// unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        };

        let tables = all_jobs()
            .into_iter()
            .filter_map(|job| get(&[job.table_env.as_str()]).map(|table| (job.table_env, table)))
            .collect();

        Self {
            airtable_api_key: get(&["AIRTABLE_API_KEY"]),
            airtable_base_id: get(&["AIRTABLE_BASE_ID"]),
            airtable_api_url: get(&["AIRTABLE_API_URL"]),
            tables,
            algolia_app_id: get(&["ALGOLIA_APP_ID", "VITE_ALGOLIA_APP_ID"]),
            algolia_admin_api_key: get(&["ALGOLIA_ADMIN_API_KEY"]),
            algolia_search_api_key: get(&["ALGOLIA_API_KEY", "VITE_ALGOLIA_API_KEY"]),
            algolia_index_name: get(&["ALGOLIA_INDEX_NAME", "VITE_ALGOLIA_INDEX_NAME"]),
            algolia_map_index_name: get(&["ALGOLIA_MAP_INDEX_NAME"]),
            algolia_api_url: get(&["ALGOLIA_API_URL"]),
            google_api_key: get(&["GOOGLE_API_KEY"]),
            google_geocode_url: get(&["GOOGLE_GEOCODE_URL"]),
        }
    }

    /// Name of the Airtable table `job` reads.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the job's table variable is
    /// unset.
    pub fn table_for(&self, job: &JobDefinition) -> Result<&str, ConfigError> {
        self.tables
            .get(&job.table_env)
            .map(String::as_str)
            .ok_or_else(|| missing(&job.table_env))
    }

    /// Builds the Airtable client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the API key or base ID is
    /// unset.
    pub fn airtable_client(&self, http: &reqwest::Client) -> Result<AirtableClient, ConfigError> {
        let api_key = require(self.airtable_api_key.as_ref(), "AIRTABLE_API_KEY")?;
        let base_id = require(self.airtable_base_id.as_ref(), "AIRTABLE_BASE_ID")?;

        let client = AirtableClient::new(http.clone(), api_key, base_id);
        Ok(match &self.airtable_api_url {
            Some(url) => client.with_api_url(url),
            None => client,
        })
    }

    /// Builds a write-capable client for the inventory index.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the app ID, admin key or index
    /// name is unset.
    pub fn search_index(&self, http: &reqwest::Client) -> Result<AlgoliaIndex, ConfigError> {
        let app_id = require(self.algolia_app_id.as_ref(), "ALGOLIA_APP_ID")?;
        let api_key = require(self.algolia_admin_api_key.as_ref(), "ALGOLIA_ADMIN_API_KEY")?;
        let index_name = require(self.algolia_index_name.as_ref(), "ALGOLIA_INDEX_NAME")?;

        Ok(self.with_algolia_host(AlgoliaIndex::new(http.clone(), app_id, api_key, index_name)))
    }

    /// Builds a read client for the retailer index behind the map feed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the app ID, both API keys, or
    /// both index names are unset.
    pub fn map_index(&self, http: &reqwest::Client) -> Result<AlgoliaIndex, ConfigError> {
        let app_id = require(self.algolia_app_id.as_ref(), "ALGOLIA_APP_ID")?;
        let api_key = require(
            self.algolia_search_api_key
                .as_ref()
                .or(self.algolia_admin_api_key.as_ref()),
            "ALGOLIA_API_KEY",
        )?;
        let index_name = self.map_index_name()?;

        Ok(self.with_algolia_host(AlgoliaIndex::new(http.clone(), app_id, api_key, &index_name)))
    }

    /// Name of the retailer index.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if neither the map index name nor
    /// the base index name is set.
    pub fn map_index_name(&self) -> Result<String, ConfigError> {
        if let Some(name) = &self.algolia_map_index_name {
            return Ok(name.clone());
        }
        let base = require(self.algolia_index_name.as_ref(), "ALGOLIA_INDEX_NAME")?;
        Ok(format!("{base}{RETAILER_INDEX_SUFFIX}"))
    }

    /// Builds the geocoder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the Google API key is unset.
    pub fn geocoder(&self, http: &reqwest::Client) -> Result<GoogleGeocoder, ConfigError> {
        let api_key = require(self.google_api_key.as_ref(), "GOOGLE_API_KEY")?;

        let geocoder = GoogleGeocoder::new(http.clone(), api_key);
        Ok(match &self.google_geocode_url {
            Some(url) => geocoder.with_base_url(url),
            None => geocoder,
        })
    }

    fn with_algolia_host(&self, index: AlgoliaIndex) -> AlgoliaIndex {
        match &self.algolia_api_url {
            Some(url) => index.with_host(url),
            None => index,
        }
    }
}

fn require<'a>(value: Option<&'a String>, name: &str) -> Result<&'a str, ConfigError> {
    value.map(String::as_str).ok_or_else(|| missing(name))
}

fn missing(name: &str) -> ConfigError {
    ConfigError::MissingEnv {
        name: name.to_string(),
    }
}
