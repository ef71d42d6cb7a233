//! Compile-time registry of sync job definitions.
//!
//! Each job is described by a TOML file under `jobs/` naming the Airtable
//! table (through the environment variable that holds its name), the view
//! to read through, and the job-specific field rules. The files are
//! embedded at compile time and exposed via [`all_jobs`] and [`find_job`].

use retail_sync_airtable::{ListQuery, MAX_PAGE_SIZE};
use retail_sync_algolia::MAX_BATCH_SIZE;
use serde::Deserialize;

/// ID of the inventory → search index job.
pub const INVENTORY_JOB_ID: &str = "inventory";

/// ID of the retailer geocoding job.
pub const RETAILERS_JOB_ID: &str = "retailers";

/// A sync job definition loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDefinition {
    /// Unique identifier (e.g., `"inventory"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Environment variable holding the Airtable table name.
    pub table_env: String,
    /// Airtable view to read through.
    #[serde(default)]
    pub view: Option<String>,
    /// Records per Airtable page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// What the job does with the records it reads.
    pub kind: JobKind,
}

/// Job-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Normalize records and upsert them into the search index.
    Index(IndexRules),
    /// Geocode addresses and write coordinates back to the table.
    Geocode(GeocodeFields),
}

/// Field rules for building search index records.
///
/// Field names refer to the camel-cased names produced by
/// [`crate::normalize::camel_case`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexRules {
    /// Records per `save_objects` call. Capped at the index's own limit.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Fields whose values are joined into the `objectID`.
    pub key_fields: Vec<String>,
    /// Separator placed between key field values.
    #[serde(default = "default_key_separator")]
    pub key_separator: String,
    /// Latitude lookup field (array valued).
    #[serde(default = "default_lat")]
    pub lat_field: String,
    /// Longitude lookup field (array valued).
    #[serde(default = "default_lng")]
    pub lng_field: String,
}

impl Default for IndexRules {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            key_fields: vec!["upc".to_string(), "retailerId".to_string()],
            key_separator: default_key_separator(),
            lat_field: default_lat(),
            lng_field: default_lng(),
        }
    }
}

/// Raw (un-normalized) field names used by the geocoding job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeocodeFields {
    /// One-line street address.
    #[serde(rename = "address_field")]
    pub address: String,
    /// Latitude field written back on success.
    #[serde(rename = "lat_field")]
    pub lat: String,
    /// Longitude field written back on success.
    #[serde(rename = "lng_field")]
    pub lng: String,
}

impl Default for GeocodeFields {
    fn default() -> Self {
        Self {
            address: "FULLADDRESS".to_string(),
            lat: "LAT".to_string(),
            lng: "LNG".to_string(),
        }
    }
}

const fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

const fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_key_separator() -> String {
    "-".to_string()
}

fn default_lat() -> String {
    "lat".to_string()
}

fn default_lng() -> String {
    "lng".to_string()
}

impl JobDefinition {
    /// Airtable listing options for this job.
    #[must_use]
    pub fn list_query(&self) -> ListQuery {
        ListQuery {
            view: self.view.clone(),
            page_size: self.page_size,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const JOB_TOMLS: &[(&str, &str)] = &[
    ("inventory", include_str!("../jobs/inventory.toml")),
    ("retailers", include_str!("../jobs/retailers.toml")),
];

#[cfg(test)]
const EXPECTED_JOB_COUNT: usize = 2;

/// Returns all job definitions.
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so
/// this surfaces in the registry tests rather than at runtime).
#[must_use]
pub fn all_jobs() -> Vec<JobDefinition> {
    JOB_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse job '{name}': {e}"))
        })
        .collect()
}

/// Looks up a job by ID.
#[must_use]
pub fn find_job(id: &str) -> Option<JobDefinition> {
    all_jobs().into_iter().find(|job| job.id == id)
}
