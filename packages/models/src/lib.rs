#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record and run-summary types shared by the retail sync jobs.
//!
//! [`SourceRecord`] is a row as Airtable returns it; [`NormalizedRecord`] is
//! the shape pushed to the Algolia search index. The summary types hold the
//! counters a single job invocation reports back to its caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record read from an Airtable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    /// Airtable record ID (e.g., `"recA1b2C3d4E5f6G7"`).
    pub id: String,
    /// Creation timestamp as reported by Airtable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    /// Field name → value, in the table's own naming convention.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl SourceRecord {
    /// Creates a record from an ID and a field map.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            created_time: None,
            fields,
        }
    }

    /// Returns the raw value of a field, if set.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A record in the shape the search index stores it.
///
/// Serializes as one flat JSON object: the normalized source fields plus
/// `objectID`, `airTableId` and (when coordinates are known) `_geoloc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Upsert key. Same ID overwrites the existing index entry.
    #[serde(rename = "objectID")]
    pub object_id: String,
    /// ID of the Airtable record this was built from.
    #[serde(rename = "airTableId")]
    pub air_table_id: String,
    /// Geo-point used by the index for geo search.
    #[serde(rename = "_geoloc", default, skip_serializing_if = "Option::is_none")]
    pub geoloc: Option<GeoPoint>,
    /// Remaining fields, keyed by camel-cased name.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Counters reported by one run of the index sync job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    /// Records read from the source table.
    pub records_fetched: u64,
    /// Object IDs the search index confirmed as saved.
    pub records_indexed: u64,
    /// Records dropped before indexing because their upsert key could not
    /// be built.
    pub records_skipped: u64,
    /// Batches sent to the index.
    pub batches_submitted: u64,
    /// Batches the index rejected or that failed in transit.
    pub batches_failed: u64,
}

/// Counters reported by one run of the geocode sync job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeSummary {
    /// Records geocoded and written back.
    pub updated_count: u64,
    /// Records without an address.
    pub no_address_count: u64,
    /// Records that already had both coordinates.
    pub already_geocoded_count: u64,
    /// Records whose geocode lookup or write-back failed.
    pub failed_count: u64,
    /// Every record seen, regardless of outcome.
    pub total_records: u64,
}

impl GeocodeSummary {
    /// Sum of the updated, no-address and already-geocoded buckets.
    ///
    /// Never exceeds [`Self::total_records`]; the difference is
    /// [`Self::failed_count`].
    #[must_use]
    pub const fn bucketed(&self) -> u64 {
        self.updated_count + self.no_address_count + self.already_geocoded_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_airtable_record() {
        let record: SourceRecord = serde_json::from_value(json!({
            "id": "rec123",
            "createdTime": "2024-03-01T12:00:00.000Z",
            "fields": { "UPC": "0123", "Retailer ID": 7 }
        }))
        .unwrap();

        assert_eq!(record.id, "rec123");
        assert_eq!(record.created_time.as_deref(), Some("2024-03-01T12:00:00.000Z"));
        assert_eq!(record.get("Retailer ID"), Some(&json!(7)));
    }

    #[test]
    fn deserializes_record_without_fields() {
        let record: SourceRecord = serde_json::from_value(json!({ "id": "rec1" })).unwrap();
        assert!(record.fields.is_empty());
    }

    #[test]
    fn normalized_record_serializes_flat() {
        let mut fields = Map::new();
        fields.insert("productName".to_string(), json!("Oat Milk"));
        let record = NormalizedRecord {
            object_id: "0123-7".to_string(),
            air_table_id: "rec123".to_string(),
            geoloc: Some(GeoPoint::new(40.0, -105.0)),
            fields,
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "objectID": "0123-7",
                "airTableId": "rec123",
                "_geoloc": { "lat": 40.0, "lng": -105.0 },
                "productName": "Oat Milk"
            })
        );
    }

    #[test]
    fn normalized_record_omits_missing_geoloc() {
        let record = NormalizedRecord {
            object_id: "a-b".to_string(),
            air_table_id: "rec1".to_string(),
            geoloc: None,
            fields: Map::new(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("_geoloc").is_none());
    }

    #[test]
    fn geocode_summary_serializes_camel_case() {
        let summary = GeocodeSummary {
            updated_count: 1,
            no_address_count: 2,
            already_geocoded_count: 3,
            failed_count: 4,
            total_records: 10,
        };
        assert_eq!(summary.bucketed(), 6);
        assert_eq!(
            serde_json::to_value(summary).unwrap()["alreadyGeocodedCount"],
            json!(3)
        );
    }
}
