//! Retailer geocoding with write-back to the source table.
//!
//! Records are handled one at a time: classify, geocode if needed, then
//! write the coordinates back before moving on. Per-record failures are
//! logged and counted in [`GeocodeSummary::failed_count`]; they never abort
//! the page.

use std::num::FpCategory;
use std::sync::Arc;

use retail_sync_airtable::{AirtableError, RecordSource};
use retail_sync_geocoder::{GeocodeError, Geocoder};
use retail_sync_models::{GeoPoint, GeocodeSummary, SourceRecord};
use serde_json::{Map, Value};

use crate::job_registry::GeocodeFields;
use crate::normalize::joined_text;
use crate::progress::ProgressCallback;

/// What the geocode job should do with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    /// Has an address but is missing a coordinate.
    NeedsGeocode(String),
    /// Has no address.
    NoAddress,
    /// Has an address and both coordinates.
    AlreadyGeocoded,
}

/// Why a record that needed geocoding was not updated.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The geocoder call failed.
    #[error("Geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),
    /// The geocoder found no match for the address.
    #[error("No geocoding match")]
    NoMatch,
    /// Writing the coordinates back failed.
    #[error("Update failed: {0}")]
    Update(#[from] AirtableError),
}

/// Whether a field value counts as set.
///
/// Null, `""`, `[]`, `false` and `0` count as unset.
#[must_use]
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null | Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Number(n)) => n
            .as_f64()
            .is_some_and(|n| !matches!(n.classify(), FpCategory::Zero | FpCategory::Nan)),
        Some(Value::Bool(true) | Value::Object(_)) => true,
    }
}

/// Decides what to do with `record`.
#[must_use]
pub fn classify(record: &SourceRecord, fields: &GeocodeFields) -> RecordState {
    let address = record.get(&fields.address);
    if !is_present(address) {
        return RecordState::NoAddress;
    }

    if is_present(record.get(&fields.lat)) && is_present(record.get(&fields.lng)) {
        return RecordState::AlreadyGeocoded;
    }

    let address = match address {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => joined_text(items),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    RecordState::NeedsGeocode(address)
}

/// Processes one page of records, updating `summary` as it goes.
///
/// `total_records` grows by the page length before any record is handled.
pub async fn enrich_page(
    source: &dyn RecordSource,
    geocoder: &dyn Geocoder,
    table: &str,
    records: &[SourceRecord],
    fields: &GeocodeFields,
    summary: &mut GeocodeSummary,
    progress: &Arc<dyn ProgressCallback>,
) {
    summary.total_records += records.len() as u64;

    for record in records {
        match classify(record, fields) {
            RecordState::NoAddress => summary.no_address_count += 1,
            RecordState::AlreadyGeocoded => summary.already_geocoded_count += 1,
            RecordState::NeedsGeocode(address) => {
                log::info!("[{table}] Geocoding address: {address}");
                match geocode_and_update(source, geocoder, table, record, &address, fields).await {
                    Ok(point) => {
                        summary.updated_count += 1;
                        log::info!(
                            "[{table}] Updated record {} with lat: {}, lng: {}",
                            record.id,
                            point.lat,
                            point.lng
                        );
                    }
                    Err(e) => {
                        summary.failed_count += 1;
                        log::error!("[{table}] Record {} ({address}): {e}", record.id);
                    }
                }
            }
        }
        progress.inc(1);
    }
}

async fn geocode_and_update(
    source: &dyn RecordSource,
    geocoder: &dyn Geocoder,
    table: &str,
    record: &SourceRecord,
    address: &str,
    fields: &GeocodeFields,
) -> Result<GeoPoint, RecordError> {
    let point = geocoder
        .geocode(address)
        .await?
        .ok_or(RecordError::NoMatch)?;

    let mut update = Map::new();
    update.insert(fields.lat.clone(), Value::from(point.lat));
    update.insert(fields.lng.clone(), Value::from(point.lng));
    source.update_fields(table, &record.id, update).await?;

    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::null_progress;
    use crate::testing::{FakeGeocoder, FakeTable, record};
    use serde_json::json;

    fn fields() -> GeocodeFields {
        GeocodeFields::default()
    }

    #[test]
    fn truthiness() {
        assert!(!is_present(None));
        assert!(!is_present(Some(&json!(null))));
        assert!(!is_present(Some(&json!(""))));
        assert!(!is_present(Some(&json!([]))));
        assert!(!is_present(Some(&json!(false))));
        assert!(!is_present(Some(&json!(0))));
        assert!(!is_present(Some(&json!(0.0))));
        assert!(is_present(Some(&json!(" "))));
        assert!(is_present(Some(&json!(-104.9))));
        assert!(is_present(Some(&json!([0]))));
        assert!(is_present(Some(&json!({}))));
    }

    #[test]
    fn classifies_records() {
        let needs = record("rec1", &json!({ "FULLADDRESS": "1 Main St", "LAT": 39.7 }));
        let none = record("rec2", &json!({ "LAT": 39.7, "LNG": -104.9 }));
        let done = record(
            "rec3",
            &json!({ "FULLADDRESS": "1 Main St", "LAT": 39.7, "LNG": -104.9 }),
        );
        let zero = record(
            "rec4",
            &json!({ "FULLADDRESS": "1 Main St", "LAT": 0, "LNG": 0 }),
        );
        let lookup = record(
            "rec5",
            &json!({ "FULLADDRESS": ["1 Main St, Denver, CO"], "LNG": -104.9 }),
        );

        assert_eq!(
            classify(&needs, &fields()),
            RecordState::NeedsGeocode("1 Main St".to_string())
        );
        assert_eq!(classify(&none, &fields()), RecordState::NoAddress);
        assert_eq!(classify(&done, &fields()), RecordState::AlreadyGeocoded);
        assert!(matches!(
            classify(&zero, &fields()),
            RecordState::NeedsGeocode(_)
        ));
        assert_eq!(
            classify(&lookup, &fields()),
            RecordState::NeedsGeocode("1 Main St, Denver, CO".to_string())
        );
    }

    #[tokio::test]
    async fn writes_coordinates_back() {
        let table = FakeTable::default();
        let geocoder = FakeGeocoder::default();
        let page = vec![record("rec1", &json!({ "FULLADDRESS": "1 Main St" }))];
        let mut summary = GeocodeSummary::default();

        enrich_page(
            &table,
            &geocoder,
            "Retailers",
            &page,
            &fields(),
            &mut summary,
            &null_progress(),
        )
        .await;

        assert_eq!(summary.updated_count, 1);
        assert_eq!(summary.total_records, 1);
        let updates = table.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (table_name, id, written) = &updates[0];
        assert_eq!(table_name, "Retailers");
        assert_eq!(id, "rec1");
        assert_eq!(
            Value::Object(written.clone()),
            json!({ "LAT": 39.7392, "LNG": -104.9903 })
        );
    }

    #[tokio::test]
    async fn misses_and_failures_count_as_failed() {
        let table = FakeTable {
            fail_updates: ["rec3".to_string()].into_iter().collect(),
            ..FakeTable::default()
        };
        let geocoder = FakeGeocoder {
            results: [("Nowhere".to_string(), None)].into_iter().collect(),
            failing: ["Broken".to_string()].into_iter().collect(),
            ..FakeGeocoder::default()
        };
        let page = vec![
            record("rec1", &json!({ "FULLADDRESS": "Nowhere" })),
            record("rec2", &json!({ "FULLADDRESS": "Broken" })),
            record("rec3", &json!({ "FULLADDRESS": "1 Main St" })),
            record("rec4", &json!({ "FULLADDRESS": "2 Main St" })),
        ];
        let mut summary = GeocodeSummary::default();

        enrich_page(
            &table,
            &geocoder,
            "Retailers",
            &page,
            &fields(),
            &mut summary,
            &null_progress(),
        )
        .await;

        assert_eq!(summary.updated_count, 1);
        assert_eq!(summary.failed_count, 3);
        assert_eq!(summary.total_records, 4);
        assert_eq!(geocoder.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn skips_geocoder_for_complete_records() {
        let table = FakeTable::default();
        let geocoder = FakeGeocoder::default();
        let page = vec![
            record("rec1", &json!({})),
            record(
                "rec2",
                &json!({ "FULLADDRESS": "1 Main St", "LAT": 1.0, "LNG": 2.0 }),
            ),
        ];
        let mut summary = GeocodeSummary::default();

        enrich_page(
            &table,
            &geocoder,
            "Retailers",
            &page,
            &fields(),
            &mut summary,
            &null_progress(),
        )
        .await;

        assert!(geocoder.calls.lock().unwrap().is_empty());
        assert_eq!(summary.no_address_count, 1);
        assert_eq!(summary.already_geocoded_count, 1);
    }
}
