//! In-memory stand-ins for Airtable, Algolia and the geocoder.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use retail_sync_airtable::{AirtableError, ListQuery, RecordPage, RecordSource};
use retail_sync_algolia::{
    AlgoliaError, SaveObjectsResponse, SearchIndex, SearchQuery, SearchResponse,
};
use retail_sync_geocoder::{GeocodeError, Geocoder};
use retail_sync_models::{GeoPoint, NormalizedRecord, SourceRecord};
use serde_json::{Map, Value};

/// Builds a record from a `json!` object literal.
pub fn record(id: &str, fields: &Value) -> SourceRecord {
    SourceRecord::new(id, fields.as_object().cloned().unwrap_or_default())
}

/// A table served from fixed pages. Offsets are `"page-{n}"`.
#[derive(Default)]
pub struct FakeTable {
    pub pages: Vec<Vec<SourceRecord>>,
    /// Page index that answers with a 500 instead of records.
    pub fail_page: Option<usize>,
    /// Record IDs whose updates are rejected.
    pub fail_updates: BTreeSet<String>,
    pub requested_offsets: Mutex<Vec<Option<String>>>,
    pub updates: Mutex<Vec<(String, String, Map<String, Value>)>>,
}

impl FakeTable {
    /// Splits `records` into pages of `page_size`.
    pub fn paged(records: Vec<SourceRecord>, page_size: usize) -> Self {
        Self {
            pages: records.chunks(page_size).map(<[_]>::to_vec).collect(),
            ..Self::default()
        }
    }

    pub fn list_calls(&self) -> usize {
        self.requested_offsets.lock().unwrap().len()
    }
}

#[async_trait]
impl RecordSource for FakeTable {
    async fn list_page(
        &self,
        _table: &str,
        _query: &ListQuery,
        offset: Option<&str>,
    ) -> Result<RecordPage, AirtableError> {
        self.requested_offsets
            .lock()
            .unwrap()
            .push(offset.map(String::from));

        let index = offset
            .and_then(|o| o.strip_prefix("page-"))
            .map_or(0, |n| n.parse::<usize>().unwrap());

        if self.fail_page == Some(index) {
            return Err(AirtableError::Status {
                status: 500,
                body: "server error".to_string(),
            });
        }

        let records = self.pages.get(index).cloned().unwrap_or_default();
        let offset = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(RecordPage { records, offset })
    }

    async fn update_fields(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<SourceRecord, AirtableError> {
        if self.fail_updates.contains(record_id) {
            return Err(AirtableError::Status {
                status: 422,
                body: "INVALID_VALUE_FOR_COLUMN".to_string(),
            });
        }
        self.updates
            .lock()
            .unwrap()
            .push((table.to_string(), record_id.to_string(), fields.clone()));
        Ok(SourceRecord::new(record_id, fields))
    }
}

/// An index that records every batch it receives.
#[derive(Default)]
pub struct FakeIndex {
    /// Zero-based batch numbers that fail.
    pub fail_batches: BTreeSet<usize>,
    pub hits: Vec<Map<String, Value>>,
    pub fail_search: bool,
    pub batches: Mutex<Vec<Vec<NormalizedRecord>>>,
}

impl FakeIndex {
    pub fn batch_ids(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.iter().map(|o| o.object_id.clone()).collect())
            .collect()
    }

    /// Every record submitted, in order, failed batches included.
    pub fn saved_records(&self) -> Vec<NormalizedRecord> {
        self.batches.lock().unwrap().concat()
    }
}

#[async_trait]
impl SearchIndex for FakeIndex {
    fn name(&self) -> &str {
        "fake"
    }

    async fn save_objects(
        &self,
        objects: &[NormalizedRecord],
    ) -> Result<SaveObjectsResponse, AlgoliaError> {
        let ids: Vec<String> = objects.iter().map(|o| o.object_id.clone()).collect();
        let batch_num = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(objects.to_vec());
            batches.len() - 1
        };

        if self.fail_batches.contains(&batch_num) {
            return Err(AlgoliaError::Status {
                status: 400,
                body: "Record at the position 0 objectID is too big".to_string(),
            });
        }

        Ok(SaveObjectsResponse {
            task_id: 1,
            object_ids: ids,
        })
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, AlgoliaError> {
        if self.fail_search {
            return Err(AlgoliaError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        let hits: Vec<_> = self
            .hits
            .iter()
            .take(query.hits_per_page as usize)
            .cloned()
            .collect();
        Ok(SearchResponse {
            nb_hits: Some(self.hits.len() as u64),
            hits,
        })
    }
}

/// A geocoder with canned answers. Unknown addresses resolve to
/// `default_point`.
pub struct FakeGeocoder {
    pub results: BTreeMap<String, Option<GeoPoint>>,
    pub failing: BTreeSet<String>,
    pub default_point: GeoPoint,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeGeocoder {
    fn default() -> Self {
        Self {
            results: BTreeMap::new(),
            failing: BTreeSet::new(),
            default_point: GeoPoint::new(39.7392, -104.9903),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        self.calls.lock().unwrap().push(address.to_string());
        if self.failing.contains(address) {
            return Err(GeocodeError::Status {
                status: "UNKNOWN_ERROR".to_string(),
                message: String::new(),
            });
        }
        Ok(self
            .results
            .get(address)
            .copied()
            .unwrap_or(Some(self.default_point)))
    }
}
