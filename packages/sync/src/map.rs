//! `GeoJSON` feed of retailer locations.
//!
//! Reads retailer hits from the search index and turns every hit with a
//! `_geoloc` into a `Point` feature. Bulky inventory fields are dropped from
//! the feature properties.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use retail_sync_algolia::{SearchIndex, SearchQuery};
use serde_json::Value;

use crate::SyncError;

/// Hits requested from the retailer index.
pub const MAP_HITS_PER_PAGE: u32 = 1000;

/// Hit attributes left out of feature properties.
pub const STRIPPED_PROPERTIES: &[&str] = &[
    "coastInventoryFeed",
    "_highlightResult",
    "inventoryFeed2",
    "inventory",
    "_geoloc",
];

/// Converts one hit to a `Point` feature, or `None` if it has no usable
/// `_geoloc`.
#[must_use]
pub fn hit_to_feature(mut hit: JsonObject) -> Option<Feature> {
    let geoloc = hit.get("_geoloc")?;
    let lat = geoloc.get("lat").and_then(Value::as_f64)?;
    let lng = geoloc.get("lng").and_then(Value::as_f64)?;

    for key in STRIPPED_PROPERTIES {
        hit.remove(*key);
    }

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![lng, lat]))),
        id: None,
        properties: Some(hit),
        foreign_members: None,
    })
}

/// Builds a collection from search hits, skipping hits without a location.
#[must_use]
pub fn feature_collection(hits: Vec<JsonObject>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: hits.into_iter().filter_map(hit_to_feature).collect(),
        foreign_members: None,
    }
}

/// Queries `index` and returns its retailers as a feature collection.
///
/// # Errors
///
/// Returns [`SyncError::Search`] if the query fails.
pub async fn build_map(index: &dyn SearchIndex) -> Result<FeatureCollection, SyncError> {
    let response = index.search(&SearchQuery::all(MAP_HITS_PER_PAGE)).await?;
    let total = response.hits.len();
    let collection = feature_collection(response.hits);

    log::info!(
        "[{}] Map feed: {} of {total} hits have a location",
        index.name(),
        collection.features.len()
    );
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIndex;
    use serde_json::json;

    fn hit(value: &Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn converts_hit_to_point_feature() {
        let feature = hit_to_feature(hit(&json!({
            "objectID": "r1",
            "name": "Corner Store",
            "inventory": ["a", "b"],
            "coastInventoryFeed": "...",
            "inventoryFeed2": "...",
            "_highlightResult": {},
            "_geoloc": { "lat": 39.7, "lng": -104.9 }
        })))
        .unwrap();

        assert_eq!(
            serde_json::to_value(&feature).unwrap(),
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-104.9, 39.7] },
                "properties": { "objectID": "r1", "name": "Corner Store" }
            })
        );
    }

    #[test]
    fn skips_hits_without_location() {
        let collection = feature_collection(vec![
            hit(&json!({ "name": "A", "_geoloc": { "lat": 1.0, "lng": 2.0 } })),
            hit(&json!({ "name": "B" })),
            hit(&json!({ "name": "C", "_geoloc": { "lat": "x", "lng": 2.0 } })),
        ]);

        assert_eq!(collection.features.len(), 1);
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["type"], json!("FeatureCollection"));
        assert_eq!(value["features"][0]["properties"]["name"], json!("A"));
    }

    #[tokio::test]
    async fn build_map_queries_index() {
        let index = FakeIndex {
            hits: vec![
                hit(&json!({ "name": "A", "_geoloc": { "lat": 1.0, "lng": 2.0 } })),
                hit(&json!({ "name": "B" })),
            ],
            ..FakeIndex::default()
        };

        let collection = build_map(&index).await.unwrap();
        assert_eq!(collection.features.len(), 1);
    }

    #[tokio::test]
    async fn build_map_surfaces_search_errors() {
        let index = FakeIndex {
            fail_search: true,
            ..FakeIndex::default()
        };
        assert!(matches!(
            build_map(&index).await.unwrap_err(),
            SyncError::Search(_)
        ));
    }
}
