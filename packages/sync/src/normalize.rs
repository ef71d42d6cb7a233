//! Field-name normalization and search record construction.
//!
//! Airtable field names are human labels (`"Retailer ID"`, `"UPC"`). The
//! search index stores them camel-cased (`retailerId`, `upc`), and every
//! record gets a deterministic `objectID` built from its key fields so that
//! re-running the sync overwrites entries instead of duplicating them.

use retail_sync_models::{GeoPoint, NormalizedRecord, SourceRecord};
use serde_json::{Map, Value};

use crate::job_registry::IndexRules;

/// Key under which the source record ID is stored.
pub const SOURCE_ID_KEY: &str = "airTableId";

/// Errors building a [`NormalizedRecord`].
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// A key field is absent or has no usable value.
    #[error("Record {record_id} has no usable value for key field '{field}'")]
    MissingKey {
        /// Airtable record ID.
        record_id: String,
        /// Normalized name of the key field.
        field: String,
    },
}

/// Converts a field label to camelCase.
///
/// ```
/// use retail_sync::normalize::camel_case;
///
/// assert_eq!(camel_case("Retailer ID"), "retailerId");
/// assert_eq!(camel_case("UPC"), "upc");
/// assert_eq!(camel_case("coast_inventory_feed"), "coastInventoryFeed");
/// ```
#[must_use]
pub fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());

    for (i, word) in split_words(key).iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }

    out
}

fn split_words(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().filter(|c| !matches!(c, '\'' | '\u{2019}')).collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
            let next = chars.get(i + 1).copied();
            let boundary = c.is_uppercase()
                && ((prev.is_lowercase() || prev.is_numeric())
                    || (prev.is_uppercase() && next.is_some_and(char::is_lowercase)));
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Renames every key of `fields` with [`camel_case`].
///
/// Keys that collide after renaming are not reported; the one visited last
/// wins.
#[must_use]
pub fn normalize_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| (camel_case(&key), value))
        .collect()
}

/// Renders a key field value as text, or `None` if it cannot be part of an
/// `objectID`.
///
/// Strings are used verbatim. Lookup arrays render every element joined
/// with `,` so rows linked to different record sets get different keys.
#[must_use]
pub fn key_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => joined_text(items),
        Value::Null | Value::Bool(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Joins lookup array elements with `,`.
///
/// Nulls render as empty text and nested arrays are flattened the same way.
#[must_use]
pub fn joined_text(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Array(nested) => joined_text(nested),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// First element of an Airtable lookup array, as a coordinate.
#[must_use]
pub fn first_coordinate(value: &Value) -> Option<f64> {
    match value.as_array()?.first()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Builds the search index record for `record`.
///
/// # Errors
///
/// Returns [`NormalizeError::MissingKey`] if any of `rules.key_fields` has
/// no usable value.
pub fn normalize_record(
    record: SourceRecord,
    rules: &IndexRules,
) -> Result<NormalizedRecord, NormalizeError> {
    let SourceRecord { id, fields, .. } = record;
    let mut fields = normalize_fields(fields);
    fields.remove(SOURCE_ID_KEY);

    let mut parts = Vec::with_capacity(rules.key_fields.len());
    for field in &rules.key_fields {
        let part = fields
            .get(field)
            .and_then(key_text)
            .ok_or_else(|| NormalizeError::MissingKey {
                record_id: id.clone(),
                field: field.clone(),
            })?;
        parts.push(part);
    }

    let lat = fields.get(&rules.lat_field).and_then(first_coordinate);
    let lng = fields.get(&rules.lng_field).and_then(first_coordinate);
    let geoloc = lat.zip(lng).map(|(lat, lng)| GeoPoint::new(lat, lng));

    Ok(NormalizedRecord {
        object_id: parts.join(&rules.key_separator),
        air_table_id: id,
        geoloc,
        fields,
    })
}
