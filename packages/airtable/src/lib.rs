#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Airtable REST client.
//!
//! Reads a table one page at a time and patches individual records:
//!
//! - List: `GET /v0/{baseId}/{table}?view=&pageSize=&offset=`
//! - Update: `PATCH /v0/{baseId}/{table}/{recordId}`
//!
//! Airtable paginates with an opaque `offset` cursor. Every page except the
//! last one carries the cursor for the next request; the caller decides when
//! (and whether) to ask for it. See [`RecordSource`].
//!
//! See <https://airtable.com/developers/web/api/list-records>

use async_trait::async_trait;
use reqwest::Url;
use retail_sync_models::SourceRecord;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Default Airtable API host.
pub const DEFAULT_API_URL: &str = "https://api.airtable.com";

/// Largest `pageSize` the list endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Errors from Airtable API calls.
#[derive(Debug, Error)]
pub enum AirtableError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Airtable answered with a non-success status.
    #[error("Airtable returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// Response or URL could not be interpreted.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Selection options for listing a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Name of the table view to read through. `None` reads the raw table.
    pub view: Option<String>,
    /// Records per page. Clamped to `1..=`[`MAX_PAGE_SIZE`].
    pub page_size: u32,
}

impl ListQuery {
    /// Creates a query for the given view with the maximum page size.
    #[must_use]
    pub fn view(view: impl Into<String>) -> Self {
        Self {
            view: Some(view.into()),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Page size actually sent to Airtable.
    #[must_use]
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of a table listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordPage {
    /// Records on this page.
    #[serde(default)]
    pub records: Vec<SourceRecord>,
    /// Cursor for the next page. `None` on the last page.
    #[serde(default)]
    pub offset: Option<String>,
}

/// A table-backed record store.
///
/// Implemented by [`AirtableClient`] for production use; the sync jobs only
/// depend on this trait so they can run against an in-memory table in tests.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches one page of `table`, continuing from `offset` when given.
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError`] if the request fails or the response cannot
    /// be decoded.
    async fn list_page(
        &self,
        table: &str,
        query: &ListQuery,
        offset: Option<&str>,
    ) -> Result<RecordPage, AirtableError>;

    /// Overwrites the given fields on one record, leaving the others as
    /// they are. Returns the record as stored after the update.
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError`] if the request fails or the response cannot
    /// be decoded.
    async fn update_fields(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<SourceRecord, AirtableError>;
}

/// Airtable API client bound to a single base.
#[derive(Clone)]
pub struct AirtableClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    base_id: String,
}

impl std::fmt::Debug for AirtableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableClient")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("base_id", &self.base_id)
            .finish_non_exhaustive()
    }
}

impl AirtableClient {
    /// Creates a client for `base_id` authenticated with `api_key`.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: &str, base_id: &str) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.to_string(),
            base_id: base_id.to_string(),
        }
    }

    /// Points the client at a different API host.
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Builds `{api_url}/v0/{base}/{table}[/{record_id}]` with each segment
    /// percent-encoded (table names routinely contain spaces).
    fn table_url(&self, table: &str, record_id: Option<&str>) -> Result<Url, AirtableError> {
        let mut url = Url::parse(&self.api_url).map_err(|e| AirtableError::Parse {
            message: format!("Invalid Airtable API URL '{}': {e}", self.api_url),
        })?;

        {
            let mut segments = url.path_segments_mut().map_err(|()| AirtableError::Parse {
                message: format!("Airtable API URL '{}' cannot be a base", self.api_url),
            })?;
            segments.pop_if_empty().extend(["v0", self.base_id.as_str(), table]);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl RecordSource for AirtableClient {
    async fn list_page(
        &self,
        table: &str,
        query: &ListQuery,
        offset: Option<&str>,
    ) -> Result<RecordPage, AirtableError> {
        let url = self.table_url(table, None)?;

        let mut params: Vec<(&str, String)> =
            vec![("pageSize", query.effective_page_size().to_string())];
        if let Some(view) = &query.view {
            params.push(("view", view.clone()));
        }
        if let Some(offset) = offset {
            params.push(("offset", offset.to_string()));
        }

        log::debug!("Listing Airtable table '{table}' (offset={offset:?})");

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .query(&params)
            .send()
            .await?;

        decode(resp).await
    }

    async fn update_fields(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<SourceRecord, AirtableError> {
        let url = self.table_url(table, Some(record_id))?;

        let resp = self
            .client
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "fields": fields }))
            .send()
            .await?;

        decode(resp).await
    }
}

/// Checks the status and decodes a JSON body.
async fn decode<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, AirtableError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(AirtableError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| AirtableError::Parse {
        message: format!("Failed to decode Airtable response: {e}"),
    })
}
