#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Algolia REST client.
//!
//! Covers the two index operations the sync jobs need:
//!
//! - Batch upsert: `POST https://{appId}.algolia.net/1/indexes/{index}/batch`
//!   with one `updateObject` action per record (replace-or-create keyed by
//!   `objectID`).
//! - Query: `POST https://{appId}-dsn.algolia.net/1/indexes/{index}/query`
//!
//! Writes go to the primary host and reads to the DSN replica, matching the
//! official clients.
//!
//! See <https://www.algolia.com/doc/rest-api/search/>

use async_trait::async_trait;
use reqwest::Url;
use retail_sync_models::NormalizedRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Most records a single `batch` call should carry.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Most hits a single query page can return.
pub const MAX_HITS_PER_PAGE: u32 = 1000;

/// Errors from Algolia API calls.
#[derive(Debug, Error)]
pub enum AlgoliaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Algolia answered with a non-success status.
    #[error("Algolia returned status {status}: {body}")]
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

/// Result of a batch upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SaveObjectsResponse {
    /// Indexing task handle.
    #[serde(rename = "taskID", default)]
    pub task_id: u64,
    /// IDs of the objects accepted for indexing, in request order.
    #[serde(rename = "objectIDs", default)]
    pub object_ids: Vec<String>,
}

/// Parameters for an index query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Full-text query. Empty matches everything.
    pub query: String,
    /// Hits per page, at most [`MAX_HITS_PER_PAGE`].
    pub hits_per_page: u32,
}

impl SearchQuery {
    /// Query matching every record, returning up to `hits_per_page` hits.
    #[must_use]
    pub fn all(hits_per_page: u32) -> Self {
        Self {
            query: String::new(),
            hits_per_page: hits_per_page.min(MAX_HITS_PER_PAGE),
        }
    }
}

/// Query response. Hits are kept as raw JSON objects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Matching records.
    #[serde(default)]
    pub hits: Vec<Map<String, Value>>,
    /// Total number of matches across all pages.
    #[serde(default)]
    pub nb_hits: Option<u64>,
}

/// A search index the sync jobs can write to and read from.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Name of the underlying index.
    fn name(&self) -> &str;

    /// Creates or replaces `objects`, keyed by their `objectID`.
    ///
    /// # Errors
    ///
    /// Returns [`AlgoliaError`] if the request fails or is rejected.
    async fn save_objects(
        &self,
        objects: &[NormalizedRecord],
    ) -> Result<SaveObjectsResponse, AlgoliaError>;

    /// Runs a query against the index.
    ///
    /// # Errors
    ///
    /// Returns [`AlgoliaError`] if the request fails or is rejected.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, AlgoliaError>;
}

#[derive(Serialize)]
struct BatchBody<'a> {
    requests: Vec<BatchOperation<'a>>,
}

#[derive(Serialize)]
struct BatchOperation<'a> {
    action: &'static str,
    body: &'a NormalizedRecord,
}

/// Client for one Algolia index.
#[derive(Clone)]
pub struct AlgoliaIndex {
    client: reqwest::Client,
    app_id: String,
    api_key: String,
    index_name: String,
    write_host: String,
    read_host: String,
}

impl std::fmt::Debug for AlgoliaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgoliaIndex")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .field("index_name", &self.index_name)
            .field("write_host", &self.write_host)
            .field("read_host", &self.read_host)
            .finish_non_exhaustive()
    }
}

impl AlgoliaIndex {
    /// Creates a client for `index_name` in application `app_id`.
    #[must_use]
    pub fn new(client: reqwest::Client, app_id: &str, api_key: &str, index_name: &str) -> Self {
        Self {
            client,
            app_id: app_id.to_string(),
            api_key: api_key.to_string(),
            index_name: index_name.to_string(),
            write_host: format!("https://{app_id}.algolia.net"),
            read_host: format!("https://{app_id}-dsn.algolia.net"),
        }
    }

    /// Sends both reads and writes to `host` instead of the Algolia cloud.
    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        let host = host.trim_end_matches('/').to_string();
        self.write_host.clone_from(&host);
        self.read_host = host;
        self
    }

    fn index_url(&self, host: &str, operation: &str) -> Result<Url, AlgoliaError> {
        let mut url = Url::parse(host).map_err(|e| AlgoliaError::Parse {
            message: format!("Invalid Algolia host '{host}': {e}"),
        })?;
        url.path_segments_mut()
            .map_err(|()| AlgoliaError::Parse {
                message: format!("Algolia host '{host}' cannot be a base"),
            })?
            .pop_if_empty()
            .extend(["1", "indexes", self.index_name.as_str(), operation]);
        Ok(url)
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
    }
}

#[async_trait]
impl SearchIndex for AlgoliaIndex {
    fn name(&self) -> &str {
        &self.index_name
    }

    async fn save_objects(
        &self,
        objects: &[NormalizedRecord],
    ) -> Result<SaveObjectsResponse, AlgoliaError> {
        if objects.is_empty() {
            return Ok(SaveObjectsResponse::default());
        }

        let body = BatchBody {
            requests: objects
                .iter()
                .map(|body| BatchOperation {
                    action: "updateObject",
                    body,
                })
                .collect(),
        };

        let url = self.index_url(&self.write_host, "batch")?;
        log::debug!(
            "Saving {} objects to Algolia index '{}'",
            objects.len(),
            self.index_name
        );
        let resp = self.post(url).json(&body).send().await?;
        decode(resp).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, AlgoliaError> {
        let url = self.index_url(&self.read_host, "query")?;
        log::debug!(
            "Querying Algolia index '{}' (hitsPerPage={})",
            self.index_name,
            query.hits_per_page
        );
        let resp = self.post(url).json(query).send().await?;
        decode(resp).await
    }
}

/// Checks the status and decodes a JSON body.
async fn decode<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, AlgoliaError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(AlgoliaError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| AlgoliaError::Parse {
        message: format!("Failed to decode Algolia response: {e}"),
    })
}
