//! Cursor-based paging over a search engine
//!
//! This module provides the `CursorClient` abstraction used by the export job
//! and its Elasticsearch scroll API implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::{Result, SearchError};

use super::state::Cursor;

/// Shard counts reported alongside a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ShardStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub failed: u64,
}

/// One page of raw records returned by an advance call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub shards: ShardStats,
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parameters of the initial paginated query.
#[derive(Debug, Clone, Copy)]
pub struct OpenRequest<'a> {
    pub endpoint: &'a str,
    pub collection: &'a str,
    pub ttl: &'a str,
    pub size: u32,
    pub options: &'a Map<String, Value>,
}

/// Parameters of a page-advance call.
#[derive(Debug, Clone, Copy)]
pub struct AdvanceRequest<'a> {
    pub endpoint: &'a str,
    pub cursor: &'a Cursor,
    pub ttl: &'a str,
    pub options: &'a Map<String, Value>,
}

/// Opens and advances server-side pagination cursors.
#[async_trait]
pub trait CursorClient: Send + Sync {
    /// Issue the initial query and return its cursor.
    ///
    /// Fails with `SearchError::MissingCursor` when the response carries no token.
    async fn open(&self, request: OpenRequest<'_>) -> Result<Cursor>;

    /// Exchange a cursor for the next page.
    async fn advance(&self, request: AdvanceRequest<'_>) -> Result<Page>;

    /// Release a cursor the job will not advance again.
    async fn release(&self, endpoint: &str, cursor: &Cursor) -> Result<()>;
}

/// Elasticsearch scroll API client
pub struct ElasticsearchClient {
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    #[serde(rename = "_shards", default)]
    shards: ShardStats,
    #[serde(default)]
    hits: Hits,
}

#[derive(Debug, Default, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Value>,
}

impl ElasticsearchClient {
    /// Create a client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SearchError::Protocol(format!("HTTP {status}: {}", truncate(&body, 512))).into())
    }

    async fn send_scroll(&self, request: RequestBuilder) -> Result<ScrollResponse> {
        let response = self.send(request).await?;
        response
            .json::<ScrollResponse>()
            .await
            .map_err(|e| SearchError::Protocol(format!("Failed to decode response: {e}")).into())
    }
}

#[async_trait]
impl CursorClient for ElasticsearchClient {
    async fn open(&self, request: OpenRequest<'_>) -> Result<Cursor> {
        let base = normalize_endpoint(request.endpoint);
        let url = format!("{base}/{}/_search", request.collection);

        let (body, mut params) = split_options(request.options);
        params.push(("scroll".to_string(), request.ttl.to_string()));
        params.push(("size".to_string(), request.size.to_string()));

        debug!("Opening scroll on {} (ttl {}, size {})", url, request.ttl, request.size);

        let response = self
            .send_scroll(self.http.post(&url).query(&params).json(&search_body(body)))
            .await?;

        response
            .scroll_id
            .and_then(Cursor::new)
            .ok_or_else(|| {
                SearchError::MissingCursor {
                    endpoint: request.endpoint.to_string(),
                    collection: request.collection.to_string(),
                }
                .into()
            })
    }

    async fn advance(&self, request: AdvanceRequest<'_>) -> Result<Page> {
        let url = format!("{}/_search/scroll", normalize_endpoint(request.endpoint));
        let (_, params) = split_options(request.options);

        let response = self
            .send_scroll(self.http.post(&url).query(&params).json(&json!({
                "scroll": request.ttl,
                "scroll_id": request.cursor.as_str(),
            })))
            .await?;

        debug!(
            "Scroll returned {} hits ({}/{} shards failed)",
            response.hits.hits.len(),
            response.shards.failed,
            response.shards.total
        );

        Ok(Page {
            records: response.hits.hits,
            shards: response.shards,
            next_cursor: response.scroll_id.and_then(Cursor::new),
        })
    }

    async fn release(&self, endpoint: &str, cursor: &Cursor) -> Result<()> {
        let url = format!("{}/_search/scroll", normalize_endpoint(endpoint));
        let response = self
            .send(
                self.http
                    .delete(&url)
                    .json(&json!({ "scroll_id": [cursor.as_str()] })),
            )
            .await;

        match response {
            Ok(_) => Ok(()),
            // Already expired or consumed.
            Err(crate::error::DumpError::Search(SearchError::Protocol(msg)))
                if msg.starts_with("HTTP 404") =>
            {
                warn!("Scroll already released: {}", msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Add a scheme when missing and trim the trailing slash.
pub(crate) fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

/// Split options into the request body (`body` key) and query parameters.
fn split_options(options: &Map<String, Value>) -> (Option<&Value>, Vec<(String, String)>) {
    let mut body = None;
    let mut params = Vec::new();

    for (key, value) in options {
        if key == "body" {
            body = Some(value);
            continue;
        }
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        };
        params.push((key.clone(), value));
    }

    (body, params)
}

/// Build the search body, sorting by `_doc` unless a sort is given.
fn search_body(body: Option<&Value>) -> Value {
    let mut body = match body {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    body.entry("sort").or_insert_with(|| json!(["_doc"]));
    Value::Object(body)
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
