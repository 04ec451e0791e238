use std::time::Duration;

use async_trait::async_trait;
use observability_deps::tracing::{debug, warn};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::error::{BulkItemFailure, StoreError};

/// One page of search/scroll hits: `(document id, source document)` pairs,
/// plus a scroll cursor if the store handed one back.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub hits: Vec<(String, Value)>,
    pub scroll_cursor: Option<String>,
}

/// Per-item outcome of a bulk upsert (spec §4.1: bulk never raises on
/// per-item failure).
#[derive(Debug, Clone, Default)]
pub struct BulkResult {
    pub failures: Vec<BulkItemFailure>,
}

impl BulkResult {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Typed wrapper over the store's mget/search/scroll/bulk/update HTTP API
/// (spec C1). Mirrors the teacher's catalog-client shape: a small async
/// trait over a `reqwest::Client`, so RAG/indexer/ingest code can be tested
/// against a mock implementation instead of a live store.
#[async_trait]
pub trait StoreClient: std::fmt::Debug + Send + Sync {
    async fn ensure_index(&self, index: &str, mapping: Value) -> Result<(), StoreError>;

    /// Returns the subset of `ids` *not* already present in `index`.
    async fn mget_missing(&self, index: &str, ids: &[String]) -> Result<Vec<String>, StoreError>;

    async fn search(
        &self,
        index: &str,
        query: Value,
        size: usize,
        sort: Option<Value>,
    ) -> Result<SearchPage, StoreError>;

    async fn scroll(&self, cursor: &str, keep_alive: Duration) -> Result<SearchPage, StoreError>;

    async fn clear_scroll(&self, cursor: &str) -> Result<(), StoreError>;

    async fn bulk_upsert(
        &self,
        index: &str,
        items: Vec<(String, Value)>,
    ) -> Result<BulkResult, StoreError>;

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn update(&self, index: &str, id: &str, partial_doc: Value) -> Result<(), StoreError>;

    async fn delete_by_query(&self, index: &str, query: Value) -> Result<(), StoreError>;
}

/// Connection parameters for [`HttpStoreClient`].
#[derive(Debug, Clone)]
pub struct StoreClientConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

/// The store-client implementation used outside of tests: a thin
/// `reqwest`-backed client against an OpenSearch/Elasticsearch-shaped HTTP
/// API.
#[derive(Debug, Clone)]
pub struct HttpStoreClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpStoreClient {
    pub fn new(config: StoreClientConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(StoreError::from)?;
        Ok(Self {
            http,
            base_url: config.base_url,
            username: config.username,
            password: config.password,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .basic_auth(&self.username, Some(&self.password))
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn ensure_index(&self, index: &str, mapping: Value) -> Result<(), StoreError> {
        let exists = self
            .request(reqwest::Method::HEAD, index)
            .send()
            .await?
            .status()
            == StatusCode::OK;
        if exists {
            debug!(index, "index already exists");
            return Ok(());
        }

        let response = self
            .request(reqwest::Method::PUT, index)
            .json(&mapping)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Permanent(format!(
                "failed to create index {index}: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn mget_missing(&self, index: &str, ids: &[String]) -> Result<Vec<String>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "ids": ids });
        let response = self
            .request(reqwest::Method::POST, &format!("{index}/_mget"))
            .json(&body)
            .send()
            .await?;
        let response: Value = response.json().await?;

        let docs = response["docs"].as_array().cloned().unwrap_or_default();
        let mut missing = Vec::new();
        for (id, doc) in ids.iter().zip(docs.iter()) {
            let found = doc["found"].as_bool().unwrap_or(false);
            if !found {
                missing.push(id.clone());
            }
        }
        Ok(missing)
    }

    async fn search(
        &self,
        index: &str,
        query: Value,
        size: usize,
        sort: Option<Value>,
    ) -> Result<SearchPage, StoreError> {
        let mut body = json!({ "query": query, "size": size });
        if let Some(sort) = sort {
            body["sort"] = sort;
        }

        let response = self
            .request(reqwest::Method::POST, &format!("{index}/_search?scroll=10m"))
            .json(&body)
            .send()
            .await?;
        let response: Value = response.json().await?;
        parse_search_response(response)
    }

    async fn scroll(&self, cursor: &str, keep_alive: Duration) -> Result<SearchPage, StoreError> {
        let body = json!({
            "scroll": format!("{}m", keep_alive.as_secs() / 60),
            "scroll_id": cursor,
        });
        let response = self
            .request(reqwest::Method::POST, "_search/scroll")
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::ScrollExpired(cursor.to_string()));
        }

        let response: Value = response.json().await?;
        parse_search_response(response)
    }

    async fn clear_scroll(&self, cursor: &str) -> Result<(), StoreError> {
        let body = json!({ "scroll_id": [cursor] });
        self.request(reqwest::Method::DELETE, "_search/scroll")
            .json(&body)
            .send()
            .await?;
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        items: Vec<(String, Value)>,
    ) -> Result<BulkResult, StoreError> {
        if items.is_empty() {
            return Ok(BulkResult::default());
        }

        let mut body = String::new();
        for (id, doc) in &items {
            let action = json!({ "update": { "_index": index, "_id": id } });
            body.push_str(&action.to_string());
            body.push('\n');
            let update = json!({ "doc": doc, "doc_as_upsert": true });
            body.push_str(&update.to_string());
            body.push('\n');
        }

        let response = self
            .request(reqwest::Method::POST, "_bulk")
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        let response: Value = response.json().await?;

        let mut failures = Vec::new();
        if let Some(bulk_items) = response["items"].as_array() {
            for (item, (id, _)) in bulk_items.iter().zip(items.iter()) {
                if let Some(update) = item.get("update") {
                    let status = update["status"].as_u64().unwrap_or(200);
                    if !(200..300).contains(&status) {
                        let reason = update["error"]["reason"]
                            .as_str()
                            .unwrap_or("unknown bulk failure")
                            .to_string();
                        warn!(index, id, reason, "bulk item failed");
                        failures.push(BulkItemFailure {
                            id: id.clone(),
                            reason,
                        });
                    }
                }
            }
        }

        Ok(BulkResult { failures })
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, &format!("{index}/_doc/{id}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response: Value = response.json().await?;
        Ok(response.get("_source").cloned())
    }

    async fn update(&self, index: &str, id: &str, partial_doc: Value) -> Result<(), StoreError> {
        let body = json!({ "doc": partial_doc });
        let response = self
            .request(reqwest::Method::POST, &format!("{index}/_update/{id}"))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Permanent(format!(
                "update of {index}/{id} failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_by_query(&self, index: &str, query: Value) -> Result<(), StoreError> {
        let body = json!({ "query": query });
        self.request(reqwest::Method::POST, &format!("{index}/_delete_by_query"))
            .json(&body)
            .send()
            .await?;
        Ok(())
    }
}

fn parse_search_response(response: Value) -> Result<SearchPage, StoreError> {
    let hits = response["hits"]["hits"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|hit| {
            let id = hit["_id"].as_str()?.to_string();
            let source = hit["_source"].clone();
            Some((id, source))
        })
        .collect();

    let scroll_cursor = response["_scroll_id"].as_str().map(str::to_string);
    Ok(SearchPage { hits, scroll_cursor })
}
