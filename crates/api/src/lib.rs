//! Formant remote data client.
//!
//! This crate defines the trait the form engine depends on for remote data,
//! plus the two implementations: `RestApi` (reqwest, in-process against a
//! REST backend) and `MockApi` (in-memory, for tests and the demo app).

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use formant_core::{RecordId, RemoteRecord};
use serde_json::Value;
use tracing::{debug, info};

/// API errors suitable for surfacing in the UI status line.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Parameters for a paged list request: free-text search, window, and any
/// caller-supplied filters merged in as extra query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub offset: usize,
    pub limit: usize,
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    /// Flatten into `(key, value)` query pairs; filters never shadow the
    /// reserved search/offset/limit keys.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("search".to_string(), self.search.clone()),
            ("offset".to_string(), self.offset.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        for (k, v) in &self.filters {
            if k != "search" && k != "offset" && k != "limit" {
                params.push((k.clone(), v.clone()));
            }
        }
        params
    }
}

/// Decode a list response body. Backends answer either a paginated envelope
/// `{"results": [...]}` or a bare array; records without a `pk`/`id` are
/// dropped rather than failing the page.
pub fn decode_records(body: Value) -> ApiResult<Vec<RemoteRecord>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => return Err(ApiError::Decode("expected results array".into())),
        },
        other => {
            return Err(ApiError::Decode(format!(
                "expected list body, got {}",
                match other {
                    Value::Null => "null",
                    Value::Bool(_) => "bool",
                    Value::Number(_) => "number",
                    Value::String(_) => "string",
                    _ => "other",
                }
            )))
        }
    };
    Ok(items
        .into_iter()
        .filter_map(RemoteRecord::from_payload)
        .collect())
}

/// Declarative data access surface consumed by the form engine.
#[async_trait::async_trait]
pub trait DataApi: Send + Sync {
    /// Paged list query against a resource endpoint.
    async fn list(&self, endpoint: &str, query: &ListQuery) -> ApiResult<Vec<RemoteRecord>>;

    /// Fetch a single record by identifier (`<endpoint><id>/`).
    async fn retrieve(&self, endpoint: &str, id: &RecordId) -> ApiResult<RemoteRecord>;
}

// ----------------- REST implementation -----------------

/// Reqwest-backed client. Endpoints are joined onto a base URL, so field
/// definitions can carry server-relative locators like `part/category/`.
pub struct RestApi {
    base: String,
    client: reqwest::Client,
}

impl RestApi {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self {
            base,
            client: reqwest::Client::new(),
        }
    }

    fn join(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl DataApi for RestApi {
    async fn list(&self, endpoint: &str, query: &ListQuery) -> ApiResult<Vec<RemoteRecord>> {
        let url = self.join(endpoint);
        debug!(url = %url, search = %query.search, offset = query.offset, "api: list start");
        let resp = self
            .client
            .get(&url)
            .query(&query.to_params())
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let records = decode_records(body)?;
        info!(url = %url, count = records.len(), "api: list ok");
        Ok(records)
    }

    async fn retrieve(&self, endpoint: &str, id: &RecordId) -> ApiResult<RemoteRecord> {
        let url = format!("{}{}/", self.join(endpoint), id);
        debug!(url = %url, "api: retrieve start");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        RemoteRecord::from_payload(body)
            .ok_or_else(|| ApiError::Decode("record missing pk/id".into()))
    }
}

// ----------------- Mock implementation -----------------

/// In-memory implementation for tests and the demo app. Search matches a
/// lowercase substring against any string value in the payload; filters
/// match payload fields by stringified equality.
#[derive(Default)]
pub struct MockApi {
    endpoints: BTreeMap<String, Vec<RemoteRecord>>,
    pub fail_list: bool,
    pub fail_retrieve: bool,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, endpoint: &str, payloads: Vec<Value>) -> Self {
        self.seed(endpoint, payloads);
        self
    }

    pub fn seed(&mut self, endpoint: &str, payloads: Vec<Value>) {
        let records = payloads
            .into_iter()
            .filter_map(RemoteRecord::from_payload)
            .collect();
        self.endpoints.insert(endpoint.to_string(), records);
    }

    fn matches_search(record: &RemoteRecord, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        match &record.payload {
            Value::Object(map) => map.values().any(|v| {
                v.as_str()
                    .map(|s| s.to_lowercase().contains(needle))
                    .unwrap_or(false)
            }),
            _ => false,
        }
    }

    fn matches_filters(record: &RemoteRecord, filters: &BTreeMap<String, String>) -> bool {
        filters.iter().all(|(k, want)| {
            record
                .payload
                .get(k)
                .map(|v| match v {
                    Value::String(s) => s == want,
                    other => other.to_string() == *want,
                })
                .unwrap_or(false)
        })
    }
}

#[async_trait::async_trait]
impl DataApi for MockApi {
    async fn list(&self, endpoint: &str, query: &ListQuery) -> ApiResult<Vec<RemoteRecord>> {
        if self.fail_list {
            return Err(ApiError::Internal("list disabled".into()));
        }
        let all = self
            .endpoints
            .get(endpoint)
            .ok_or_else(|| ApiError::NotFound(endpoint.to_string()))?;
        let needle = query.search.to_lowercase();
        Ok(all
            .iter()
            .filter(|r| Self::matches_search(r, &needle))
            .filter(|r| Self::matches_filters(r, &query.filters))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn retrieve(&self, endpoint: &str, id: &RecordId) -> ApiResult<RemoteRecord> {
        if self.fail_retrieve {
            return Err(ApiError::Internal("retrieve disabled".into()));
        }
        self.endpoints
            .get(endpoint)
            .and_then(|all| all.iter().find(|r| &r.id == id))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("{}{}/", endpoint, id)))
    }
}
