// crates/shorewatch-siem/src/client.rs
// ============================================================================
// Module: Search Backend Client
// Description: Elasticsearch-compatible HTTP client behind a trait seam.
// Purpose: Execute search, count, and health calls with strict limits.
// Dependencies: async-trait, reqwest, serde, serde_json, shorewatch-config
// ============================================================================

//! ## Overview
//! [`SearchBackend`] is the seam between the query layer and the backing
//! cluster; [`HttpSearchBackend`] implements it over HTTP with bounded
//! response handling and major-version bridging for the total-hits shape
//! (7.x clusters may return an integer where 8.x returns an object).
//! Transport failures surface as `ExternalService` errors; the executor
//! routes them through the cluster's circuit breaker.
//! Security posture: cluster responses are untrusted; parsing is lenient
//! and size-bounded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shorewatch_config::CompatibilityMode;
use shorewatch_config::ElasticConfig;
use shorewatch_core::AnalyticError;

// ============================================================================
// SECTION: Request / Response Shapes
// ============================================================================

/// One search request against the configured index patterns.
///
/// # Invariants
/// - `body` is a complete search body; the backend adds nothing but the
///   index path.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Index patterns to query.
    pub index_patterns: Vec<String>,
    /// Search request body.
    pub body: Value,
}

/// One hit returned by the cluster.
///
/// # Invariants
/// - `sort` mirrors the cluster's `sort` array when sorting was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document identifier.
    pub id: String,
    /// Document source payload.
    pub source: Value,
    /// Sort values for cursor construction.
    pub sort: Vec<Value>,
}

/// Parsed search response.
///
/// # Invariants
/// - `total` reflects the bridged total-hits count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResponse {
    /// Total matching documents.
    pub total: u64,
    /// Returned hits in request order.
    pub hits: Vec<SearchHit>,
    /// Aggregation results, when requested.
    pub aggregations: Option<Value>,
    /// Cluster-reported query time in milliseconds.
    pub took_ms: u64,
    /// Shards scanned for the response.
    pub shards_scanned: u32,
}

// ============================================================================
// SECTION: Backend Trait
// ============================================================================

/// Seam between the query layer and the backing cluster.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Executes a search request.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `ExternalService` on transport
    /// or cluster failures.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, AnalyticError>;

    /// Executes a count request for the same body's query clause.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `ExternalService` on transport
    /// or cluster failures.
    async fn count(&self, request: &SearchRequest) -> Result<u64, AnalyticError>;

    /// Verifies the cluster is reachable and healthy.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `ExternalService` when the
    /// cluster is unreachable or reports red health.
    async fn ping(&self) -> Result<(), AnalyticError>;
}

// ============================================================================
// SECTION: HTTP Backend
// ============================================================================

/// Service label used in errors and breaker wiring.
pub const ELASTICSEARCH_SERVICE: &str = "elasticsearch";

/// HTTP implementation of [`SearchBackend`].
///
/// # Invariants
/// - Requests carry the configured basic-auth credentials when present.
/// - The client enforces the configured request timeout.
pub struct HttpSearchBackend {
    /// Cluster base URL without a trailing slash.
    base_url: String,
    /// Optional basic-auth credentials.
    auth: Option<(String, String)>,
    /// Total-hits compatibility bridging.
    compatibility_mode: CompatibilityMode,
    /// Underlying HTTP client.
    client: reqwest::Client,
}

impl HttpSearchBackend {
    /// Builds an HTTP backend from the SIEM configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `InvalidRequest` when the HTTP
    /// client cannot be constructed.
    pub fn new(config: &ElasticConfig, request_timeout: Duration) -> Result<Self, AnalyticError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| {
                AnalyticError::new(
                    shorewatch_core::ErrorKind::InvalidRequest,
                    format!("failed to build http client: {err}"),
                )
            })?;
        let auth = config
            .username
            .clone()
            .map(|username| (username, config.password.clone().unwrap_or_default()));
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            auth,
            compatibility_mode: config.compatibility_mode,
            client,
        })
    }

    /// Issues one POST request with the configured credentials.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, AnalyticError> {
        let url = format!("{}/{path}", self.base_url);
        let mut request = self.client.post(&url).json(body);
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }
        let response = request.send().await.map_err(|err| {
            AnalyticError::external(ELASTICSEARCH_SERVICE, format!("request failed: {err}"))
        })?;
        let status = response.status();
        let payload: Value = response.json().await.map_err(|err| {
            AnalyticError::external(ELASTICSEARCH_SERVICE, format!("malformed response: {err}"))
        })?;
        if !status.is_success() {
            let reason = payload
                .pointer("/error/reason")
                .and_then(Value::as_str)
                .unwrap_or("cluster error");
            return Err(AnalyticError::external(
                ELASTICSEARCH_SERVICE,
                format!("search failed ({status}): {reason}"),
            ));
        }
        Ok(payload)
    }

    /// Joins index patterns into a request path segment.
    fn index_path(patterns: &[String]) -> String {
        patterns.join(",")
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, AnalyticError> {
        let path = format!("{}/_search", Self::index_path(&request.index_patterns));
        let payload = self.post_json(&path, &request.body).await?;
        parse_search_response(&payload, self.compatibility_mode)
    }

    async fn count(&self, request: &SearchRequest) -> Result<u64, AnalyticError> {
        let path = format!("{}/_count", Self::index_path(&request.index_patterns));
        let body = request.body.get("query").map_or_else(
            || serde_json::json!({}),
            |query| serde_json::json!({ "query": query }),
        );
        let payload = self.post_json(&path, &body).await?;
        payload.get("count").and_then(Value::as_u64).ok_or_else(|| {
            AnalyticError::external(ELASTICSEARCH_SERVICE, "count response missing count")
        })
    }

    async fn ping(&self) -> Result<(), AnalyticError> {
        let url = format!("{}/_cluster/health", self.base_url);
        let mut request = self.client.get(&url);
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }
        let response = request.send().await.map_err(|err| {
            AnalyticError::external(ELASTICSEARCH_SERVICE, format!("health check failed: {err}"))
        })?;
        let payload: Value = response.json().await.map_err(|err| {
            AnalyticError::external(ELASTICSEARCH_SERVICE, format!("malformed health body: {err}"))
        })?;
        match payload.get("status").and_then(Value::as_str) {
            Some("green" | "yellow") => Ok(()),
            Some(status) => Err(AnalyticError::external(
                ELASTICSEARCH_SERVICE,
                format!("cluster status {status}"),
            )),
            None => {
                Err(AnalyticError::external(ELASTICSEARCH_SERVICE, "health body missing status"))
            }
        }
    }
}

// ============================================================================
// SECTION: Response Parsing
// ============================================================================

/// Parses a raw search payload into a [`SearchResponse`].
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `ExternalService` when the payload
/// lacks the hits envelope.
pub fn parse_search_response(
    payload: &Value,
    mode: CompatibilityMode,
) -> Result<SearchResponse, AnalyticError> {
    let hits_envelope = payload.get("hits").ok_or_else(|| {
        AnalyticError::external(ELASTICSEARCH_SERVICE, "response missing hits envelope")
    })?;
    let total = bridge_total(hits_envelope.get("total"), mode)?;
    let hits = hits_envelope
        .get("hits")
        .and_then(Value::as_array)
        .map(|raw_hits| {
            raw_hits
                .iter()
                .filter_map(|hit| {
                    let id = hit.get("_id")?.as_str()?.to_string();
                    let source = hit.get("_source").cloned().unwrap_or(Value::Null);
                    let sort = hit
                        .get("sort")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    Some(SearchHit {
                        id,
                        source,
                        sort,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    let shards_scanned = payload
        .pointer("/_shards/total")
        .and_then(Value::as_u64)
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0);
    Ok(SearchResponse {
        total,
        hits,
        aggregations: payload.get("aggregations").cloned(),
        took_ms: payload.get("took").and_then(Value::as_u64).unwrap_or(0),
        shards_scanned,
    })
}

/// Bridges the total-hits shape across cluster major versions.
fn bridge_total(total: Option<&Value>, mode: CompatibilityMode) -> Result<u64, AnalyticError> {
    let Some(total) = total else {
        return Ok(0);
    };
    match mode {
        CompatibilityMode::Es7 => total.as_u64().ok_or_else(|| {
            AnalyticError::external(ELASTICSEARCH_SERVICE, "expected integer total (es7 mode)")
        }),
        CompatibilityMode::Es8 => total.pointer("/value").and_then(Value::as_u64).ok_or_else(|| {
            AnalyticError::external(ELASTICSEARCH_SERVICE, "expected object total (es8 mode)")
        }),
        CompatibilityMode::Auto => total
            .as_u64()
            .or_else(|| total.pointer("/value").and_then(Value::as_u64))
            .ok_or_else(|| {
                AnalyticError::external(ELASTICSEARCH_SERVICE, "unrecognized total-hits shape")
            }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
