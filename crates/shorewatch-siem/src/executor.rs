// crates/shorewatch-siem/src/executor.rs
// ============================================================================
// Module: Query Executor
// Description: Paginated event queries with resilience and metrics.
// Purpose: Execute planned queries and assemble contract-level responses.
// Dependencies: serde_json, shorewatch-config, shorewatch-core
// ============================================================================

//! ## Overview
//! The executor ties the layer together: it validates pagination arguments,
//! builds and fingerprints the search body, plans the optimization ladder
//! against a count, executes through breaker + retry + deadline, and
//! assembles events, pagination metadata, and performance metrics. Request
//! construction failures are `InvalidRequest` and never touch the breaker;
//! only executed backend calls consume credits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use shorewatch_config::ElasticConfig;
use shorewatch_core::AnalyticError;
use shorewatch_core::CircuitBreaker;
use shorewatch_core::CursorError;
use shorewatch_core::ErrorKind;
use shorewatch_core::FallbackStrategy;
use shorewatch_core::FieldMapper;
use shorewatch_core::OptimizationLevel;
use shorewatch_core::PaginationCursor;
use shorewatch_core::PaginationMeta;
use shorewatch_core::QueryFilter;
use shorewatch_core::QueryPerfMetrics;
use shorewatch_core::RetryPolicy;
use shorewatch_core::SecurityEvent;
use shorewatch_core::SortOrder;
use shorewatch_core::TimeRange;
use shorewatch_core::TimeoutClass;
use shorewatch_core::TimeoutEnvelope;
use shorewatch_core::retry_with_policy;
use shorewatch_core::with_deadline;

use crate::client::SearchBackend;
use crate::client::SearchRequest;
use crate::client::SearchResponse;
use crate::optimize::ExecutionMode;
use crate::optimize::QueryPlan;
use crate::optimize::SizeBudget;
use crate::optimize::apply_sampling;
use crate::optimize::plan_query;
use crate::parse::event_from_hit;
use crate::query::Position;
use crate::query::build_aggregation_body;
use crate::query::build_search_body;
use crate::query::classify_complexity;
use crate::query::query_fingerprint;

// ============================================================================
// SECTION: Request / Response
// ============================================================================

/// One event-query request after argument decoding.
///
/// # Invariants
/// - At most one of `page` and `cursor` is set; neither defaults to page 1.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Query window.
    pub time_range: TimeRange,
    /// Typed filters.
    pub filters: Vec<QueryFilter>,
    /// Optional projection of user-visible fields.
    pub fields: Option<Vec<String>>,
    /// 1-based page number for offset pagination.
    pub page: Option<u32>,
    /// Opaque cursor from a prior response.
    pub cursor: Option<String>,
    /// Requested page size.
    pub page_size: u32,
    /// User-visible sort field.
    pub sort_by: String,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Optimization posture.
    pub optimization: OptimizationLevel,
    /// Fallback when the result exceeds the size budget.
    pub fallback: FallbackStrategy,
    /// Per-call size-budget override in megabytes.
    pub max_result_size_mb: Option<u32>,
}

/// One page of query results with contract-level metadata.
///
/// # Invariants
/// - `pagination.total_count >= events.len()`.
#[derive(Debug, Clone)]
pub struct EventsPage {
    /// Normalized events.
    pub events: Vec<SecurityEvent>,
    /// Aggregation results when the aggregation fallback applied.
    pub aggregations: Option<Value>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
    /// Performance metrics.
    pub perf: QueryPerfMetrics,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Event query service owning the backend connection state.
///
/// # Invariants
/// - The breaker guards every executed backend call.
#[derive(Clone)]
pub struct EventQueryService {
    /// Backing search client.
    backend: Arc<dyn SearchBackend>,
    /// Field mapper shared with parsing.
    mapper: FieldMapper,
    /// SIEM configuration.
    config: ElasticConfig,
    /// Breaker guarding the cluster.
    breaker: Arc<CircuitBreaker>,
    /// Retry policy for transient failures.
    retry: RetryPolicy,
    /// Deadline envelope.
    envelope: TimeoutEnvelope,
}

impl EventQueryService {
    /// Creates a query service over a backend.
    #[must_use]
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        mapper: FieldMapper,
        config: ElasticConfig,
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        envelope: TimeoutEnvelope,
    ) -> Self {
        Self {
            backend,
            mapper,
            config,
            breaker,
            retry,
            envelope,
        }
    }

    /// Returns the field mapper shared with this service.
    #[must_use]
    pub const fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// Returns the SIEM configuration.
    #[must_use]
    pub const fn config(&self) -> &ElasticConfig {
        &self.config
    }

    /// Verifies the backing cluster is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] when the cluster is unreachable.
    pub async fn ping(&self) -> Result<(), AnalyticError> {
        self.backend.ping().await
    }

    /// Executes an event query with pagination and the optimization ladder.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] for invalid arguments (`InvalidRequest`),
    /// cursor mismatches (`Validation`), budget violations under the error
    /// fallback (`Validation`), and backend failures (`ExternalService`,
    /// `Timeout`, `CircuitOpen`).
    pub async fn query_events(&self, request: &QueryRequest) -> Result<EventsPage, AnalyticError> {
        let started = Instant::now();
        let prepared = self.prepare(request)?;
        let total = self.execute_count(&prepared.count_request).await?;
        let plan = self.plan(request, total, &prepared.fingerprint)?;
        match plan.mode.clone() {
            ExecutionMode::Events => {
                self.run_events(request, &prepared, total, &plan, started).await
            }
            ExecutionMode::Sampled {
                probability,
                seed,
            } => {
                let mut prepared = prepared;
                prepared.sampling = Some((probability, seed));
                self.run_events(request, &prepared, total, &plan, started).await
            }
            ExecutionMode::Aggregate {
                group_by,
            } => self.run_aggregation_fallback(request, total, &plan, &group_by, started).await,
        }
    }

    /// Executes a bucket/metric aggregation without raw documents.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] for unknown fields or backend failures.
    pub async fn query_aggregation(
        &self,
        time_range: &TimeRange,
        filters: &[QueryFilter],
        group_by: &str,
        bucket_count: u32,
    ) -> Result<(Value, QueryPerfMetrics), AnalyticError> {
        let started = Instant::now();
        time_range.validate_window(self.max_window())?;
        let body =
            build_aggregation_body(&self.mapper, time_range, filters, group_by, bucket_count)?;
        let request = SearchRequest {
            index_patterns: self.config.index_patterns.clone(),
            body,
        };
        let response = self.execute_search(&request).await?;
        let perf = self.perf_metrics(&response, filters, true, Vec::new(), started);
        Ok((response.aggregations.unwrap_or(Value::Null), perf))
    }

    /// Executes a single-path term query and normalizes the hits.
    ///
    /// Used by seed-event retrieval, which must issue one query per
    /// candidate path instead of a composite should-query.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] on backend failures.
    pub async fn events_for_document_path(
        &self,
        path: &str,
        value: &Value,
        time_range: &TimeRange,
        limit: u32,
    ) -> Result<Vec<SecurityEvent>, AnalyticError> {
        let body = crate::query::build_path_term_body(path, value, time_range, limit);
        let request = SearchRequest {
            index_patterns: self.config.index_patterns.clone(),
            body,
        };
        let response = self.execute_search(&request).await?;
        let mut events = Vec::with_capacity(response.hits.len());
        for hit in &response.hits {
            if let Ok(event) = event_from_hit(&self.mapper, hit) {
                events.push(event);
            }
        }
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Preparation
    // ------------------------------------------------------------------

    /// Validates arguments and builds the base request shapes.
    fn prepare(&self, request: &QueryRequest) -> Result<PreparedQuery, AnalyticError> {
        if request.page.is_some() && request.cursor.is_some() {
            return Err(AnalyticError::new(
                ErrorKind::InvalidRequest,
                "provide exactly one of page or cursor",
            ));
        }
        if request.page_size == 0 || request.page_size > self.config.max_page_size {
            return Err(AnalyticError::new(
                ErrorKind::InvalidRequest,
                format!("page_size must be in 1..={}", self.config.max_page_size),
            ));
        }
        request.time_range.validate_window(self.max_window())?;

        let base_body = build_search_body(
            &self.mapper,
            &request.time_range,
            &request.filters,
            request.fields.as_deref(),
            &request.sort_by,
            request.sort_order,
            &Position::From(0),
            request.page_size,
        )?;
        let fingerprint = query_fingerprint(&base_body, &self.config.index_patterns);

        let position = match (&request.cursor, request.page) {
            (Some(token), _) => {
                let cursor = decode_cursor(token)?;
                cursor.verify_fingerprint(&fingerprint).map_err(cursor_error)?;
                Position::After(vec![cursor.last_sort_value.clone(), Value::String(cursor.tiebreak_id)])
            }
            (None, page) => {
                let page = page.unwrap_or(1);
                if page == 0 {
                    return Err(AnalyticError::new(
                        ErrorKind::InvalidRequest,
                        "page numbers are 1-based",
                    ));
                }
                let offset = u64::from(page - 1) * u64::from(request.page_size);
                if offset > self.config.page_offset_threshold {
                    return Err(AnalyticError::new(
                        ErrorKind::InvalidRequest,
                        format!(
                            "page offset {offset} exceeds {}; use cursor pagination",
                            self.config.page_offset_threshold
                        ),
                    ));
                }
                Position::From(offset)
            }
        };

        let count_request = SearchRequest {
            index_patterns: self.config.index_patterns.clone(),
            body: base_body,
        };
        Ok(PreparedQuery {
            count_request,
            fingerprint,
            position,
            sampling: None,
        })
    }

    /// Plans the optimization ladder for this request.
    fn plan(
        &self,
        request: &QueryRequest,
        total: u64,
        fingerprint: &str,
    ) -> Result<QueryPlan, AnalyticError> {
        let budget_mb = request.max_result_size_mb.unwrap_or(self.config.max_result_size_mb);
        let budget = SizeBudget {
            budget_bytes: u64::from(budget_mb) * 1024 * 1024,
            avg_document_bytes: u64::from(self.config.avg_document_bytes),
            page_floor: self.config.optimization_page_floor,
        };
        let group_by = request
            .filters
            .first()
            .map_or_else(|| "source_ip".to_string(), |filter| filter.field.clone());
        plan_query(
            request.optimization,
            request.fallback,
            &budget,
            total,
            request.page_size,
            &group_by,
            fingerprint,
        )
    }

    // ------------------------------------------------------------------
    // Execution paths
    // ------------------------------------------------------------------

    /// Runs the events path and assembles the response.
    async fn run_events(
        &self,
        request: &QueryRequest,
        prepared: &PreparedQuery,
        total: u64,
        plan: &QueryPlan,
        started: Instant,
    ) -> Result<EventsPage, AnalyticError> {
        let fields = if plan.prune_fields {
            Some(Vec::new())
        } else {
            request.fields.clone()
        };
        let mut body = build_search_body(
            &self.mapper,
            &request.time_range,
            &request.filters,
            fields.as_deref(),
            &request.sort_by,
            request.sort_order,
            &prepared.position,
            plan.page_size,
        )?;
        if let Some((probability, seed)) = prepared.sampling {
            body = apply_sampling(&body, probability, seed);
        }
        let search_request = SearchRequest {
            index_patterns: self.config.index_patterns.clone(),
            body,
        };
        let response = self.execute_search(&search_request).await?;

        let mut events = Vec::with_capacity(response.hits.len());
        for hit in &response.hits {
            if let Ok(event) = event_from_hit(&self.mapper, hit) {
                events.push(event);
            }
        }
        let returned = u64::try_from(events.len()).unwrap_or(u64::MAX);
        let has_next = match &prepared.position {
            Position::From(offset) => offset + u64::try_from(response.hits.len()).unwrap_or(0) < total,
            Position::After(_) => {
                response.hits.len() == usize::try_from(plan.page_size).unwrap_or(usize::MAX)
            }
        };
        let next_cursor = if has_next {
            self.next_cursor(request, prepared, plan, &response)?
        } else {
            None
        };
        let has_next = next_cursor.is_some();
        let pagination = PaginationMeta {
            page: if request.cursor.is_some() { None } else { request.page.or(Some(1)) },
            page_size: plan.page_size,
            total_count: total.max(returned),
            returned_count: returned,
            has_next,
            next_cursor,
        };
        let perf =
            self.perf_metrics(&response, &request.filters, false, plan.steps.clone(), started);
        Ok(EventsPage {
            events,
            aggregations: None,
            pagination,
            perf,
        })
    }

    /// Runs the aggregation fallback path.
    async fn run_aggregation_fallback(
        &self,
        request: &QueryRequest,
        total: u64,
        plan: &QueryPlan,
        group_by: &str,
        started: Instant,
    ) -> Result<EventsPage, AnalyticError> {
        let body = build_aggregation_body(
            &self.mapper,
            &request.time_range,
            &request.filters,
            group_by,
            self.config.optimization_page_floor,
        )?;
        let search_request = SearchRequest {
            index_patterns: self.config.index_patterns.clone(),
            body,
        };
        let response = self.execute_search(&search_request).await?;
        let mut perf =
            self.perf_metrics(&response, &request.filters, true, plan.steps.clone(), started);
        perf.query_complexity = shorewatch_core::QueryComplexity::Aggregation;
        Ok(EventsPage {
            events: Vec::new(),
            aggregations: Some(response.aggregations.unwrap_or(Value::Null)),
            pagination: PaginationMeta {
                page: None,
                page_size: plan.page_size,
                total_count: total,
                returned_count: 0,
                has_next: false,
                next_cursor: None,
            },
            perf,
        })
    }

    /// Builds the next-page cursor when more results remain.
    fn next_cursor(
        &self,
        request: &QueryRequest,
        prepared: &PreparedQuery,
        plan: &QueryPlan,
        response: &SearchResponse,
    ) -> Result<Option<String>, AnalyticError> {
        if response.hits.len() < usize::try_from(plan.page_size).unwrap_or(usize::MAX) {
            return Ok(None);
        }
        let Some(last) = response.hits.last() else {
            return Ok(None);
        };
        let last_sort_value = last.sort.first().cloned().unwrap_or(Value::Null);
        let cursor = PaginationCursor {
            sort_field: request.sort_by.clone(),
            last_sort_value,
            tiebreak_id: last.id.clone(),
            page_size: plan.page_size,
            query_fingerprint: prepared.fingerprint.clone(),
        };
        cursor.encode().map(Some).map_err(cursor_error)
    }

    // ------------------------------------------------------------------
    // Resilient backend calls
    // ------------------------------------------------------------------

    /// Executes a search through breaker, retry, and deadline.
    async fn execute_search(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse, AnalyticError> {
        let backend = Arc::clone(&self.backend);
        let envelope = self.envelope;
        retry_with_policy(&self.retry, Some(&self.breaker), move || {
            let backend = Arc::clone(&backend);
            let request = request.clone();
            async move {
                with_deadline(
                    &envelope,
                    TimeoutClass::ExternalService,
                    "siem search",
                    async { backend.search(&request).await },
                )
                .await
            }
        })
        .await
    }

    /// Executes a count through breaker, retry, and deadline.
    async fn execute_count(&self, request: &SearchRequest) -> Result<u64, AnalyticError> {
        let backend = Arc::clone(&self.backend);
        let envelope = self.envelope;
        retry_with_policy(&self.retry, Some(&self.breaker), move || {
            let backend = Arc::clone(&backend);
            let request = request.clone();
            async move {
                with_deadline(
                    &envelope,
                    TimeoutClass::ExternalService,
                    "siem count",
                    async { backend.count(&request).await },
                )
                .await
            }
        })
        .await
    }

    // ------------------------------------------------------------------
    // Metrics
    // ------------------------------------------------------------------

    /// Assembles the per-response performance metrics.
    fn perf_metrics(
        &self,
        response: &SearchResponse,
        filters: &[QueryFilter],
        is_aggregation: bool,
        steps: Vec<shorewatch_core::OptimizationStep>,
        started: Instant,
    ) -> QueryPerfMetrics {
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        QueryPerfMetrics {
            query_time_ms: elapsed.max(response.took_ms),
            indices_scanned: u32::try_from(self.config.index_patterns.len()).unwrap_or(u32::MAX),
            documents_examined: response.total,
            shards_scanned: response.shards_scanned,
            query_complexity: classify_complexity(filters, is_aggregation),
            optimization_applied: steps,
            cache_hit: false,
        }
    }

    /// Returns the configured maximum window.
    fn max_window(&self) -> time::Duration {
        time::Duration::hours(i64::from(self.config.max_window_hours))
    }
}

/// Prepared request shapes shared by the execution paths.
#[derive(Debug, Clone)]
struct PreparedQuery {
    /// Base request used for counting and fingerprinting.
    count_request: SearchRequest,
    /// Fingerprint binding cursors to this query.
    fingerprint: String,
    /// Resolved pagination position.
    position: Position,
    /// Sampling parameters when the sample fallback applied.
    sampling: Option<(f64, u64)>,
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Decodes a cursor token, mapping decode failures to validation errors.
fn decode_cursor(token: &str) -> Result<PaginationCursor, AnalyticError> {
    PaginationCursor::decode(token).map_err(cursor_error)
}

/// Maps cursor errors into the analytic taxonomy.
///
/// Tampered tokens fail their checksum inside decode and already surface
/// as a fingerprint mismatch; both paths share the `cursor_mismatch` code.
fn cursor_error(error: CursorError) -> AnalyticError {
    let code = match error {
        CursorError::Malformed => "cursor_malformed",
        CursorError::FingerprintMismatch => "cursor_mismatch",
    };
    AnalyticError::new(ErrorKind::Validation, error.to_string())
        .with_data(serde_json::json!({"code": code}))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
