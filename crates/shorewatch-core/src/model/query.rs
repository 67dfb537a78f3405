// crates/shorewatch-core/src/model/query.rs
// ============================================================================
// Module: Query Model
// Description: Filter, time-range, pagination, and perf-metric shapes.
// Purpose: Define the typed query surface consumed by the SIEM layer.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! The query model keeps the SIEM layer's inputs and outputs schema-backed:
//! filters are `(field, operator, value)` triples over user-visible field
//! names, time ranges validate `start <= end` and a maximum window, and
//! every response carries [`PaginationMeta`] and [`QueryPerfMetrics`] as
//! records rather than open maps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::Duration;
use time::OffsetDateTime;

use crate::error::AnalyticError;

// ============================================================================
// SECTION: Time Range
// ============================================================================

/// Inclusive UTC time window for a query.
///
/// # Invariants
/// - `start <= end`.
/// - Window width never exceeds the configured maximum at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Window start (UTC, inclusive).
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// Window end (UTC, inclusive).
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl TimeRange {
    /// Creates an absolute time range.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `Validation` when `end < start`.
    pub fn absolute(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, AnalyticError> {
        if end < start {
            return Err(AnalyticError::validation("time range end precedes start"));
        }
        Ok(Self {
            start,
            end,
        })
    }

    /// Creates a range covering the last `hours` ending at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `Validation` when `hours` is zero.
    pub fn last_hours(hours: u32, now: OffsetDateTime) -> Result<Self, AnalyticError> {
        if hours == 0 {
            return Err(AnalyticError::validation("time range hours must be greater than zero"));
        }
        Ok(Self {
            start: now - Duration::hours(i64::from(hours)),
            end: now,
        })
    }

    /// Validates the window width against a maximum.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `Validation` when the window
    /// exceeds `max_window`.
    pub fn validate_window(&self, max_window: Duration) -> Result<(), AnalyticError> {
        if self.end - self.start > max_window {
            return Err(AnalyticError::validation(format!(
                "time window exceeds maximum of {max_window}"
            )));
        }
        Ok(())
    }

    /// Returns the window width.
    #[must_use]
    pub fn width(&self) -> Duration {
        self.end - self.start
    }

    /// Returns true when the instant falls inside the window.
    #[must_use]
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        at >= self.start && at <= self.end
    }
}

// ============================================================================
// SECTION: Filters
// ============================================================================

/// Comparison operator for a query filter.
///
/// # Invariants
/// - Variants are stable for schema documentation and request building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equal to a scalar.
    Eq,
    /// Not equal to a scalar.
    Neq,
    /// Member of a list.
    In,
    /// Not a member of a list.
    NotIn,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Field exists.
    Exists,
    /// Field is missing.
    Missing,
    /// Field contains a substring.
    Contains,
}

/// Filter value shape, separated by construction.
///
/// Scalars and lists are distinct variants so a list can never be emitted
/// as a single-term match: the request builder maps `List` to a terms
/// clause and `Scalar` to a term clause with no other path between them.
///
/// # Invariants
/// - `Range` carries at least one bound.
/// - Untagged variant order matters: lists and ranges must be tried
///   before the scalar catch-all or they would never match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// List of values.
    List(Vec<Value>),
    /// Bounded range.
    Range {
        /// Lower bound (inclusive), when present.
        gte: Option<Value>,
        /// Upper bound (inclusive), when present.
        lte: Option<Value>,
    },
    /// Single scalar value.
    Scalar(Value),
}

/// One query filter over a user-visible field name.
///
/// # Invariants
/// - `field` is a user-visible name resolved through the field mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// User-visible field name.
    pub field: String,
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Filter value.
    pub value: FilterValue,
}

// ============================================================================
// SECTION: Sorting & Pagination
// ============================================================================

/// Sort direction.
///
/// # Invariants
/// - Variants map 1:1 to the backing store's sort order labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    #[default]
    Desc,
}

impl SortOrder {
    /// Returns the backing store label for this order.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Pagination metadata returned with every event query.
///
/// # Invariants
/// - `total_count >= returned_count`.
/// - `next_cursor` is present iff `has_next` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Page number when page-based pagination was used.
    pub page: Option<u32>,
    /// Page size in effect for this response.
    pub page_size: u32,
    /// Total matching documents at the backing store.
    pub total_count: u64,
    /// Number of events returned in this response.
    pub returned_count: u64,
    /// True when more results are available.
    pub has_next: bool,
    /// Opaque cursor for the next page, when available.
    pub next_cursor: Option<String>,
}

// ============================================================================
// SECTION: Optimization & Fallback
// ============================================================================

/// Requested optimization posture for a query.
///
/// # Invariants
/// - Variants are stable for tool schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    /// Execute exactly as requested.
    None,
    /// Apply the optimization ladder when the estimate exceeds budget.
    #[default]
    Auto,
    /// Apply the full ladder before the first attempt.
    Aggressive,
}

/// One rung of the optimization ladder, in application order.
///
/// # Invariants
/// - The ladder vocabulary is fixed; responses report a prefix of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStep {
    /// Projection pruned to the requested fields plus the reconstruction set.
    FieldReduction,
    /// Page size reduced to the configured optimization floor.
    PageSizeReduction,
    /// Query rewritten as a bucket aggregation.
    AggregationFallback,
    /// Deterministic random sampling applied.
    Sampling,
}

impl OptimizationStep {
    /// The fixed ladder vocabulary, in application order.
    pub const LADDER: [Self; 4] =
        [Self::FieldReduction, Self::PageSizeReduction, Self::AggregationFallback, Self::Sampling];
}

/// Behavior when the expected result size exceeds the hard limit.
///
/// # Invariants
/// - Variants are stable for tool schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Fail with a result-too-large error.
    #[default]
    Error,
    /// Rewrite as a bucket aggregation and return no raw events.
    Aggregate,
    /// Apply deterministic random sampling.
    Sample,
}

// ============================================================================
// SECTION: Performance Metrics
// ============================================================================

/// Coarse classification of query complexity.
///
/// # Invariants
/// - Variants are stable for telemetry labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    /// Term/terms filters only.
    Simple,
    /// Range filters or projections present.
    Moderate,
    /// Many filters or wildcard content matching.
    Complex,
    /// Executed as an aggregation.
    Aggregation,
}

/// Per-query performance metrics, returned with every response.
///
/// # Invariants
/// - `optimization_applied` is a prefix-ordered subset of
///   [`OptimizationStep::LADDER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPerfMetrics {
    /// Wall-clock query time in milliseconds.
    pub query_time_ms: u64,
    /// Number of indices scanned.
    pub indices_scanned: u32,
    /// Number of documents examined at the store.
    pub documents_examined: u64,
    /// Number of shards scanned.
    pub shards_scanned: u32,
    /// Complexity classification.
    pub query_complexity: QueryComplexity,
    /// Optimization ladder steps applied, in order.
    pub optimization_applied: Vec<OptimizationStep>,
    /// True when the response was served from a cache tier.
    pub cache_hit: bool,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
