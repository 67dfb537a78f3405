// crates/shorewatch-siem/src/query.rs
// ============================================================================
// Module: Search Request Builder
// Description: Typed filter translation into search bodies.
// Purpose: Build bool queries over candidate paths with stable sorting.
// Dependencies: serde_json, sha2, shorewatch-core
// ============================================================================

//! ## Overview
//! Filters arrive keyed by user-visible field names and are translated
//! through the field mapper into `bool.filter` clauses that match any
//! candidate path. The value shape picks the clause kind by construction:
//! a list value always becomes a `terms` match and a scalar always a
//! `term` match; there is no code path that can put a list into a `term`
//! clause. Sorting is stable with a document-id tiebreaker, and the query
//! fingerprint hashes the normalized body minus pagination so cursors bind
//! to exactly one query.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use sha2::Digest;
use sha2::Sha256;
use shorewatch_core::AnalyticError;
use shorewatch_core::ErrorKind;
use shorewatch_core::FieldMapper;
use shorewatch_core::FilterOperator;
use shorewatch_core::FilterValue;
use shorewatch_core::QueryComplexity;
use shorewatch_core::QueryFilter;
use shorewatch_core::SortOrder;
use shorewatch_core::TimeRange;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum projection required to reconstruct a `SecurityEvent`.
///
/// Whatever projection the caller requests, these paths ride along so the
/// normalizer can always rebuild the canonical record.
pub const RECONSTRUCTION_FIELDS: &[&str] = &[
    "@timestamp",
    "timestamp",
    "event.id",
    "source.ip",
    "source.address",
    "destination.ip",
    "destination.address",
    "related.ip",
];

// ============================================================================
// SECTION: Filter Parsing
// ============================================================================

/// Parses a JSON filters object into typed query filters.
///
/// Scalars infer `eq`, arrays infer `in`, and `{gte,lte}` objects infer a
/// range; the separation into [`FilterValue`] variants is what later forces
/// `terms` for lists.
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `InvalidRequest` for empty lists or
/// unrecognized range objects.
pub fn filters_from_json(filters: &Value) -> Result<Vec<QueryFilter>, AnalyticError> {
    let Value::Object(map) = filters else {
        return Err(AnalyticError::new(
            ErrorKind::InvalidRequest,
            "filters must be an object of field to value",
        ));
    };
    let mut parsed = Vec::with_capacity(map.len());
    for (field, value) in map {
        parsed.push(filter_from_entry(field, value)?);
    }
    Ok(parsed)
}

/// Parses one filters-object entry into a typed filter.
fn filter_from_entry(field: &str, value: &Value) -> Result<QueryFilter, AnalyticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(AnalyticError::new(
                    ErrorKind::InvalidRequest,
                    format!("filter {field} has an empty list value"),
                ));
            }
            Ok(QueryFilter {
                field: field.to_string(),
                operator: FilterOperator::In,
                value: FilterValue::List(items.clone()),
            })
        }
        Value::Object(range) => {
            let gte = range.get("gte").cloned();
            let lte = range.get("lte").cloned();
            if gte.is_none() && lte.is_none() {
                return Err(AnalyticError::new(
                    ErrorKind::InvalidRequest,
                    format!("filter {field} object must carry gte and/or lte"),
                ));
            }
            Ok(QueryFilter {
                field: field.to_string(),
                operator: FilterOperator::Gte,
                value: FilterValue::Range {
                    gte,
                    lte,
                },
            })
        }
        scalar => Ok(QueryFilter {
            field: field.to_string(),
            operator: FilterOperator::Eq,
            value: FilterValue::Scalar(scalar.clone()),
        }),
    }
}

// ============================================================================
// SECTION: Clause Construction
// ============================================================================

/// Builds the `bool` query for a time range and filter set.
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `InvalidRequest` for unknown field
/// names (with suggestions attached) or operator/value mismatches.
pub fn build_bool_query(
    mapper: &FieldMapper,
    time_range: &TimeRange,
    filters: &[QueryFilter],
) -> Result<Value, AnalyticError> {
    let mut filter_clauses = vec![time_range_clause(time_range)];
    let mut must_not_clauses = Vec::new();
    for filter in filters {
        let candidates = mapper.map_for_query(&filter.field).map_err(|error| {
            let shorewatch_core::FieldMapError::InvalidFieldName {
                field,
                suggestions,
            } = error;
            AnalyticError::new(ErrorKind::InvalidRequest, format!("unknown filter field {field}"))
                .with_data(json!({"field": field, "suggestions": suggestions}))
        })?;
        let clause = candidate_clause(&candidates, filter)?;
        match filter.operator {
            FilterOperator::Neq | FilterOperator::NotIn | FilterOperator::Missing => {
                must_not_clauses.push(clause);
            }
            _ => filter_clauses.push(clause),
        }
    }
    let mut bool_body = Map::new();
    bool_body.insert("filter".to_string(), Value::Array(filter_clauses));
    if !must_not_clauses.is_empty() {
        bool_body.insert("must_not".to_string(), Value::Array(must_not_clauses));
    }
    Ok(json!({ "bool": bool_body }))
}

/// Builds the range clause for the query window.
fn time_range_clause(time_range: &TimeRange) -> Value {
    json!({
        "range": {
            "@timestamp": {
                "gte": format_rfc3339(time_range.start),
                "lte": format_rfc3339(time_range.end)
            }
        }
    })
}

/// Builds a clause matching any candidate path for one filter.
///
/// A single candidate yields the bare clause; multiple candidates wrap the
/// per-path clauses in a `bool.should` with `minimum_should_match: 1`.
fn candidate_clause(candidates: &[&str], filter: &QueryFilter) -> Result<Value, AnalyticError> {
    let mut per_path = Vec::with_capacity(candidates.len());
    for path in candidates {
        per_path.push(path_clause(path, filter)?);
    }
    if per_path.len() == 1 {
        return Ok(per_path.remove(0));
    }
    Ok(json!({
        "bool": {
            "should": per_path,
            "minimum_should_match": 1
        }
    }))
}

/// Builds the clause for one document path.
fn path_clause(path: &str, filter: &QueryFilter) -> Result<Value, AnalyticError> {
    let mismatch = |expected: &str| {
        AnalyticError::new(
            ErrorKind::InvalidRequest,
            format!("filter {} requires a {expected} value", filter.field),
        )
    };
    match (filter.operator, &filter.value) {
        (FilterOperator::Eq, FilterValue::Scalar(value))
        | (FilterOperator::Neq, FilterValue::Scalar(value)) => {
            Ok(json!({ "term": { path: value } }))
        }
        (FilterOperator::In, FilterValue::List(values))
        | (FilterOperator::NotIn, FilterValue::List(values)) => {
            Ok(json!({ "terms": { path: values } }))
        }
        // An eq over a list is a caller convenience; it still must emit
        // terms, never term.
        (FilterOperator::Eq, FilterValue::List(values)) => {
            Ok(json!({ "terms": { path: values } }))
        }
        (FilterOperator::Gt, FilterValue::Scalar(value)) => {
            Ok(json!({ "range": { path: { "gt": value } } }))
        }
        (FilterOperator::Gte, FilterValue::Scalar(value)) => {
            Ok(json!({ "range": { path: { "gte": value } } }))
        }
        (FilterOperator::Lt, FilterValue::Scalar(value)) => {
            Ok(json!({ "range": { path: { "lt": value } } }))
        }
        (FilterOperator::Lte, FilterValue::Scalar(value)) => {
            Ok(json!({ "range": { path: { "lte": value } } }))
        }
        (
            FilterOperator::Gte | FilterOperator::Lte,
            FilterValue::Range {
                gte,
                lte,
            },
        ) => {
            let mut bounds = Map::new();
            if let Some(gte) = gte {
                bounds.insert("gte".to_string(), gte.clone());
            }
            if let Some(lte) = lte {
                bounds.insert("lte".to_string(), lte.clone());
            }
            Ok(json!({ "range": { path: bounds } }))
        }
        (FilterOperator::Exists | FilterOperator::Missing, _) => {
            Ok(json!({ "exists": { "field": path } }))
        }
        (FilterOperator::Contains, FilterValue::Scalar(value)) => {
            let needle = value.as_str().ok_or_else(|| mismatch("string"))?;
            Ok(json!({ "wildcard": { path: { "value": format!("*{needle}*") } } }))
        }
        (FilterOperator::In | FilterOperator::NotIn, _) => Err(mismatch("list")),
        _ => Err(mismatch("scalar")),
    }
}

/// Formats an instant as RFC 3339 for the cluster.
fn format_rfc3339(at: time::OffsetDateTime) -> String {
    at.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

// ============================================================================
// SECTION: Body Assembly
// ============================================================================

/// Pagination position for a search body.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// Offset-based position.
    From(u64),
    /// Cursor-based position (`search_after` values).
    After(Vec<Value>),
}

/// Assembles a complete search body.
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `InvalidRequest` when the sort field
/// is unknown.
#[allow(clippy::too_many_arguments, reason = "Body assembly mirrors the wire shape.")]
pub fn build_search_body(
    mapper: &FieldMapper,
    time_range: &TimeRange,
    filters: &[QueryFilter],
    fields: Option<&[String]>,
    sort_by: &str,
    sort_order: SortOrder,
    position: &Position,
    size: u32,
) -> Result<Value, AnalyticError> {
    let query = build_bool_query(mapper, time_range, filters)?;
    let sort_path = sort_path(mapper, sort_by)?;
    let mut body = Map::new();
    body.insert("query".to_string(), query);
    body.insert(
        "sort".to_string(),
        json!([
            { sort_path.clone(): { "order": sort_order.label() } },
            { "_id": { "order": "asc" } }
        ]),
    );
    body.insert("size".to_string(), json!(size));
    match position {
        Position::From(offset) => {
            body.insert("from".to_string(), json!(offset));
        }
        Position::After(values) => {
            body.insert("search_after".to_string(), Value::Array(values.clone()));
        }
    }
    if let Some(fields) = fields {
        body.insert("_source".to_string(), Value::Array(projection(mapper, fields)?));
    }
    Ok(Value::Object(body))
}

/// Resolves the sort field to its highest-precedence document path.
pub fn sort_path(mapper: &FieldMapper, sort_by: &str) -> Result<String, AnalyticError> {
    if sort_by == "@timestamp" {
        return Ok(sort_by.to_string());
    }
    let candidates = mapper.map_for_query(sort_by).map_err(|_| {
        AnalyticError::new(ErrorKind::InvalidRequest, format!("unknown sort field {sort_by}"))
    })?;
    Ok((*candidates.first().unwrap_or(&"@timestamp")).to_string())
}

/// Expands a user projection into document paths plus the reconstruction
/// set.
fn projection(mapper: &FieldMapper, fields: &[String]) -> Result<Vec<Value>, AnalyticError> {
    let mut paths: Vec<String> =
        RECONSTRUCTION_FIELDS.iter().map(|path| (*path).to_string()).collect();
    for field in fields {
        let candidates = mapper.map_for_query(field).map_err(|_| {
            AnalyticError::new(
                ErrorKind::InvalidRequest,
                format!("unknown projection field {field}"),
            )
        })?;
        for candidate in candidates {
            let candidate = candidate.to_string();
            if !paths.contains(&candidate) {
                paths.push(candidate);
            }
        }
    }
    Ok(paths.into_iter().map(Value::String).collect())
}

// ============================================================================
// SECTION: Fingerprint & Complexity
// ============================================================================

/// Keys stripped from a body before fingerprinting.
const PAGINATION_KEYS: &[&str] = &["from", "search_after", "size"];

/// Computes the fingerprint of a query body minus pagination.
///
/// Cursors bind to this value; two bodies that differ only in pagination
/// share a fingerprint.
#[must_use]
pub fn query_fingerprint(body: &Value, index_patterns: &[String]) -> String {
    let mut normalized = body.clone();
    if let Value::Object(map) = &mut normalized {
        for key in PAGINATION_KEYS {
            map.remove(*key);
        }
    }
    let mut sorted_patterns: Vec<&String> = index_patterns.iter().collect();
    sorted_patterns.sort();
    let mut hasher = Sha256::new();
    hasher.update(normalized.to_string().as_bytes());
    for pattern in sorted_patterns {
        hasher.update(pattern.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut fingerprint = String::with_capacity(32);
    for byte in digest.iter().take(16) {
        fingerprint.push_str(&format!("{byte:02x}"));
    }
    fingerprint
}

/// Classifies query complexity from its filter set.
#[must_use]
pub fn classify_complexity(filters: &[QueryFilter], is_aggregation: bool) -> QueryComplexity {
    if is_aggregation {
        return QueryComplexity::Aggregation;
    }
    let has_contains =
        filters.iter().any(|filter| filter.operator == FilterOperator::Contains);
    if has_contains || filters.len() > 5 {
        return QueryComplexity::Complex;
    }
    let has_range = filters.iter().any(|filter| {
        matches!(
            filter.value,
            FilterValue::Range {
                ..
            }
        ) || matches!(
            filter.operator,
            FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte
        )
    });
    if has_range {
        QueryComplexity::Moderate
    } else {
        QueryComplexity::Simple
    }
}

/// Builds a single-path term query body (no candidate fan-out).
///
/// Seed-event retrieval issues one query per candidate path and unions the
/// results; a composite should-query over the paths has been observed to
/// miss events on some index configurations and must not be used there.
#[must_use]
pub fn build_path_term_body(
    path: &str,
    value: &Value,
    time_range: &TimeRange,
    size: u32,
) -> Value {
    json!({
        "query": {
            "bool": {
                "filter": [
                    time_range_clause(time_range),
                    { "term": { path: value } }
                ]
            }
        },
        "sort": [
            { "@timestamp": { "order": "asc" } },
            { "_id": { "order": "asc" } }
        ],
        "size": size
    })
}

/// Builds a terms aggregation body over the leading grouping field.
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `InvalidRequest` when the grouping
/// field is unknown.
pub fn build_aggregation_body(
    mapper: &FieldMapper,
    time_range: &TimeRange,
    filters: &[QueryFilter],
    group_by: &str,
    bucket_count: u32,
) -> Result<Value, AnalyticError> {
    let query = build_bool_query(mapper, time_range, filters)?;
    let path = sort_path(mapper, group_by)?;
    Ok(json!({
        "query": query,
        "size": 0,
        "aggs": {
            "group": {
                "terms": { "field": path, "size": bucket_count }
            }
        }
    }))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
