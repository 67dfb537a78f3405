// crates/shorewatch-siem/src/optimize.rs
// ============================================================================
// Module: Optimization Ladder
// Description: Result-size budgeting and staged query reduction.
// Purpose: Keep responses inside the size budget without surprising callers.
// Dependencies: serde_json, shorewatch-core
// ============================================================================

//! ## Overview
//! Before execution, the expected result size is estimated from the match
//! count and the configured average document size. When the estimate
//! exceeds the budget, reductions apply in a fixed order: prune the
//! projection, lower the page size to the floor, then follow the caller's
//! fallback strategy (aggregate, sample, or error). Each applied rung is
//! reported in the response metrics so callers can see what changed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use shorewatch_core::AnalyticError;
use shorewatch_core::ErrorKind;
use shorewatch_core::FallbackStrategy;
use shorewatch_core::OptimizationLevel;
use shorewatch_core::OptimizationStep;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Assumed shrink factor when the projection is pruned to the minimum set.
const FIELD_REDUCTION_FACTOR: u64 = 4;

// ============================================================================
// SECTION: Plan
// ============================================================================

/// How the optimized query will execute.
///
/// # Invariants
/// - `Sampled.probability` falls in `(0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    /// Return raw events.
    Events,
    /// Rewrite as a bucket aggregation over the grouping field.
    Aggregate {
        /// User-visible grouping field.
        group_by: String,
    },
    /// Apply deterministic random sampling.
    Sampled {
        /// Inclusion probability.
        probability: f64,
        /// Deterministic seed derived from the query fingerprint.
        seed: u64,
    },
}

/// Optimized execution plan for one query.
///
/// # Invariants
/// - `steps` is a subset of the ladder vocabulary in application order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Projection after optimization; `None` keeps the caller's request.
    pub prune_fields: bool,
    /// Effective page size.
    pub page_size: u32,
    /// Execution mode.
    pub mode: ExecutionMode,
    /// Ladder steps applied, in order.
    pub steps: Vec<OptimizationStep>,
}

/// Budget inputs for planning.
///
/// # Invariants
/// - `budget_bytes` and `avg_document_bytes` are greater than zero.
#[derive(Debug, Clone, Copy)]
pub struct SizeBudget {
    /// Hard result-size budget in bytes.
    pub budget_bytes: u64,
    /// Estimated average document size in bytes.
    pub avg_document_bytes: u64,
    /// Page-size floor for the reduction rung.
    pub page_floor: u32,
}

impl SizeBudget {
    /// Estimates the response size for a page of documents.
    #[must_use]
    const fn estimate(&self, documents: u64, pruned: bool) -> u64 {
        let per_document = if pruned {
            self.avg_document_bytes / FIELD_REDUCTION_FACTOR
        } else {
            self.avg_document_bytes
        };
        documents.saturating_mul(per_document)
    }
}

// ============================================================================
// SECTION: Planning
// ============================================================================

/// Plans the execution of a query against the size budget.
///
/// `total_matches` comes from a count query; `group_by` names the leading
/// grouping field used when the aggregation fallback applies.
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `Validation` when the estimate
/// exceeds the budget and the fallback strategy is `Error`.
pub fn plan_query(
    level: OptimizationLevel,
    fallback: FallbackStrategy,
    budget: &SizeBudget,
    total_matches: u64,
    requested_page_size: u32,
    group_by: &str,
    fingerprint: &str,
) -> Result<QueryPlan, AnalyticError> {
    let mut plan = QueryPlan {
        prune_fields: false,
        page_size: requested_page_size,
        mode: ExecutionMode::Events,
        steps: Vec::new(),
    };
    if level == OptimizationLevel::None {
        return Ok(plan);
    }
    if level == OptimizationLevel::Aggressive {
        // Aggressive applies the cheap rungs before the first attempt.
        plan.prune_fields = true;
        plan.steps.push(OptimizationStep::FieldReduction);
        if budget.page_floor < plan.page_size {
            plan.page_size = budget.page_floor;
            plan.steps.push(OptimizationStep::PageSizeReduction);
        }
    }

    let expected_docs = |page_size: u32| u64::from(page_size).min(total_matches);
    if budget.estimate(expected_docs(plan.page_size), plan.prune_fields) <= budget.budget_bytes {
        return Ok(plan);
    }
    if !plan.prune_fields {
        plan.prune_fields = true;
        plan.steps.push(OptimizationStep::FieldReduction);
        if budget.estimate(expected_docs(plan.page_size), true) <= budget.budget_bytes {
            return Ok(plan);
        }
    }
    if budget.page_floor < plan.page_size {
        plan.page_size = budget.page_floor;
        plan.steps.push(OptimizationStep::PageSizeReduction);
        if budget.estimate(expected_docs(plan.page_size), true) <= budget.budget_bytes {
            return Ok(plan);
        }
    }
    match fallback {
        FallbackStrategy::Aggregate => {
            plan.mode = ExecutionMode::Aggregate {
                group_by: group_by.to_string(),
            };
            plan.steps.push(OptimizationStep::AggregationFallback);
            Ok(plan)
        }
        FallbackStrategy::Sample => {
            let budget_docs = (budget.budget_bytes
                / (budget.avg_document_bytes / FIELD_REDUCTION_FACTOR).max(1))
            .max(1);
            let probability =
                (budget_docs as f64 / expected_docs(plan.page_size).max(1) as f64).min(1.0);
            plan.mode = ExecutionMode::Sampled {
                probability,
                seed: sampling_seed(fingerprint),
            };
            plan.steps.push(OptimizationStep::Sampling);
            Ok(plan)
        }
        FallbackStrategy::Error => Err(AnalyticError::new(
            ErrorKind::Validation,
            format!(
                "result too large: {total_matches} matches exceed the size budget after \
                 optimization"
            ),
        )
        .with_data(json!({"code": "result_too_large", "total_matches": total_matches}))),
    }
}

/// Derives the deterministic sampling seed from a query fingerprint.
#[must_use]
pub fn sampling_seed(fingerprint: &str) -> u64 {
    let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in fingerprint.bytes() {
        seed ^= u64::from(byte);
        seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
    }
    seed
}

/// Wraps a query body in a deterministic random-sampling score.
#[must_use]
pub fn apply_sampling(body: &Value, probability: f64, seed: u64) -> Value {
    let mut sampled = body.clone();
    if let Value::Object(map) = &mut sampled
        && let Some(query) = map.remove("query")
    {
        map.insert(
            "query".to_string(),
            json!({
                "function_score": {
                    "query": query,
                    "random_score": { "seed": seed, "field": "_seq_no" },
                    "min_score": 1.0 - probability
                }
            }),
        );
    }
    sampled
}

// ============================================================================
// SECTION: Tests
// ============================================================================
