// crates/shorewatch-core/src/model/query/tests.rs
// ============================================================================
// Module: Query Model Tests
// Description: Unit tests for time ranges and filter value shapes.
// Purpose: Validate window arithmetic and scalar/list separation.
// Dependencies: shorewatch-core
// ============================================================================

//! ## Overview
//! Exercises time-range validation and the filter value variants.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;
use time::Duration;
use time::OffsetDateTime;

use super::FilterValue;
use super::OptimizationStep;
use super::TimeRange;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn absolute_range_rejects_inverted_bounds() {
    let now = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
    assert!(TimeRange::absolute(now, now - Duration::hours(1)).is_err());
    let range = TimeRange::absolute(now - Duration::hours(1), now).expect("valid range");
    assert_eq!(range.width(), Duration::hours(1));
}

#[test]
fn last_hours_rejects_zero_and_contains_endpoints() {
    let now = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
    assert!(TimeRange::last_hours(0, now).is_err());
    let range = TimeRange::last_hours(24, now).expect("valid range");
    assert!(range.contains(range.start));
    assert!(range.contains(range.end));
    assert!(!range.contains(range.end + Duration::seconds(1)));
}

#[test]
fn validate_window_enforces_maximum() {
    let now = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
    let range = TimeRange::last_hours(72, now).expect("valid range");
    assert!(range.validate_window(Duration::hours(48)).is_err());
    assert!(range.validate_window(Duration::hours(72)).is_ok());
}

#[test]
fn filter_value_deserializes_scalars_and_lists_distinctly() {
    let scalar: FilterValue = serde_json::from_value(json!("198.51.100.7")).expect("scalar");
    assert!(matches!(scalar, FilterValue::Scalar(_)));
    let list: FilterValue = serde_json::from_value(json!(["22", "2222"])).expect("list");
    assert!(matches!(list, FilterValue::List(ref items) if items.len() == 2));
}

#[test]
fn ladder_order_is_stable() {
    assert_eq!(
        OptimizationStep::LADDER,
        [
            OptimizationStep::FieldReduction,
            OptimizationStep::PageSizeReduction,
            OptimizationStep::AggregationFallback,
            OptimizationStep::Sampling,
        ]
    );
}
