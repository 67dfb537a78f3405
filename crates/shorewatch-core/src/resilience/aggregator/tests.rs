// crates/shorewatch-core/src/resilience/aggregator/tests.rs
// ============================================================================
// Module: Error Aggregator Tests
// Description: Unit tests for the bounded ring and threshold events.
// Purpose: Validate once-per-window emission and ring bounds.
// Dependencies: shorewatch-core
// ============================================================================

//! ## Overview
//! Drives the aggregator with explicit timestamps and asserts single
//! emission per threshold crossing and ring capacity enforcement.

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

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use time::OffsetDateTime;

use super::ErrorAggregator;
use super::ErrorAggregatorConfig;
use crate::error::ErrorKind;
use crate::log::EventSink;
use crate::log::StructuredEvent;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Sink capturing emitted events for assertions.
#[derive(Default)]
struct CapturingSink {
    /// Captured events.
    events: Mutex<Vec<StructuredEvent>>,
}

impl EventSink for CapturingSink {
    fn record(&self, event: &StructuredEvent) {
        self.events.lock().expect("events lock").push(event.clone());
    }
}

/// Returns an aggregator with small thresholds and its sink.
fn small_aggregator() -> (ErrorAggregator, Arc<CapturingSink>) {
    let sink = Arc::new(CapturingSink::default());
    let aggregator = ErrorAggregator::new(
        ErrorAggregatorConfig {
            ring_capacity: 16,
            window: Duration::from_secs(60),
            warning_threshold: 3,
            critical_threshold: 5,
        },
        Arc::clone(&sink) as Arc<dyn EventSink>,
    );
    (aggregator, sink)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn warning_fires_once_per_window() {
    let (aggregator, sink) = small_aggregator();
    let base = OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000);
    for i in 0 .. 4 {
        aggregator.record_at(-32_000, ErrorKind::Timeout, Some("siem"), base + time::Duration::seconds(i));
    }
    let events = sink.events.lock().expect("events lock");
    let warnings: Vec<_> = events.iter().filter(|event| event.event == "threshold_crossed").collect();
    assert_eq!(warnings.len(), 1, "warning must fire exactly once");
}

#[test]
fn critical_fires_after_warning() {
    let (aggregator, sink) = small_aggregator();
    let base = OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000);
    for i in 0 .. 6 {
        aggregator.record_at(-32_007, ErrorKind::ExternalService, None, base + time::Duration::seconds(i));
    }
    let events = sink.events.lock().expect("events lock");
    assert_eq!(events.len(), 2, "one warning and one critical");
}

#[test]
fn counts_are_windowed_per_kind() {
    let (aggregator, _sink) = small_aggregator();
    let base = OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000);
    aggregator.record_at(-32_000, ErrorKind::Timeout, None, base);
    aggregator.record_at(-32_008, ErrorKind::RateLimited, None, base + time::Duration::seconds(1));
    aggregator.record_at(-32_000, ErrorKind::Timeout, None, base + time::Duration::minutes(5));
    let counts = aggregator.windowed_counts(base + time::Duration::minutes(5));
    assert_eq!(counts.get(&ErrorKind::Timeout), Some(&1));
    assert_eq!(counts.get(&ErrorKind::RateLimited), None);
}

#[test]
fn ring_capacity_is_enforced() {
    let (aggregator, _sink) = small_aggregator();
    let base = OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000);
    for i in 0 .. 100 {
        aggregator.record_at(-32_603, ErrorKind::Internal, None, base + time::Duration::seconds(i));
    }
    assert_eq!(aggregator.len(), 16);
    let recent = aggregator.recent(4);
    assert_eq!(recent.len(), 4);
    assert!(recent[0].at < recent[3].at, "recent returns newest last");
}
