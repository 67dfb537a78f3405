// crates/shorewatch-core/src/resilience/aggregator.rs
// ============================================================================
// Module: Error Aggregator
// Description: Bounded ring of recent errors with windowed thresholds.
// Purpose: Surface failure-rate trends without unbounded memory.
// Dependencies: serde_json, time
// ============================================================================

//! ## Overview
//! The aggregator keeps a bounded ring of recent error records and counts
//! them per kind inside a sliding window. Crossing the warning or critical
//! threshold for a kind emits one structured event per crossing per window;
//! the flag resets once the windowed count falls back under the threshold.
//! The aggregator is process-global state: built at startup, shared by
//! `Arc`, torn down after the transport loop exits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;
use time::OffsetDateTime;

use crate::error::ErrorKind;
use crate::log::EventLevel;
use crate::log::EventSink;
use crate::log::StructuredEvent;

// ============================================================================
// SECTION: Records
// ============================================================================

/// One recorded error occurrence.
#[derive(Debug, Clone)]
struct ErrorRecord {
    /// JSON-RPC code of the error.
    code: i64,
    /// Error kind.
    kind: ErrorKind,
    /// Originating service label, when known.
    service: Option<String>,
    /// Occurrence time (UTC).
    at: OffsetDateTime,
}

/// Serializable view of one recorded error for health reporting.
///
/// # Invariants
/// - Mirrors the internal ring record at snapshot time.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorRecordSnapshot {
    /// JSON-RPC code of the error.
    pub code: i64,
    /// Error kind.
    pub kind: ErrorKind,
    /// Originating service label, when known.
    pub service: Option<String>,
    /// Occurrence time (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// Threshold-crossing flags per kind for the current window.
#[derive(Debug, Clone, Copy, Default)]
struct CrossingFlags {
    /// Warning already emitted for the current window.
    warned: bool,
    /// Critical already emitted for the current window.
    criticaled: bool,
}

/// Aggregator configuration.
///
/// # Invariants
/// - `ring_capacity > 0`; `warning_threshold <= critical_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorAggregatorConfig {
    /// Maximum retained error records.
    pub ring_capacity: usize,
    /// Sliding window width.
    pub window: Duration,
    /// Windowed count that triggers a warning event.
    pub warning_threshold: usize,
    /// Windowed count that triggers a critical event.
    pub critical_threshold: usize,
}

impl Default for ErrorAggregatorConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 1_024,
            window: Duration::from_secs(300),
            warning_threshold: 10,
            critical_threshold: 50,
        }
    }
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Guarded aggregator state.
#[derive(Debug, Default)]
struct AggregatorInner {
    /// Bounded ring of recent records.
    ring: VecDeque<ErrorRecord>,
    /// Per-kind crossing flags.
    flags: BTreeMap<ErrorKind, CrossingFlags>,
}

/// Bounded error aggregator with windowed threshold events.
///
/// # Invariants
/// - The ring never exceeds `ring_capacity` records.
/// - Each threshold fires at most once per window per kind.
pub struct ErrorAggregator {
    /// Aggregator configuration.
    config: ErrorAggregatorConfig,
    /// Guarded ring and flags.
    inner: Mutex<AggregatorInner>,
    /// Sink for threshold events.
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ErrorAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorAggregator").field("config", &self.config).finish()
    }
}

impl ErrorAggregator {
    /// Creates an aggregator reporting to the given sink.
    #[must_use]
    pub fn new(config: ErrorAggregatorConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            inner: Mutex::new(AggregatorInner::default()),
            sink,
        }
    }

    /// Records an error occurrence at the current time.
    pub fn record(&self, code: i64, kind: ErrorKind, service: Option<&str>) {
        self.record_at(code, kind, service, OffsetDateTime::now_utc());
    }

    /// Records an error occurrence at an explicit time.
    ///
    /// Exposed for deterministic tests; production callers use
    /// [`Self::record`].
    pub fn record_at(
        &self,
        code: i64,
        kind: ErrorKind,
        service: Option<&str>,
        at: OffsetDateTime,
    ) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.ring.len() == self.config.ring_capacity {
            inner.ring.pop_front();
        }
        inner.ring.push_back(ErrorRecord {
            code,
            kind,
            service: service.map(ToString::to_string),
            at,
        });
        let window_start = at - time::Duration::seconds_f64(self.config.window.as_secs_f64());
        let windowed =
            inner.ring.iter().filter(|record| record.kind == kind && record.at >= window_start).count();
        let flags = inner.flags.entry(kind).or_default();
        if windowed < self.config.warning_threshold {
            // Count fell back under the floor; re-arm both thresholds.
            *flags = CrossingFlags::default();
            return;
        }
        let mut emit: Option<(EventLevel, usize)> = None;
        if windowed >= self.config.critical_threshold && !flags.criticaled {
            flags.criticaled = true;
            emit = Some((EventLevel::Critical, self.config.critical_threshold));
        } else if windowed >= self.config.warning_threshold && !flags.warned {
            flags.warned = true;
            emit = Some((EventLevel::Warning, self.config.warning_threshold));
        }
        drop(inner);
        if let Some((level, threshold)) = emit {
            self.sink.record(&StructuredEvent::now(
                "error_aggregator",
                "threshold_crossed",
                level,
                json!({
                    "kind": kind.label(),
                    "windowed_count": windowed,
                    "threshold": threshold,
                    "service": service,
                    "code": code,
                }),
            ));
        }
    }

    /// Returns windowed counts per kind at the given instant.
    #[must_use]
    pub fn windowed_counts(&self, now: OffsetDateTime) -> BTreeMap<ErrorKind, usize> {
        let Ok(inner) = self.inner.lock() else {
            return BTreeMap::new();
        };
        let window_start = now - time::Duration::seconds_f64(self.config.window.as_secs_f64());
        let mut counts = BTreeMap::new();
        for record in inner.ring.iter().filter(|record| record.at >= window_start) {
            *counts.entry(record.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the most recent records, newest last, for health reporting.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<ErrorRecordSnapshot> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        inner
            .ring
            .iter()
            .rev()
            .take(limit)
            .map(|record| ErrorRecordSnapshot {
                code: record.code,
                kind: record.kind,
                service: record.service.clone(),
                at: record.at,
            })
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    /// Returns the number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.ring.len()).unwrap_or(0)
    }

    /// Returns true when no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
