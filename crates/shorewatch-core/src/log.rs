// crates/shorewatch-core/src/log.rs
// ============================================================================
// Module: Structured Event Sink
// Description: Dependency-light structured observability events.
// Purpose: Let subsystems report operational records without a logging dep.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Shorewatch subsystems report operational records (unmapped SIEM fields,
//! skipped correlation stages, error-aggregator threshold crossings) through
//! the [`EventSink`] trait. The trait is intentionally dependency-light so
//! deployments can plug in their own logging or shipping pipeline without a
//! redesign. The core never installs a global logger.
//! Security posture: event payloads must not contain secrets or raw
//! documents beyond field names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Event Shape
// ============================================================================

/// Severity of a structured operational event.
///
/// # Invariants
/// - Variants are stable for downstream filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Routine operational record.
    Info,
    /// Degraded but functioning condition.
    Warning,
    /// Condition requiring operator attention.
    Critical,
}

/// Structured operational event emitted by a subsystem.
///
/// # Invariants
/// - `component` and `event` are stable labels, not free text.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredEvent {
    /// Emitting component label.
    pub component: &'static str,
    /// Stable event label.
    pub event: &'static str,
    /// Event severity.
    pub level: EventLevel,
    /// Emission time (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    /// Structured event fields.
    pub fields: Value,
}

impl StructuredEvent {
    /// Creates an event stamped with the current UTC time.
    #[must_use]
    pub fn now(
        component: &'static str,
        event: &'static str,
        level: EventLevel,
        fields: Value,
    ) -> Self {
        Self {
            component,
            event,
            level,
            at: OffsetDateTime::now_utc(),
            fields,
        }
    }
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Sink for structured operational events.
pub trait EventSink: Send + Sync {
    /// Records a structured event.
    fn record(&self, event: &StructuredEvent);
}

/// Sink that discards all events.
///
/// # Invariants
/// - Events are intentionally dropped.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: &StructuredEvent) {}
}

/// Sink that writes one JSON object per line to a writer.
///
/// # Invariants
/// - Serialization failures are swallowed; the sink is best-effort.
pub struct WriterSink<W: Write + Send> {
    /// Guarded output writer.
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Creates a sink over the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn record(&self, event: &StructuredEvent) {
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut guard) = self.writer.lock() {
            let _ = writeln!(guard, "{line}");
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
