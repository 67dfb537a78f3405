// crates/shorewatch-siem/src/parse/tests.rs
// ============================================================================
// Module: Document Normalization Tests
// Description: Unit tests for hit-to-event parsing.
// Purpose: Validate lenient parsing and required-field enforcement.
// Dependencies: shorewatch-siem
// ============================================================================

//! ## Overview
//! Exercises normalization with ECS documents, legacy flat documents, and
//! malformed values.

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

use serde_json::json;
use shorewatch_core::EventCategory;
use shorewatch_core::EventKind;
use shorewatch_core::FieldMapper;
use shorewatch_core::Severity;
use shorewatch_core::log::NoopSink;

use super::event_from_hit;
use crate::client::SearchHit;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns the default mapper with a discard sink.
fn mapper() -> FieldMapper {
    FieldMapper::new(Arc::new(NoopSink))
}

/// Wraps a document into a hit with the given id.
fn hit(id: &str, source: serde_json::Value) -> SearchHit {
    SearchHit {
        id: id.to_string(),
        source,
        sort: Vec::new(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn ecs_documents_normalize_fully() {
    let document = json!({
        "@timestamp": "2026-01-15T10:30:00Z",
        "event": {"type": "ssh_login", "category": "authentication", "severity_label": "high"},
        "source": {
            "ip": "141.98.80.121",
            "port": 51234,
            "geo": {"country_name": "NL"},
            "as": {"number": 202425, "organization": {"name": "ExampleNet"}}
        },
        "destination": {"ip": "10.0.0.5", "port": 22},
        "network": {"transport": "tcp"}
    });
    let event = event_from_hit(&mapper(), &hit("e-1", document)).expect("parses");
    assert_eq!(event.id, "e-1");
    assert_eq!(event.event_kind, EventKind::Authentication);
    assert_eq!(event.category, EventCategory::Authentication);
    assert_eq!(event.severity, Some(Severity::High));
    assert_eq!(event.source_ip.map(|ip| ip.to_string()), Some("141.98.80.121".to_string()));
    assert_eq!(event.destination_port, Some(22));
    assert_eq!(event.asn, Some(202_425));
    assert_eq!(event.country.as_deref(), Some("NL"));
}

#[test]
fn legacy_flat_documents_normalize_via_fallback_candidates() {
    let document = json!({
        "timestamp": "2026-01-15T10:30:00Z",
        "src_ip": "203.0.113.9",
        "dst_ip": "10.0.0.5",
        "protocol": "udp"
    });
    let event = event_from_hit(&mapper(), &hit("e-2", document)).expect("parses");
    assert_eq!(event.source_ip.map(|ip| ip.to_string()), Some("203.0.113.9".to_string()));
    assert_eq!(event.protocol.as_deref(), Some("udp"));
    assert_eq!(event.event_kind, EventKind::Unknown);
}

#[test]
fn related_ip_backfills_the_source_address() {
    let document = json!({
        "@timestamp": "2026-01-15T10:30:00Z",
        "related": {"ip": "198.51.100.44"}
    });
    let event = event_from_hit(&mapper(), &hit("e-3", document)).expect("parses");
    assert_eq!(event.source_ip.map(|ip| ip.to_string()), Some("198.51.100.44".to_string()));
}

#[test]
fn missing_timestamp_rejects_the_document() {
    let document = json!({"source": {"ip": "203.0.113.9"}});
    assert!(event_from_hit(&mapper(), &hit("e-4", document)).is_err());
}

#[test]
fn malformed_optional_values_degrade_to_none() {
    let document = json!({
        "@timestamp": "2026-01-15T10:30:00Z",
        "source": {"ip": "not-an-ip", "port": 700000},
        "event": {"severity_label": "weird"},
        "threat": {"indicator": {"confidence": 400}}
    });
    let event = event_from_hit(&mapper(), &hit("e-5", document)).expect("parses");
    assert!(event.source_ip.is_none());
    assert!(event.source_port.is_none());
    assert!(event.severity.is_none());
    assert!(event.reputation_score.is_none());
    assert!(!event.raw.is_empty(), "raw payload is retained");
}
