// crates/shorewatch-core/src/model/event/tests.rs
// ============================================================================
// Module: Security Event Tests
// Description: Unit tests for event parsing helpers and invariants.
// Purpose: Validate normalization of untrusted SIEM values.
// Dependencies: shorewatch-core
// ============================================================================

//! ## Overview
//! Exercises label normalization, lenient value parsing, and construction
//! invariants with malformed honeypot data.

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

use std::collections::BTreeMap;

use serde_json::json;
use time::OffsetDateTime;

use super::EventCategory;
use super::EventKind;
use super::SecurityEvent;
use super::Severity;
use super::parse_ip;
use super::parse_port;
use super::parse_timestamp;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns a minimal valid event for invariant tests.
fn sample_event() -> SecurityEvent {
    SecurityEvent {
        id: "evt-1".to_string(),
        timestamp: OffsetDateTime::UNIX_EPOCH,
        event_kind: EventKind::Connection,
        severity: Some(Severity::Low),
        category: EventCategory::Network,
        source_ip: "198.51.100.7".parse().ok(),
        destination_ip: None,
        source_port: Some(443),
        destination_port: None,
        protocol: Some("tcp".to_string()),
        country: None,
        asn: None,
        organization: None,
        reputation_score: Some(40),
        raw: BTreeMap::new(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn event_kind_normalizes_known_and_unknown_labels() {
    assert_eq!(EventKind::from_label("SSH_LOGIN"), EventKind::Authentication);
    assert_eq!(EventKind::from_label("portscan"), EventKind::Scan);
    assert_eq!(EventKind::from_label("zeek.capture_loss"), EventKind::Unknown);
}

#[test]
fn severity_rejects_unknown_labels() {
    assert_eq!(Severity::from_label("HIGH"), Some(Severity::High));
    assert_eq!(Severity::from_label("weird"), None);
    assert!(Severity::Low < Severity::Critical);
}

#[test]
fn parse_ip_tolerates_garbage() {
    assert!(parse_ip(&json!("203.0.113.9")).is_some());
    assert!(parse_ip(&json!("2001:db8::1")).is_some());
    assert!(parse_ip(&json!("not-an-ip")).is_none());
    assert!(parse_ip(&json!(42)).is_none());
}

#[test]
fn parse_port_enforces_range() {
    assert_eq!(parse_port(&json!(22)), Some(22));
    assert_eq!(parse_port(&json!("8080")), Some(8080));
    assert_eq!(parse_port(&json!(0)), None);
    assert_eq!(parse_port(&json!(70_000)), None);
}

#[test]
fn parse_timestamp_accepts_rfc3339_and_epoch_millis() {
    let from_text = parse_timestamp(&json!("2026-01-15T10:30:00Z")).expect("rfc3339");
    let from_millis =
        parse_timestamp(&json!(from_text.unix_timestamp() * 1_000)).expect("epoch millis");
    assert_eq!(from_text.unix_timestamp(), from_millis.unix_timestamp());
    assert!(parse_timestamp(&json!("yesterday")).is_none());
}

#[test]
fn validate_rejects_empty_id_and_zero_port() {
    let mut event = sample_event();
    assert!(event.validate().is_ok());
    event.id = String::new();
    assert!(event.validate().is_err());
    let mut event = sample_event();
    event.source_port = Some(0);
    assert!(event.validate().is_err());
    let mut event = sample_event();
    event.reputation_score = Some(101);
    assert!(event.validate().is_err());
}
