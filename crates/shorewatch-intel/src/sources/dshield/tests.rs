// crates/shorewatch-intel/src/sources/dshield/tests.rs
// ============================================================================
// Module: DShield Adapter Tests
// Description: Unit tests for payload normalization.
// Purpose: Validate lenient parsing of DShield-style documents.
// Dependencies: shorewatch-intel
// ============================================================================

//! ## Overview
//! Exercises payload normalization with populated, empty, and malformed
//! documents.

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

use super::parse_payload;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn populated_payloads_carry_scores_and_attribution() {
    let payload = json!({
        "ip": {
            "number": "141.98.80.121",
            "count": 420,
            "attacks": 120,
            "mindate": "2025-11-02",
            "maxdate": "2026-01-14",
            "ascountry": "NL",
            "as": 202425,
            "threatfeeds": {"blocklistde": {}, "ciarmy": {}}
        }
    });
    let partial = parse_payload(&payload);
    let score = partial.threat_score.expect("score");
    assert!(score > 0.0 && score <= 100.0);
    assert_eq!(partial.country.as_deref(), Some("NL"));
    assert_eq!(partial.asn, Some(202_425));
    assert_eq!(partial.tags.len(), 2);
    let first = partial.first_seen.expect("first seen");
    let last = partial.last_seen.expect("last seen");
    assert!(first < last);
    assert!((partial.confidence - 0.8).abs() < f64::EPSILON);
}

#[test]
fn unknown_indicators_yield_low_confidence_empties() {
    let payload = json!({"ip": {"number": "203.0.113.1", "count": 0, "attacks": 0}});
    let partial = parse_payload(&payload);
    assert!(partial.threat_score.is_none());
    assert!(partial.confidence < 0.5);
    assert!(partial.tags.is_empty());
}

#[test]
fn scores_saturate_at_one_hundred() {
    let payload = json!({"ip": {"count": 5_000_000, "attacks": 5_000_000}});
    let partial = parse_payload(&payload);
    assert_eq!(partial.threat_score, Some(100.0));
}

#[test]
fn malformed_fields_degrade_to_none() {
    let payload = json!({
        "ip": {
            "count": "many",
            "mindate": "not-a-date",
            "as": "AS202425",
            "addresses": ["not-an-ip", "198.51.100.9"]
        }
    });
    let partial = parse_payload(&payload);
    assert!(partial.threat_score.is_none());
    assert!(partial.first_seen.is_none());
    assert!(partial.asn.is_none());
    assert_eq!(partial.resolved_ips.len(), 1);
    assert_eq!(partial.raw, payload);
}
