// crates/shorewatch-core/src/model/intel/tests.rs
// ============================================================================
// Module: Threat Intelligence Model Tests
// Description: Unit tests for indicator classification and bookkeeping.
// Purpose: Validate classification rules and the partition invariant.
// Dependencies: shorewatch-core
// ============================================================================

//! ## Overview
//! Exercises indicator classification and the source-partition invariant.

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

use super::IndicatorType;
use super::ThreatIntelResult;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns a valid two-of-three-sources result.
fn sample_result() -> ThreatIntelResult {
    ThreatIntelResult {
        indicator: "141.98.80.121".to_string(),
        indicator_type: IndicatorType::Ipv4,
        source_payloads: BTreeMap::new(),
        overall_threat_score: Some(82.0),
        confidence_score: 0.7,
        first_seen: None,
        last_seen: None,
        country: Some("NL".to_string()),
        asn: Some(202_425),
        tags: vec!["scanner".to_string()],
        sources_queried: vec!["dshield".to_string(), "mirror".to_string(), "local".to_string()],
        sources_succeeded: vec!["dshield".to_string(), "mirror".to_string()],
        sources_failed: vec!["local".to_string()],
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn classify_covers_each_indicator_type() {
    assert_eq!(IndicatorType::classify("203.0.113.9"), Some(IndicatorType::Ipv4));
    assert_eq!(IndicatorType::classify("2001:db8::2"), Some(IndicatorType::Ipv6));
    assert_eq!(IndicatorType::classify("evil.example.org"), Some(IndicatorType::Domain));
    assert_eq!(IndicatorType::classify("https://evil.example.org/p"), Some(IndicatorType::Url));
    assert_eq!(
        IndicatorType::classify("d41d8cd98f00b204e9800998ecf8427e"),
        Some(IndicatorType::Hash)
    );
    assert_eq!(IndicatorType::classify(""), None);
    assert_eq!(IndicatorType::classify("not an indicator"), None);
}

#[test]
fn validate_accepts_partitioned_bookkeeping() {
    assert!(sample_result().validate().is_ok());
}

#[test]
fn validate_rejects_unaccounted_sources() {
    let mut result = sample_result();
    result.sources_failed.clear();
    assert!(result.validate().is_err());

    let mut result = sample_result();
    result.sources_succeeded.push("phantom".to_string());
    assert!(result.validate().is_err());
}

#[test]
fn validate_rejects_out_of_range_scores() {
    let mut result = sample_result();
    result.confidence_score = 1.2;
    assert!(result.validate().is_err());

    let mut result = sample_result();
    result.overall_threat_score = Some(250.0);
    assert!(result.validate().is_err());
}
