// crates/shorewatch-campaign/src/anomaly/tests.rs
// ============================================================================
// Module: Anomaly Detection Tests
// Description: Unit tests for anomaly methods and component grouping.
// Purpose: Validate ordering properties under tunable thresholds.
// Dependencies: shorewatch-campaign
// ============================================================================

//! ## Overview
//! Exercises rate spikes, rare categories, source bursts, and ongoing
//! campaign grouping. Thresholds are tunable; assertions check ordering
//! properties, not absolute values.

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

use shorewatch_core::EventCategory;
use shorewatch_core::EventKind;
use shorewatch_core::SecurityEvent;
use time::OffsetDateTime;

use super::AnomalyMethod;
use super::detect_anomalies;
use super::detect_ongoing_campaigns;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds an event at a second offset with a source IP and category.
fn event(id: &str, ip: &str, category: EventCategory, offset_seconds: i64) -> SecurityEvent {
    event_with_asn(id, ip, category, offset_seconds, None)
}

/// Builds an event with an explicit ASN.
fn event_with_asn(
    id: &str,
    ip: &str,
    category: EventCategory,
    offset_seconds: i64,
    asn: Option<u32>,
) -> SecurityEvent {
    let base = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("base");
    SecurityEvent {
        id: id.to_string(),
        timestamp: base + time::Duration::seconds(offset_seconds),
        event_kind: EventKind::Scan,
        severity: None,
        category,
        source_ip: ip.parse().ok(),
        destination_ip: None,
        source_port: None,
        destination_port: Some(22),
        protocol: Some("tcp".to_string()),
        country: None,
        asn,
        organization: None,
        reputation_score: None,
        raw: BTreeMap::new(),
    }
}

// ============================================================================
// SECTION: Anomaly Tests
// ============================================================================

#[test]
fn rate_spikes_flag_the_hot_bucket() {
    let mut events = Vec::new();
    // Five quiet hours, then one hot hour.
    for hour in 0i64 .. 5 {
        for i in 0i64 .. 3 {
            events.push(event(
                &format!("q-{hour}-{i}"),
                "198.51.100.1",
                EventCategory::Network,
                hour * 3_600 + i,
            ));
        }
    }
    for i in 0i64 .. 80 {
        events.push(event(&format!("hot-{i}"), "198.51.100.1", EventCategory::Network, 5 * 3_600 + i));
    }
    let findings = detect_anomalies(&events, &[AnomalyMethod::RateSpike], 0.8);
    assert!(!findings.is_empty(), "the hot bucket must be flagged");
    assert_eq!(findings[0].method, AnomalyMethod::RateSpike);
    assert_eq!(findings[0].evidence_event_ids.len(), 80);
}

#[test]
fn higher_sensitivity_never_yields_fewer_findings() {
    let mut events = Vec::new();
    for hour in 0i64 .. 6 {
        let count = if hour == 5 { 40 } else { 5 };
        for i in 0i64 .. count {
            events.push(event(
                &format!("e-{hour}-{i}"),
                "198.51.100.1",
                EventCategory::Network,
                hour * 3_600 + i,
            ));
        }
    }
    let strict = detect_anomalies(&events, &AnomalyMethod::ALL, 0.1);
    let lenient = detect_anomalies(&events, &AnomalyMethod::ALL, 0.9);
    assert!(lenient.len() >= strict.len());
}

#[test]
fn rare_categories_are_flagged() {
    let mut events = Vec::new();
    for i in 0i64 .. 200 {
        events.push(event(&format!("n-{i}"), "198.51.100.1", EventCategory::Network, i));
    }
    events.push(event("rare", "198.51.100.1", EventCategory::Malware, 10));
    let findings = detect_anomalies(&events, &[AnomalyMethod::RareCategory], 0.9);
    assert!(findings.iter().any(|finding| finding.subject == "malware"));
}

#[test]
fn source_bursts_rank_by_rate() {
    let mut events = Vec::new();
    for i in 0i64 .. 30 {
        events.push(event(&format!("fast-{i}"), "203.0.113.9", EventCategory::Network, i));
    }
    for i in 0i64 .. 30 {
        events.push(event(&format!("slow-{i}"), "198.51.100.1", EventCategory::Network, i * 600));
    }
    let findings = detect_anomalies(&events, &[AnomalyMethod::NewSourceBurst], 0.9);
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].subject, "203.0.113.9", "faster burst ranks first");
}

// ============================================================================
// SECTION: Ongoing Campaign Tests
// ============================================================================

#[test]
fn subnet_peers_form_a_component() {
    let mut events = Vec::new();
    for i in 0i64 .. 6 {
        events.push(event(&format!("a-{i}"), "141.98.80.121", EventCategory::Network, i));
        events.push(event(&format!("b-{i}"), "141.98.80.122", EventCategory::Network, i));
    }
    events.push(event("lone", "8.8.8.8", EventCategory::Network, 0));
    let campaigns = detect_ongoing_campaigns(&events, 5, 0.5);
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].indicators.len(), 2);
    assert_eq!(campaigns[0].event_count, 12);
    assert!(campaigns[0].confidence >= 0.5);
}

#[test]
fn asn_peers_connect_across_subnets() {
    let mut events = Vec::new();
    for i in 0i64 .. 4 {
        events.push(event_with_asn(
            &format!("a-{i}"),
            "141.98.80.121",
            EventCategory::Network,
            i,
            Some(202_425),
        ));
        events.push(event_with_asn(
            &format!("b-{i}"),
            "185.220.101.5",
            EventCategory::Network,
            i,
            Some(202_425),
        ));
    }
    let campaigns = detect_ongoing_campaigns(&events, 5, 0.4);
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].indicators.len(), 2);
}

#[test]
fn thresholds_prune_small_and_weak_components() {
    let mut events = Vec::new();
    for i in 0i64 .. 3 {
        events.push(event(&format!("a-{i}"), "141.98.80.121", EventCategory::Network, i));
        events.push(event(&format!("b-{i}"), "141.98.80.122", EventCategory::Network, i));
    }
    assert!(detect_ongoing_campaigns(&events, 10, 0.5).is_empty(), "min_events prunes");
    assert!(detect_ongoing_campaigns(&events, 5, 0.9).is_empty(), "threshold prunes");
}
