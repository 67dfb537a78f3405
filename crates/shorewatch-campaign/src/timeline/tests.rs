// crates/shorewatch-campaign/src/timeline/tests.rs
// ============================================================================
// Module: Campaign Timeline Tests
// Description: Unit tests for bucket construction.
// Purpose: Validate bucket counts, gaps, and per-bucket summaries.
// Dependencies: shorewatch-campaign
// ============================================================================

//! ## Overview
//! Exercises timeline bucketing across granularities, including empty
//! buckets inside the span and restartability by reconstruction.

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

use shorewatch_core::CampaignEvent;
use shorewatch_core::EventCategory;
use shorewatch_core::EventKind;
use shorewatch_core::EventRole;
use shorewatch_core::SecurityEvent;
use time::OffsetDateTime;

use super::TimelineGranularity;
use super::build_timeline;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a campaign event at an hour offset from a fixed base.
fn member(id: &str, kind: EventKind, hour_offset: i64) -> CampaignEvent {
    let base = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("base");
    CampaignEvent {
        event: SecurityEvent {
            id: id.to_string(),
            timestamp: base + time::Duration::hours(hour_offset),
            event_kind: kind,
            severity: None,
            category: EventCategory::Network,
            source_ip: "198.51.100.7".parse().ok(),
            destination_ip: None,
            source_port: None,
            destination_port: Some(22),
            protocol: Some("tcp".to_string()),
            country: None,
            asn: None,
            organization: None,
            reputation_score: None,
            raw: BTreeMap::new(),
        },
        confidence: 0.8,
        time_proximity_score: 1.0,
        role: EventRole::Seed,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn bucket_count_matches_the_span() {
    // Events at hours 0, 1, and 71: a 72-hour span yields 72 hourly
    // buckets.
    let events = vec![
        member("a", EventKind::Scan, 0),
        member("b", EventKind::Scan, 1),
        member("c", EventKind::Exploit, 71),
    ];
    let buckets = build_timeline(&events, TimelineGranularity::Hourly);
    assert_eq!(buckets.len(), 72);
    assert_eq!(buckets.first().map(|bucket| bucket.event_count), Some(1));
    assert_eq!(buckets.last().map(|bucket| bucket.event_count), Some(1));
}

#[test]
fn gaps_inside_the_span_are_visible() {
    let events = vec![member("a", EventKind::Scan, 0), member("b", EventKind::Scan, 2)];
    let buckets = build_timeline(&events, TimelineGranularity::Hourly);
    assert_eq!(buckets.len(), 3);
    assert_eq!(buckets[1].event_count, 0);
    assert!(buckets[1].top_event_kinds.is_empty());
}

#[test]
fn top_kinds_rank_by_frequency() {
    let events = vec![
        member("a", EventKind::Scan, 0),
        member("b", EventKind::Scan, 0),
        member("c", EventKind::Exploit, 0),
    ];
    let buckets = build_timeline(&events, TimelineGranularity::Hourly);
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].top_event_kinds.first().map(String::as_str), Some("scan"));
    assert_eq!(buckets[0].sample_event_ids.len(), 3);
}

#[test]
fn daily_granularity_collapses_hours() {
    let events = vec![
        member("a", EventKind::Scan, 0),
        member("b", EventKind::Scan, 5),
        member("c", EventKind::Scan, 30),
    ];
    let buckets = build_timeline(&events, TimelineGranularity::Daily);
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].event_count, 2);
}

#[test]
fn rebuilding_restarts_the_sequence() {
    let events = vec![member("a", EventKind::Scan, 0)];
    let first = build_timeline(&events, TimelineGranularity::Minute);
    let second = build_timeline(&events, TimelineGranularity::Minute);
    assert_eq!(first, second);
}

#[test]
fn empty_input_yields_no_buckets() {
    assert!(build_timeline(&[], TimelineGranularity::Hourly).is_empty());
}
