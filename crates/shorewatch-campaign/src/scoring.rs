// crates/shorewatch-campaign/src/scoring.rs
// ============================================================================
// Module: Campaign Scoring
// Description: Sophistication heuristic over a completed campaign.
// Purpose: Score campaigns on infrastructure breadth and persistence.
// Dependencies: shorewatch-core
// ============================================================================

//! ## Overview
//! Sophistication combines four normalized components: the number of
//! distinct autonomous systems, the number of distinct attack vectors, the
//! campaign duration, and the presence of multi-stage behavioral
//! signatures (behavioral plus infrastructure correlation both firing).
//! Component weights are equal; the result lands in `0..=1`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use shorewatch_core::Campaign;
use shorewatch_core::CorrelationMethod;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Distinct-ASN count at which the component saturates.
const ASN_SATURATION: f64 = 5.0;
/// Attack-vector count at which the component saturates.
const VECTOR_SATURATION: f64 = 4.0;
/// Duration (hours) at which the component saturates.
const DURATION_SATURATION_HOURS: f64 = 72.0;

// ============================================================================
// SECTION: Scoring
// ============================================================================

/// Scores campaign sophistication in `0..=1`.
#[must_use]
pub fn score_campaign(campaign: &Campaign) -> f64 {
    let asns: BTreeSet<u32> =
        campaign.events.iter().filter_map(|member| member.event.asn).collect();
    let asn_component = (to_f64(asns.len()) / ASN_SATURATION).min(1.0);

    let vector_component = (to_f64(campaign.attack_vectors.len()) / VECTOR_SATURATION).min(1.0);

    let duration_hours =
        (campaign.end_time - campaign.start_time).whole_seconds().max(0);
    let duration_component =
        (to_f64_i64(duration_hours) / 3_600.0 / DURATION_SATURATION_HOURS).min(1.0);

    let behavioral = campaign
        .correlation_methods_used
        .contains(&CorrelationMethod::BehavioralMatch);
    let infrastructure = campaign
        .correlation_methods_used
        .contains(&CorrelationMethod::SharedInfrastructure);
    let staged_component = match (behavioral, infrastructure) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.5,
        (false, false) => 0.0,
    };

    (asn_component + vector_component + duration_component + staged_component) / 4.0
}

/// Converts a collection length to f64.
fn to_f64(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::MAX, f64::from)
}

/// Converts a non-negative i64 to f64.
fn to_f64_i64(value: i64) -> f64 {
    u32::try_from(value.min(i64::from(u32::MAX))).map_or(f64::MAX, f64::from)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
