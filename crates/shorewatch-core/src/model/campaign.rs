// crates/shorewatch-core/src/model/campaign.rs
// ============================================================================
// Module: Campaign Model
// Description: Campaign aggregates and indicator relationship records.
// Purpose: Define the correlation engine's output shapes and invariants.
// Dependencies: serde, sha2, time
// ============================================================================

//! ## Overview
//! A [`Campaign`] is the aggregate produced by multi-stage correlation: a
//! stable identifier, a confidence score with its derived enum, the time
//! window, the indicator sets, and the time-ordered member events. Campaign
//! events wrap a [`SecurityEvent`](crate::model::event::SecurityEvent) with
//! correlation metadata and live no longer than one analysis.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use time::OffsetDateTime;

use crate::model::event::SecurityEvent;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Correlation method applied during campaign analysis.
///
/// # Invariants
/// - Variants are stable for tool schemas and per-event method scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Exact source/destination IP match.
    IpExact,
    /// Shared subnet (configurable mask, default /24).
    IpSubnet,
    /// Shared autonomous system.
    IpAsn,
    /// Shared infrastructure indicator (domain, user agent, fingerprint).
    SharedInfrastructure,
    /// Behavioral sequence similarity.
    BehavioralMatch,
    /// Temporal clustering.
    TemporalCluster,
    /// Geospatial proximity.
    Geospatial,
}

impl CorrelationMethod {
    /// Returns a stable label for the method.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IpExact => "ip_exact",
            Self::IpSubnet => "ip_subnet",
            Self::IpAsn => "ip_asn",
            Self::SharedInfrastructure => "shared_infrastructure",
            Self::BehavioralMatch => "behavioral_match",
            Self::TemporalCluster => "temporal_cluster",
            Self::Geospatial => "geospatial",
        }
    }
}

/// Role an event plays inside a campaign.
///
/// # Invariants
/// - Variants are stable for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRole {
    /// Retrieved directly from a seed indicator.
    Seed,
    /// Added by a correlation stage.
    Correlated,
    /// Added by indicator expansion.
    Expanded,
}

/// Campaign confidence band derived from the confidence score.
///
/// # Invariants
/// - Ordering follows escalation; thresholds live in
///   [`CampaignConfidence::from_score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignConfidence {
    /// Score below 0.5.
    Low,
    /// Score in [0.5, 0.75).
    Medium,
    /// Score in [0.75, 0.9).
    High,
    /// Score at or above 0.9.
    Critical,
}

impl CampaignConfidence {
    /// Derives the confidence band from a score in `0..=1`.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::Critical
        } else if score >= 0.75 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Kind of relationship between two indicators.
///
/// # Invariants
/// - Variants are stable for expansion strategies and tool schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Same subnet.
    SameSubnet,
    /// Same autonomous system.
    SameAsn,
    /// Shared infrastructure indicator.
    SharedInfrastructure,
    /// Temporal clustering.
    TemporalCluster,
    /// Behavioral similarity.
    BehavioralMatch,
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Event enriched with campaign-correlation metadata.
///
/// # Invariants
/// - `confidence` falls in `0..=1`.
/// - The record's lifetime is bounded by one campaign analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignEvent {
    /// Underlying normalized event.
    pub event: SecurityEvent,
    /// Correlation confidence in `0..=1`.
    pub confidence: f64,
    /// Temporal proximity score in `0..=1`.
    pub time_proximity_score: f64,
    /// Role inside the campaign.
    pub role: EventRole,
}

/// Directed relationship between two indicators.
///
/// # Invariants
/// - `confidence` falls in `0..=1`.
/// - `evidence_event_ids` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRelationship {
    /// Source indicator.
    pub source_indicator: String,
    /// Related indicator.
    pub related_indicator: String,
    /// Relationship kind.
    pub relation_kind: RelationKind,
    /// Relationship confidence in `0..=1`.
    pub confidence: f64,
    /// Event identifiers supporting the relationship.
    pub evidence_event_ids: Vec<String>,
}

/// Campaign aggregate produced by the correlation engine.
///
/// # Invariants
/// - `start_time <= end_time` and every member event falls inside the
///   window (within the engine's tolerance).
/// - At least one seed indicator is present.
/// - `confidence` matches [`CampaignConfidence::from_score`] applied to
///   `confidence_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Stable campaign identifier.
    pub campaign_id: String,
    /// Confidence band.
    pub confidence: CampaignConfidence,
    /// Confidence score in `0..=1`.
    pub confidence_score: f64,
    /// Campaign window start (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// Campaign window end (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    /// Indicators supplied by the analyst.
    pub seed_indicators: BTreeSet<String>,
    /// Indicators related to the campaign (includes seeds once events exist).
    pub related_indicators: BTreeSet<String>,
    /// Member events ordered by timestamp.
    pub events: Vec<CampaignEvent>,
    /// Correlation methods that contributed events.
    pub correlation_methods_used: BTreeSet<CorrelationMethod>,
    /// Observed attack vectors.
    pub attack_vectors: BTreeSet<String>,
    /// Suspected actor, when attribution exists.
    pub suspected_actor: Option<String>,
    /// Sophistication score in `0..=1`.
    pub sophistication_score: f64,
}

/// Computes the stable campaign identifier for a seed set and window.
///
/// The window is rounded to whole hours so that repeated analyses over the
/// same nominal window produce the same identifier.
#[must_use]
pub fn campaign_id(seeds: &BTreeSet<String>, start: OffsetDateTime, end: OffsetDateTime) -> String {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed.as_bytes());
        hasher.update([0u8]);
    }
    let start_hours = start.unix_timestamp().div_euclid(3_600);
    let end_hours = end.unix_timestamp().div_euclid(3_600);
    hasher.update(start_hours.to_be_bytes());
    hasher.update(end_hours.to_be_bytes());
    let digest = hasher.finalize();
    let mut id = String::with_capacity(25);
    id.push_str("cmp-");
    for byte in digest.iter().take(10) {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}

// ============================================================================
// SECTION: Tests
// ============================================================================
