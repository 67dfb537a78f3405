// crates/shorewatch-core/src/model/intel.rs
// ============================================================================
// Module: Threat Intelligence Model
// Description: Aggregated threat-intelligence result records.
// Purpose: Define the merged shapes the intel aggregator returns.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Threat-intelligence results aggregate per-source payloads for a single
//! indicator. Raw source payloads are kept verbatim under the source name;
//! the aggregated fields are the confidence-weighted merge the aggregator
//! computed. The bookkeeping invariant `succeeded + failed = queried` is
//! enforced at construction by [`ThreatIntelResult::validate`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::AnalyticError;

// ============================================================================
// SECTION: Indicator Type
// ============================================================================

/// Kind of indicator submitted for enrichment.
///
/// # Invariants
/// - Variants are stable for tool schemas and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorType {
    /// IPv4 address.
    Ipv4,
    /// IPv6 address.
    Ipv6,
    /// DNS domain name.
    Domain,
    /// Full URL.
    Url,
    /// File hash.
    Hash,
}

impl IndicatorType {
    /// Classifies a raw indicator string.
    ///
    /// IPs are detected syntactically; URLs by scheme; hashes by hex shape;
    /// anything else with a dot is treated as a domain.
    #[must_use]
    pub fn classify(indicator: &str) -> Option<Self> {
        if let Ok(ip) = indicator.parse::<IpAddr>() {
            return Some(match ip {
                IpAddr::V4(_) => Self::Ipv4,
                IpAddr::V6(_) => Self::Ipv6,
            });
        }
        if indicator.starts_with("http://") || indicator.starts_with("https://") {
            return Some(Self::Url);
        }
        let is_hex = !indicator.is_empty() && indicator.chars().all(|c| c.is_ascii_hexdigit());
        if is_hex && matches!(indicator.len(), 32 | 40 | 64) {
            return Some(Self::Hash);
        }
        if indicator.contains('.') && !indicator.contains('/') {
            return Some(Self::Domain);
        }
        None
    }
}

// ============================================================================
// SECTION: Aggregated Results
// ============================================================================

/// Aggregated threat intelligence for one IP indicator.
///
/// # Invariants
/// - `sources_succeeded` and `sources_failed` partition `sources_queried`.
/// - `overall_threat_score` falls in `0..=100`; `confidence_score` in
///   `0..=1` and grows with the number of succeeding sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIntelResult {
    /// The enriched indicator.
    pub indicator: String,
    /// Indicator classification.
    pub indicator_type: IndicatorType,
    /// Raw per-source payloads keyed by source name.
    pub source_payloads: BTreeMap<String, Value>,
    /// Merged threat score (0 benign .. 100 hostile).
    pub overall_threat_score: Option<f64>,
    /// Aggregation confidence in `0..=1`.
    pub confidence_score: f64,
    /// Earliest observation across sources.
    #[serde(with = "time::serde::rfc3339::option")]
    pub first_seen: Option<OffsetDateTime>,
    /// Latest observation across sources.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_seen: Option<OffsetDateTime>,
    /// Majority-vote country attribution.
    pub country: Option<String>,
    /// Majority-vote autonomous system attribution.
    pub asn: Option<u32>,
    /// Union of source tags.
    pub tags: Vec<String>,
    /// Sources queried for this result.
    pub sources_queried: Vec<String>,
    /// Sources that returned a payload.
    pub sources_succeeded: Vec<String>,
    /// Sources that failed or were rate limited.
    pub sources_failed: Vec<String>,
}

impl ThreatIntelResult {
    /// Validates the source-bookkeeping and score-range invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `Internal` when bookkeeping does
    /// not partition or a score leaves its range: these indicate an
    /// aggregator bug, not bad input.
    pub fn validate(&self) -> Result<(), AnalyticError> {
        let accounted = self.sources_succeeded.len() + self.sources_failed.len();
        if accounted != self.sources_queried.len() {
            return Err(AnalyticError::internal(
                "intel source bookkeeping does not partition queried sources",
            ));
        }
        for source in self.sources_succeeded.iter().chain(&self.sources_failed) {
            if !self.sources_queried.contains(source) {
                return Err(AnalyticError::internal(format!(
                    "intel source {source} reported but never queried"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(AnalyticError::internal("intel confidence score out of range"));
        }
        if let Some(score) = self.overall_threat_score
            && !(0.0..=100.0).contains(&score)
        {
            return Err(AnalyticError::internal("intel threat score out of range"));
        }
        Ok(())
    }
}

/// Aggregated threat intelligence for one domain indicator.
///
/// # Invariants
/// - Same bookkeeping invariants as [`ThreatIntelResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainIntelResult {
    /// The enriched domain.
    pub domain: String,
    /// Raw per-source payloads keyed by source name.
    pub source_payloads: BTreeMap<String, Value>,
    /// Merged threat score (0 benign .. 100 hostile).
    pub overall_threat_score: Option<f64>,
    /// Aggregation confidence in `0..=1`.
    pub confidence_score: f64,
    /// Resolved addresses reported by sources.
    pub resolved_ips: Vec<IpAddr>,
    /// Registrar attribution, when reported.
    pub registrar: Option<String>,
    /// Union of source tags.
    pub tags: Vec<String>,
    /// Sources queried for this result.
    pub sources_queried: Vec<String>,
    /// Sources that returned a payload.
    pub sources_succeeded: Vec<String>,
    /// Sources that failed or were rate limited.
    pub sources_failed: Vec<String>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
