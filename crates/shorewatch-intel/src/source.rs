// crates/shorewatch-intel/src/source.rs
// ============================================================================
// Module: Intel Source Seam
// Description: Per-source lookup trait and the partial-result shape.
// Purpose: Decouple the aggregator from concrete source endpoints.
// Dependencies: async-trait, serde, serde_json, shorewatch-core, time
// ============================================================================

//! ## Overview
//! Every threat-intelligence source implements [`IntelSource`]: one lookup
//! per indicator returning the common [`PartialIntel`] shape or a typed
//! failure. Rate limiting and breaker accounting live in the aggregator;
//! sources only translate their endpoint's payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use shorewatch_core::IndicatorType;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Partial Result
// ============================================================================

/// Common partial result contributed by one source.
///
/// # Invariants
/// - `confidence` falls in `0..=1`; `threat_score` in `0..=100` when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialIntel {
    /// Threat score (0 benign .. 100 hostile), when reported.
    pub threat_score: Option<f64>,
    /// Source's own confidence in `0..=1`.
    pub confidence: f64,
    /// Earliest observation, when reported.
    #[serde(with = "time::serde::rfc3339::option")]
    pub first_seen: Option<OffsetDateTime>,
    /// Latest observation, when reported.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_seen: Option<OffsetDateTime>,
    /// Country attribution, when reported.
    pub country: Option<String>,
    /// Autonomous system attribution, when reported.
    pub asn: Option<u32>,
    /// Source tags.
    pub tags: Vec<String>,
    /// Resolved addresses (domain lookups).
    pub resolved_ips: Vec<IpAddr>,
    /// Raw source payload, kept verbatim for the response.
    pub raw: Value,
}

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Typed lookup failures reported by a source.
///
/// # Invariants
/// - Variants are stable for the aggregator's bookkeeping.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    /// The source (or the local limiter) rate limited the lookup.
    #[error("source rate limited")]
    RateLimited,
    /// The source endpoint failed or returned an unusable payload.
    #[error("source unavailable: {0}")]
    BackendUnavailable(String),
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// One threat-intelligence source endpoint.
#[async_trait]
pub trait IntelSource: Send + Sync {
    /// Returns the unique source name.
    fn name(&self) -> &str;

    /// Returns the declared trust weight in `0..=1`.
    fn trust_weight(&self) -> f64;

    /// Looks up one indicator.
    ///
    /// # Errors
    ///
    /// Returns [`SourceFailure`] when the endpoint rate limits or fails.
    async fn lookup(
        &self,
        indicator: &str,
        indicator_type: IndicatorType,
    ) -> Result<PartialIntel, SourceFailure>;
}
