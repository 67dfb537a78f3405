// crates/shorewatch-mcp/src/health.rs
// ============================================================================
// Module: Health Snapshot
// Description: Dependency, breaker, and cache health reporting.
// Purpose: Back the health-status tool without spending backend credits.
// Dependencies: serde, shorewatch-core
// ============================================================================

//! ## Overview
//! The health snapshot is assembled from already-known state: the feature
//! manager's capability flags, breaker snapshots, and cache counters.
//! Serving it never issues a backend call, so health polling cannot
//! consume breaker credits or rate-limit tokens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use shorewatch_core::resilience::breaker::BreakerSnapshot;

use crate::features::FeatureSnapshot;

// ============================================================================
// SECTION: Shape
// ============================================================================

/// Cache counters surfaced in health output.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheHealth {
    /// Memory-tier hits.
    pub memory_hits: u64,
    /// Persistent-tier hits.
    pub persistent_hits: u64,
    /// Complete misses.
    pub misses: u64,
}

/// One health-status response.
///
/// # Invariants
/// - `healthy` is true exactly when every feature flag is set.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall health flag.
    pub healthy: bool,
    /// Capability flags.
    pub features: FeatureSnapshot,
    /// Per-service breaker snapshots.
    pub breakers: Vec<BreakerSnapshot>,
    /// Intel cache counters.
    pub cache: CacheHealth,
}

impl HealthStatus {
    /// Assembles a health status from component snapshots.
    #[must_use]
    pub fn assemble(
        features: FeatureSnapshot,
        breakers: Vec<BreakerSnapshot>,
        cache: CacheHealth,
    ) -> Self {
        Self {
            healthy: features.elasticsearch && features.threat_intel && features.persistent_cache,
            features,
            breakers,
            cache,
        }
    }
}
