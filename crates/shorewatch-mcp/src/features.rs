// crates/shorewatch-mcp/src/features.rs
// ============================================================================
// Module: Feature Manager
// Description: Health-driven capability flags with atomic snapshots.
// Purpose: Gate tool availability on external dependency health.
// Dependencies: shorewatch-contract
// ============================================================================

//! ## Overview
//! One boolean per capability, packed into an atomic bitmask. Health
//! checks update the whole snapshot in a single store; gating reads are
//! lock-free. The manager is constructed at startup with everything
//! unhealthy and flips as checks complete.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use serde::Serialize;
use shorewatch_contract::FeatureId;

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable capability snapshot.
///
/// # Invariants
/// - One flag per [`FeatureId`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct FeatureSnapshot {
    /// Backing SIEM reachable and healthy.
    pub elasticsearch: bool,
    /// At least one threat-intelligence source available.
    pub threat_intel: bool,
    /// Persistent cache writable.
    pub persistent_cache: bool,
}

impl FeatureSnapshot {
    /// Returns the flag for one feature.
    #[must_use]
    pub const fn get(&self, feature: FeatureId) -> bool {
        match feature {
            FeatureId::Elasticsearch => self.elasticsearch,
            FeatureId::ThreatIntel => self.threat_intel,
            FeatureId::PersistentCache => self.persistent_cache,
        }
    }

    /// Packs the snapshot into a bitmask.
    const fn pack(self) -> u8 {
        (self.elasticsearch as u8)
            | ((self.threat_intel as u8) << 1)
            | ((self.persistent_cache as u8) << 2)
    }

    /// Unpacks a bitmask into a snapshot.
    const fn unpack(bits: u8) -> Self {
        Self {
            elasticsearch: bits & 1 != 0,
            threat_intel: bits & 2 != 0,
            persistent_cache: bits & 4 != 0,
        }
    }
}

// ============================================================================
// SECTION: Manager
// ============================================================================

/// Health-driven feature manager.
///
/// # Invariants
/// - Snapshot replacement is a single atomic store.
#[derive(Debug, Default)]
pub struct FeatureManager {
    /// Packed current snapshot.
    bits: AtomicU8,
}

impl FeatureManager {
    /// Creates a manager with every feature unhealthy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot atomically.
    pub fn update(&self, snapshot: FeatureSnapshot) {
        self.bits.store(snapshot.pack(), Ordering::Release);
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FeatureSnapshot {
        FeatureSnapshot::unpack(self.bits.load(Ordering::Acquire))
    }

    /// Returns the unavailable features from a required set.
    #[must_use]
    pub fn missing(&self, required: &[FeatureId]) -> Vec<FeatureId> {
        let snapshot = self.snapshot();
        required.iter().copied().filter(|feature| !snapshot.get(*feature)).collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
