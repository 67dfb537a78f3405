// crates/shorewatch-core/src/store.rs
// ============================================================================
// Module: Persistent Cache Seam
// Description: Backend-agnostic key/value cache interface.
// Purpose: Define the persistent tier contract implemented by stores.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The persistent cache is a best-effort key/value store with per-entry
//! TTLs, grouped into named domains (one file per domain on disk). Reads
//! return only unexpired values; writes are queued and never block on the
//! disk. Implementations must replace values atomically per key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;

use crate::error::AnalyticError;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Backend-agnostic persistent key/value cache.
pub trait PersistentCacheStore: Send + Sync {
    /// Loads an unexpired value.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] when the store is unreadable.
    fn get(&self, domain: &str, key: &str) -> Result<Option<Value>, AnalyticError>;

    /// Queues a value write with a TTL; never blocks on the disk.
    ///
    /// A saturated write queue drops the oldest pending write; the cache is
    /// best-effort by contract.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] when the write queue has shut down.
    fn put(
        &self,
        domain: &str,
        key: &str,
        value: &Value,
        ttl: Duration,
    ) -> Result<(), AnalyticError>;

    /// Removes expired rows, returning the count removed.
    ///
    /// Called once at startup.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] when the sweep fails.
    fn sweep_expired(&self) -> Result<u64, AnalyticError>;

    /// Reports store readiness for health checks.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), AnalyticError> {
        Ok(())
    }
}
