// crates/shorewatch-intel/src/cache.rs
// ============================================================================
// Module: Intel Cache Tiers
// Description: In-memory LRU over a persistent key/value store.
// Purpose: Serve repeated lookups without touching sources.
// Dependencies: lru, serde_json, shorewatch-core, time
// ============================================================================

//! ## Overview
//! Cached intel lives in two tiers keyed by `(source, indicator)`: an LRU
//! with a short per-source TTL, and a persistent store with a longer TTL.
//! Memory hits return immediately; persistent hits are promoted into
//! memory. Writes go to memory synchronously and to the persistent tier
//! through its non-blocking write queue; the cache is best-effort and a
//! dropped write is not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;
use time::OffsetDateTime;

use crate::source::PartialIntel;

// ============================================================================
// SECTION: Persistent Seam
// ============================================================================

/// Cache domain for IP and domain intel entries.
pub const INTEL_CACHE_DOMAIN: &str = "intel";

pub use shorewatch_core::store::PersistentCacheStore;

// ============================================================================
// SECTION: Memory Tier
// ============================================================================

/// One memory-tier entry.
#[derive(Debug, Clone)]
struct MemoryEntry {
    /// Cached partial result.
    value: PartialIntel,
    /// Expiry instant (UTC).
    expires_at: OffsetDateTime,
}

/// Cache statistics for health reporting.
///
/// # Invariants
/// - Counters are monotone for the process lifetime.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    /// Memory-tier hits.
    pub memory_hits: u64,
    /// Persistent-tier hits.
    pub persistent_hits: u64,
    /// Complete misses.
    pub misses: u64,
}

/// Two-tier intel cache.
///
/// # Invariants
/// - Keys are `(source, indicator)` pairs; tiers never mix sources.
pub struct IntelCache {
    /// Guarded LRU memory tier.
    memory: Mutex<LruCache<String, MemoryEntry>>,
    /// Optional persistent tier.
    persistent: Option<Arc<dyn PersistentCacheStore>>,
    /// Guarded hit/miss counters.
    stats: Mutex<CacheStats>,
}

impl IntelCache {
    /// Creates a cache with the given memory capacity.
    #[must_use]
    pub fn new(capacity: usize, persistent: Option<Arc<dyn PersistentCacheStore>>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            memory: Mutex::new(LruCache::new(capacity)),
            persistent,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Builds the tier key for a source and indicator.
    #[must_use]
    pub fn key(source: &str, indicator: &str) -> String {
        format!("{source}:{indicator}")
    }

    /// Looks up a cached partial result.
    ///
    /// Memory expiry is enforced here; persistent expiry is enforced by the
    /// store. A persistent hit is promoted into memory with the memory TTL.
    #[must_use]
    pub fn get(&self, source: &str, indicator: &str, memory_ttl: Duration) -> Option<PartialIntel> {
        let key = Self::key(source, indicator);
        let now = OffsetDateTime::now_utc();
        if let Ok(mut memory) = self.memory.lock() {
            match memory.get(&key) {
                Some(entry) if entry.expires_at > now => {
                    self.bump(|stats| stats.memory_hits += 1);
                    return Some(entry.value.clone());
                }
                Some(_) => {
                    memory.pop(&key);
                }
                None => {}
            }
        }
        let persistent = self.persistent.as_ref()?;
        let value = persistent.get(INTEL_CACHE_DOMAIN, &key).ok().flatten()?;
        let Ok(partial) = serde_json::from_value::<PartialIntel>(value) else {
            self.bump(|stats| stats.misses += 1);
            return None;
        };
        self.bump(|stats| stats.persistent_hits += 1);
        self.insert_memory(&key, partial.clone(), memory_ttl, now);
        Some(partial)
    }

    /// Stores a partial result in both tiers.
    pub fn put(
        &self,
        source: &str,
        indicator: &str,
        value: &PartialIntel,
        memory_ttl: Duration,
        persistent_ttl: Duration,
    ) {
        let key = Self::key(source, indicator);
        self.insert_memory(&key, value.clone(), memory_ttl, OffsetDateTime::now_utc());
        if let Some(persistent) = &self.persistent
            && let Ok(serialized) = serde_json::to_value(value)
        {
            // Best-effort: a saturated write queue drops the entry.
            let _ = persistent.put(INTEL_CACHE_DOMAIN, &key, &serialized, persistent_ttl);
        }
    }

    /// Records a complete miss for statistics.
    pub fn record_miss(&self) {
        self.bump(|stats| stats.misses += 1);
    }

    /// Returns a snapshot of the hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().map(|stats| *stats).unwrap_or_default()
    }

    /// Inserts one memory-tier entry.
    fn insert_memory(
        &self,
        key: &str,
        value: PartialIntel,
        memory_ttl: Duration,
        now: OffsetDateTime,
    ) {
        if let Ok(mut memory) = self.memory.lock() {
            memory.put(
                key.to_string(),
                MemoryEntry {
                    value,
                    expires_at: now + time::Duration::seconds_f64(memory_ttl.as_secs_f64()),
                },
            );
        }
    }

    /// Applies a counter update under the stats lock.
    fn bump(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
