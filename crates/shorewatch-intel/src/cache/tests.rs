// crates/shorewatch-intel/src/cache/tests.rs
// ============================================================================
// Module: Intel Cache Tests
// Description: Unit tests for tier lookup, promotion, and expiry.
// Purpose: Validate memory TTL, persistent promotion, and statistics.
// Dependencies: shorewatch-intel
// ============================================================================

//! ## Overview
//! Exercises the two-tier cache with an in-memory fake persistent store.

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

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use shorewatch_core::AnalyticError;

use super::IntelCache;
use super::PersistentCacheStore;
use crate::source::PartialIntel;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// In-memory fake of the persistent tier.
#[derive(Default)]
struct FakeStore {
    /// Stored values keyed by `domain/key`.
    rows: Mutex<HashMap<String, Value>>,
    /// Count of put calls for write-behind assertions.
    puts: Mutex<u64>,
}

impl PersistentCacheStore for FakeStore {
    fn get(&self, domain: &str, key: &str) -> Result<Option<Value>, AnalyticError> {
        Ok(self.rows.lock().expect("rows lock").get(&format!("{domain}/{key}")).cloned())
    }

    fn put(
        &self,
        domain: &str,
        key: &str,
        value: &Value,
        _ttl: Duration,
    ) -> Result<(), AnalyticError> {
        *self.puts.lock().expect("puts lock") += 1;
        self.rows.lock().expect("rows lock").insert(format!("{domain}/{key}"), value.clone());
        Ok(())
    }

    fn sweep_expired(&self) -> Result<u64, AnalyticError> {
        Ok(0)
    }
}

/// Returns a sample partial result.
fn partial(score: f64) -> PartialIntel {
    PartialIntel {
        threat_score: Some(score),
        confidence: 0.8,
        first_seen: None,
        last_seen: None,
        country: Some("NL".to_string()),
        asn: Some(202_425),
        tags: vec!["scanner".to_string()],
        resolved_ips: Vec::new(),
        raw: serde_json::json!({"count": 12}),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn memory_hits_serve_without_the_persistent_tier() {
    let store = Arc::new(FakeStore::default());
    let cache = IntelCache::new(16, Some(Arc::clone(&store) as Arc<dyn PersistentCacheStore>));
    cache.put("dshield", "141.98.80.121", &partial(80.0), Duration::from_secs(60), Duration::from_secs(600));
    let hit = cache.get("dshield", "141.98.80.121", Duration::from_secs(60)).expect("hit");
    assert_eq!(hit.threat_score, Some(80.0));
    let stats = cache.stats();
    assert_eq!(stats.memory_hits, 1);
    assert_eq!(stats.persistent_hits, 0);
}

#[test]
fn expired_memory_entries_fall_through_to_the_persistent_tier() {
    let store = Arc::new(FakeStore::default());
    let cache = IntelCache::new(16, Some(Arc::clone(&store) as Arc<dyn PersistentCacheStore>));
    cache.put("dshield", "141.98.80.121", &partial(80.0), Duration::ZERO, Duration::from_secs(600));
    std::thread::sleep(Duration::from_millis(5));
    let hit = cache.get("dshield", "141.98.80.121", Duration::from_secs(60)).expect("promoted");
    assert_eq!(hit.threat_score, Some(80.0));
    assert_eq!(cache.stats().persistent_hits, 1);

    // Promotion re-filled the memory tier.
    let again = cache.get("dshield", "141.98.80.121", Duration::from_secs(60)).expect("memory");
    assert_eq!(again.threat_score, Some(80.0));
    assert_eq!(cache.stats().memory_hits, 1);
}

#[test]
fn sources_never_share_entries() {
    let cache = IntelCache::new(16, None);
    cache.put("dshield", "141.98.80.121", &partial(80.0), Duration::from_secs(60), Duration::from_secs(600));
    assert!(cache.get("mirror", "141.98.80.121", Duration::from_secs(60)).is_none());
}

#[test]
fn writes_reach_the_persistent_queue() {
    let store = Arc::new(FakeStore::default());
    let cache = IntelCache::new(16, Some(Arc::clone(&store) as Arc<dyn PersistentCacheStore>));
    cache.put("dshield", "a", &partial(10.0), Duration::from_secs(60), Duration::from_secs(600));
    cache.put("dshield", "b", &partial(20.0), Duration::from_secs(60), Duration::from_secs(600));
    assert_eq!(*store.puts.lock().expect("puts lock"), 2);
}

#[test]
fn lru_capacity_evicts_oldest_entries() {
    let cache = IntelCache::new(2, None);
    for (index, indicator) in ["a", "b", "c"].iter().enumerate() {
        let score = 10.0 * (f64::from(u32::try_from(index).unwrap_or(0)) + 1.0);
        cache.put("dshield", indicator, &partial(score), Duration::from_secs(60), Duration::from_secs(600));
    }
    assert!(cache.get("dshield", "a", Duration::from_secs(60)).is_none(), "oldest evicted");
    assert!(cache.get("dshield", "c", Duration::from_secs(60)).is_some());
}
