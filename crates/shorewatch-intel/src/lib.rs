// crates/shorewatch-intel/src/lib.rs
// ============================================================================
// Module: Shorewatch Threat Intelligence
// Description: Multi-source enrichment with rate limits and tiered caching.
// Purpose: Fan out indicator lookups and merge results by source trust.
// Dependencies: async-trait, lru, reqwest, serde, shorewatch-core, tokio
// ============================================================================

//! ## Overview
//! The intel crate aggregates threat intelligence across configured HTTP
//! sources. Each source carries its own rate limiter, circuit breaker,
//! declared trust weight, and cache TTLs. Lookups fan out concurrently
//! under a semaphore cap, partial results merge with trust-weighted rules,
//! and results land in a two-tier cache: an in-memory LRU and a persistent
//! key/value store written behind a bounded channel.
//! Security posture: source payloads are untrusted JSON and are parsed
//! leniently.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod aggregator;
pub mod cache;
pub mod ratelimit;
pub mod source;
pub mod sources;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aggregator::ThreatIntelAggregator;
pub use cache::IntelCache;
pub use cache::PersistentCacheStore;
pub use ratelimit::TokenBucket;
pub use source::IntelSource;
pub use source::PartialIntel;
pub use source::SourceFailure;
pub use sources::dshield::DshieldHttpSource;
