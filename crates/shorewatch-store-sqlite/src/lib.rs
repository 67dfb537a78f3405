// crates/shorewatch-store-sqlite/src/lib.rs
// ============================================================================
// Module: Shorewatch SQLite Cache Store
// Description: Durable key/value cache tier backed by SQLite WAL.
// Purpose: Persist intel cache entries across restarts, best-effort.
// Dependencies: rusqlite, serde_json, shorewatch-core, thiserror, time
// ============================================================================

//! ## Overview
//! This crate implements the persistent cache seam over `SQLite`. Each
//! cache domain lives in its own database file under `db/` with a
//! deterministic name. Mutations flow through a single writer thread
//! consuming a bounded queue: on overflow the oldest pending write is
//! dropped (the cache is best-effort by contract). Values are canonical
//! JSON; replacement is an upsert inside an explicit transaction under
//! WAL, which makes replace-per-key atomic. Readers open short-lived
//! read-only connections and only see unexpired rows.
//! Security posture: database contents are untrusted on read; values are
//! parsed as JSON and failures degrade to a miss.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteCacheConfig;
pub use store::SqliteCacheError;
pub use store::SqliteCacheStore;
