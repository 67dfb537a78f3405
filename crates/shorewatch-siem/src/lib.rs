// crates/shorewatch-siem/src/lib.rs
// ============================================================================
// Module: Shorewatch SIEM Layer
// Description: Elasticsearch-compatible query layer with smart pagination.
// Purpose: Build, optimize, and execute event queries and streams.
// Dependencies: async-trait, reqwest, serde, serde_json, sha2, shorewatch-core
// ============================================================================

//! ## Overview
//! The SIEM layer owns every interaction with the backing event store:
//! request construction through the field mapper, the result-size
//! optimization ladder, page- and cursor-based pagination with stable
//! sorting, chunked streaming with session-preserving boundaries, and the
//! performance metrics attached to every response. All outbound calls run
//! through the resilience substrate; request-construction failures never
//! consume a breaker credit.
//! Security posture: responses come from an external cluster and are
//! untrusted; parsing is lenient and never panics.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod executor;
pub mod optimize;
pub mod parse;
pub mod query;
pub mod stream;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::HttpSearchBackend;
pub use client::SearchBackend;
pub use client::SearchHit;
pub use client::SearchRequest;
pub use client::SearchResponse;
pub use executor::EventQueryService;
pub use executor::EventsPage;
pub use executor::QueryRequest;
pub use query::query_fingerprint;
pub use stream::SessionStreamRequest;
pub use stream::StreamChunk;
pub use stream::StreamRegistry;
