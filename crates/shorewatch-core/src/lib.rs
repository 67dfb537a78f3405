// crates/shorewatch-core/src/lib.rs
// ============================================================================
// Module: Shorewatch Core
// Description: Data model, field mapping, cursors, and resilience substrate.
// Purpose: Provide the shared analytic types every Shorewatch crate builds on.
// Dependencies: base64, rand, serde, serde_json, sha2, thiserror, time, tokio
// ============================================================================

//! ## Overview
//! Shorewatch core defines the canonical security-event model, the error
//! taxonomy shared across the workspace, the SIEM field mapper, opaque
//! pagination cursors, the data dictionary, and the resilience substrate
//! (circuit breakers, retry, timeout envelopes, error aggregation).
//! Everything here is backend-agnostic: no crate in the workspace talks to
//! Elasticsearch or a threat-intel endpoint through anything but the seams
//! declared in this crate.
//! Security posture: SIEM documents and tool arguments are untrusted input
//! and must be validated before use.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cursor;
pub mod dictionary;
pub mod error;
pub mod fields;
pub mod log;
pub mod model;
pub mod resilience;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cursor::CursorError;
pub use cursor::PaginationCursor;
pub use error::AnalyticError;
pub use error::ErrorKind;
pub use fields::FieldMapError;
pub use fields::FieldMapper;
pub use log::EventSink;
pub use log::NoopSink;
pub use log::StructuredEvent;
pub use model::campaign::Campaign;
pub use model::campaign::CampaignConfidence;
pub use model::campaign::CampaignEvent;
pub use model::campaign::CorrelationMethod;
pub use model::campaign::EventRole;
pub use model::campaign::IndicatorRelationship;
pub use model::campaign::RelationKind;
pub use model::event::EventCategory;
pub use model::event::EventKind;
pub use model::event::SecurityEvent;
pub use model::event::Severity;
pub use model::intel::DomainIntelResult;
pub use model::intel::IndicatorType;
pub use model::intel::ThreatIntelResult;
pub use model::query::FallbackStrategy;
pub use model::query::FilterOperator;
pub use model::query::FilterValue;
pub use model::query::OptimizationLevel;
pub use model::query::OptimizationStep;
pub use model::query::PaginationMeta;
pub use model::query::QueryComplexity;
pub use model::query::QueryFilter;
pub use model::query::QueryPerfMetrics;
pub use model::query::SortOrder;
pub use model::query::TimeRange;
pub use resilience::aggregator::ErrorAggregator;
pub use resilience::breaker::BreakerRegistry;
pub use resilience::breaker::CircuitBreaker;
pub use resilience::breaker::CircuitBreakerConfig;
pub use resilience::breaker::CircuitState;
pub use resilience::retry::RetryPolicy;
pub use resilience::retry::retry_with_policy;
pub use resilience::timeout::TimeoutClass;
pub use resilience::timeout::TimeoutEnvelope;
pub use resilience::timeout::with_deadline;
pub use store::PersistentCacheStore;
