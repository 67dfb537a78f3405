// crates/shorewatch-siem/src/stream/tests.rs
// ============================================================================
// Module: Event Streaming Tests
// Description: Unit tests for sessionization, packing, and resumption.
// Purpose: Validate session-preserving chunking and the stream registry.
// Dependencies: shorewatch-siem, tokio
// ============================================================================

//! ## Overview
//! Exercises session grouping and chunk packing with interleaved fixtures,
//! lazy page iteration over an in-memory backend, and TTL-bounded stream
//! resumption.

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

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use shorewatch_config::ElasticConfig;
use shorewatch_core::AnalyticError;
use shorewatch_core::CircuitBreaker;
use shorewatch_core::CircuitBreakerConfig;
use shorewatch_core::ErrorKind;
use shorewatch_core::EventCategory;
use shorewatch_core::EventKind;
use shorewatch_core::FallbackStrategy;
use shorewatch_core::FieldMapper;
use shorewatch_core::OptimizationLevel;
use shorewatch_core::RetryPolicy;
use shorewatch_core::SecurityEvent;
use shorewatch_core::SortOrder;
use shorewatch_core::TimeRange;
use shorewatch_core::TimeoutEnvelope;
use shorewatch_core::log::NoopSink;
use time::OffsetDateTime;

use super::EventStream;
use super::SessionStream;
use super::SessionStreamRequest;
use super::StreamRegistry;
use super::pack_sessions;
use super::sessionize;
use crate::client::SearchBackend;
use crate::client::SearchHit;
use crate::client::SearchRequest;
use crate::client::SearchResponse;
use crate::executor::EventQueryService;
use crate::executor::QueryRequest;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Base instant for fixture events.
fn base_time() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("base instant")
}

/// Builds a fixture event at an offset in seconds.
fn event(id: &str, source_ip: &str, offset_seconds: i64) -> SecurityEvent {
    SecurityEvent {
        id: id.to_string(),
        timestamp: base_time() + time::Duration::seconds(offset_seconds),
        event_kind: EventKind::Connection,
        severity: None,
        category: EventCategory::Network,
        source_ip: source_ip.parse().ok(),
        destination_ip: "10.0.0.5".parse().ok(),
        source_port: Some(40_000),
        destination_port: Some(22),
        protocol: Some("tcp".to_string()),
        country: None,
        asn: None,
        organization: None,
        reputation_score: None,
        raw: BTreeMap::new(),
    }
}

/// Default session key fields for tests.
fn key_fields() -> Vec<String> {
    vec!["source_ip".to_string(), "destination_ip".to_string()]
}

// ============================================================================
// SECTION: Sessionization Tests
// ============================================================================

#[test]
fn sessionize_groups_by_key_and_splits_on_gap() {
    let mut events = Vec::new();
    // Session 1: three events a minute apart.
    for i in 0 .. 3 {
        events.push(event(&format!("a-{i}"), "198.51.100.1", i * 60));
    }
    // Session 2 (same key): resumes after a two-hour gap.
    events.push(event("a-late", "198.51.100.1", 2 * 3_600 + 180));
    // Session 3: different key, interleaved in time.
    events.push(event("b-0", "203.0.113.9", 30));

    let sessions = sessionize(events, &key_fields(), Duration::from_secs(30 * 60));
    assert_eq!(sessions.len(), 3);
    let sizes: Vec<usize> = sessions.iter().map(|session| session.events.len()).collect();
    assert!(sizes.contains(&3));
    assert_eq!(sizes.iter().sum::<usize>(), 5);
}

#[test]
fn interleaved_sessions_never_share_a_chunk() {
    // Session A: 400 events over 10 minutes; session B: 200 events over 5
    // minutes, interleaved in time. chunk_size 500.
    let mut events = Vec::new();
    for i in 0i64 .. 400 {
        events.push(event(&format!("a-{i:03}"), "198.51.100.1", i * 600 / 400));
    }
    for i in 0i64 .. 200 {
        events.push(event(&format!("b-{i:03}"), "203.0.113.9", i * 300 / 200));
    }
    let sessions = sessionize(events, &key_fields(), Duration::from_secs(30 * 60));
    assert_eq!(sessions.len(), 2);
    let chunks = pack_sessions(sessions, 500);
    assert_eq!(chunks.len(), 2);

    let chunk_keys: Vec<BTreeSet<&str>> = chunks
        .iter()
        .map(|chunk| chunk.iter().map(|entry| entry.session_key.as_str()).collect())
        .collect();
    for keys in &chunk_keys {
        assert_eq!(keys.len(), 1, "each chunk holds exactly one session");
    }
    let lens: Vec<usize> = chunks.iter().map(Vec::len).collect();
    assert!(lens.contains(&400));
    assert!(lens.contains(&200));
}

#[test]
fn small_sessions_pack_together_and_oversized_sessions_stand_alone() {
    let mut events = Vec::new();
    for i in 0i64 .. 40 {
        events.push(event(&format!("a-{i}"), "198.51.100.1", i));
    }
    for i in 0i64 .. 40 {
        events.push(event(&format!("b-{i}"), "203.0.113.9", 100 + i));
    }
    for i in 0i64 .. 700 {
        events.push(event(&format!("c-{i}"), "192.0.2.7", 200 + i));
    }
    let sessions = sessionize(events, &key_fields(), Duration::from_secs(3_600));
    let chunks = pack_sessions(sessions, 500);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].len(), 80, "two small sessions share a chunk");
    assert_eq!(chunks[1].len(), 700, "oversized session stretches its own chunk");
}

#[test]
fn session_metadata_is_attached_to_every_event() {
    let events = vec![
        event("a-0", "198.51.100.1", 0),
        event("a-1", "198.51.100.1", 120),
    ];
    let sessions = sessionize(events, &key_fields(), Duration::from_secs(3_600));
    let chunks = pack_sessions(sessions, 10);
    let chunk = chunks.first().expect("one chunk");
    for entry in chunk {
        assert_eq!(entry.session_event_count, 2);
        assert_eq!(entry.session_duration_seconds, 120);
        assert!(entry.session_key.contains("198.51.100.1"));
    }
}

// ============================================================================
// SECTION: Stream Backend Fixture
// ============================================================================

/// In-memory backend serving fixed ids one second apart (desc order).
struct PagedBackend {
    /// Number of fixture documents.
    count: usize,
}

impl PagedBackend {
    /// Renders the fixture sorted desc with an id-asc tiebreak.
    fn sorted(&self) -> Vec<(String, i64)> {
        let base: i64 = 1_700_000_000_000;
        let mut docs: Vec<(String, i64)> = (0 .. self.count)
            .map(|i| (format!("doc-{i:04}"), base + i64::try_from(i).unwrap_or(0) * 1_000))
            .collect();
        docs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        docs
    }
}

#[async_trait]
impl SearchBackend for PagedBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, AnalyticError> {
        let size = request
            .body
            .get("size")
            .and_then(Value::as_u64)
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or(10);
        let sorted = self.sorted();
        let window: Vec<(String, i64)> =
            if let Some(after) = request.body.get("search_after").and_then(Value::as_array) {
                let after_millis = after.first().and_then(Value::as_i64).unwrap_or(i64::MAX);
                let after_id = after.get(1).and_then(Value::as_str).unwrap_or("");
                sorted
                    .into_iter()
                    .filter(|(id, millis)| {
                        *millis < after_millis
                            || (*millis == after_millis && id.as_str() > after_id)
                    })
                    .take(size)
                    .collect()
            } else {
                let from = request
                    .body
                    .get("from")
                    .and_then(Value::as_u64)
                    .and_then(|value| usize::try_from(value).ok())
                    .unwrap_or(0);
                sorted.into_iter().skip(from).take(size).collect()
            };
        let hits = window
            .into_iter()
            .map(|(id, millis)| {
                let at = OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                    .expect("instant");
                let rendered = at
                    .format(&time::format_description::well_known::Rfc3339)
                    .expect("rfc3339");
                SearchHit {
                    id: id.clone(),
                    source: json!({"@timestamp": rendered, "source": {"ip": "198.51.100.7"}}),
                    sort: vec![json!(millis), json!(id)],
                }
            })
            .collect();
        Ok(SearchResponse {
            total: u64::try_from(self.count).unwrap_or(0),
            hits,
            aggregations: None,
            took_ms: 1,
            shards_scanned: 1,
        })
    }

    async fn count(&self, _request: &SearchRequest) -> Result<u64, AnalyticError> {
        Ok(u64::try_from(self.count).unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), AnalyticError> {
        Ok(())
    }
}

/// Builds a query service over the paged backend.
fn paged_service(count: usize) -> EventQueryService {
    let mut config = ElasticConfig::default();
    config.avg_document_bytes = 64;
    EventQueryService::new(
        Arc::new(PagedBackend {
            count,
        }),
        FieldMapper::new(Arc::new(NoopSink)),
        config,
        Arc::new(CircuitBreaker::new("elasticsearch", CircuitBreakerConfig::default())),
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            factor: 2.0,
            max_delay: Duration::from_millis(5),
            jitter: 0.0,
        },
        TimeoutEnvelope::default(),
    )
}

/// Returns a stream query request with the given page size.
fn stream_request(page_size: u32) -> QueryRequest {
    let start = OffsetDateTime::from_unix_timestamp(1_699_999_000).expect("start");
    let end = OffsetDateTime::from_unix_timestamp(1_700_100_000).expect("end");
    QueryRequest {
        time_range: TimeRange::absolute(start, end).expect("range"),
        filters: Vec::new(),
        fields: None,
        page: None,
        cursor: None,
        page_size,
        sort_by: "@timestamp".to_string(),
        sort_order: SortOrder::Desc,
        optimization: OptimizationLevel::Auto,
        fallback: FallbackStrategy::Error,
        max_result_size_mb: None,
    }
}

// ============================================================================
// SECTION: Stream Tests
// ============================================================================

#[tokio::test]
async fn event_stream_is_lazy_finite_and_complete() {
    let mut stream = EventStream::new(paged_service(1_000), stream_request(500));
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut pages = 0;
    while let Some(page) = stream.next_page().await.expect("page") {
        pages += 1;
        seen.extend(page.into_iter().map(|event| event.id));
    }
    assert_eq!(pages, 2);
    assert_eq!(seen.len(), 1_000);
    assert_eq!(stream.total_estimate(), 1_000);
    assert!(stream.next_page().await.expect("exhausted").is_none(), "streams do not restart");
}

#[tokio::test]
async fn stream_resumes_from_a_persisted_cursor() {
    let service = paged_service(1_000);
    let mut stream = EventStream::new(service.clone(), stream_request(500));
    let first = stream.next_page().await.expect("page one").expect("events");
    assert_eq!(first.len(), 500);
    let persisted = stream.resume_cursor().map(ToString::to_string);
    assert!(persisted.is_some());

    let mut resumed = EventStream::new(service, stream_request(500));
    resumed.seek(persisted);
    let second = resumed.next_page().await.expect("page two").expect("events");
    assert_eq!(second.len(), 500);
    let first_ids: BTreeSet<String> = first.into_iter().map(|event| event.id).collect();
    for event in &second {
        assert!(!first_ids.contains(&event.id), "resumed page must not repeat events");
    }
    assert!(resumed.next_page().await.expect("end").is_none());
    assert!(resumed.resume_cursor().is_none(), "exhausted streams have no cursor");
}

#[tokio::test]
async fn session_stream_emits_whole_sessions() {
    let service = paged_service(120);
    let request = SessionStreamRequest {
        query: stream_request(50),
        chunk_size: 500,
        session_fields: key_fields(),
        max_session_gap: Duration::from_secs(30 * 60),
    };
    let mut stream = SessionStream::new(service, request);
    let mut total = 0;
    while let Some(chunk) = stream.next_chunk().await.expect("chunk") {
        total += chunk.events.len();
        for entry in &chunk.events {
            assert!(!entry.session_key.is_empty());
        }
    }
    assert_eq!(total, 120, "every event is delivered exactly once");
}

// ============================================================================
// SECTION: Registry Tests
// ============================================================================

#[test]
fn registry_round_trips_within_ttl() {
    let registry = StreamRegistry::new(Duration::from_secs(60));
    registry.save("s-1", Some("cursor-token".to_string()));
    assert_eq!(registry.load("s-1").expect("known"), Some("cursor-token".to_string()));
    registry.remove("s-1");
    assert!(registry.load("s-1").is_err());
}

#[test]
fn registry_expires_streams_after_ttl() {
    let registry = StreamRegistry::new(Duration::from_millis(10));
    registry.save("s-2", None);
    std::thread::sleep(Duration::from_millis(25));
    let error = registry.load("s-2").expect_err("expired");
    assert_eq!(error.kind, ErrorKind::ResourceNotFound);
}

#[test]
fn unknown_streams_are_resource_not_found() {
    let registry = StreamRegistry::new(Duration::from_secs(60));
    let error = registry.load("missing").expect_err("unknown");
    assert_eq!(error.kind, ErrorKind::ResourceNotFound);
}
