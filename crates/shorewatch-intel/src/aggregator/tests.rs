// crates/shorewatch-intel/src/aggregator/tests.rs
// ============================================================================
// Module: Threat Intel Aggregator Tests
// Description: Unit tests for fan-out, merging, and failure bookkeeping.
// Purpose: Validate partial results, confidence monotonicity, and gates.
// Dependencies: shorewatch-intel, tokio
// ============================================================================

//! ## Overview
//! Drives the aggregator with scripted in-memory sources: partial source
//! failure, total failure, trust-weighted merging, majority votes, cache
//! suppression of repeat lookups, and sustained-rate-limit breaker trips.

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

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use shorewatch_core::CircuitBreaker;
use shorewatch_core::CircuitBreakerConfig;
use shorewatch_core::CircuitState;
use shorewatch_core::ErrorKind;
use shorewatch_core::IndicatorType;
use shorewatch_core::TimeoutEnvelope;

use super::SourceHandle;
use super::ThreatIntelAggregator;
use crate::cache::IntelCache;
use crate::ratelimit::TokenBucket;
use crate::source::IntelSource;
use crate::source::PartialIntel;
use crate::source::SourceFailure;

// ============================================================================
// SECTION: Scripted Source
// ============================================================================

/// Scripted behavior for one fake source.
enum Script {
    /// Always succeed with the given payload.
    Succeed(Box<PartialIntel>),
    /// Always fail as unavailable.
    Unavailable,
    /// Always report rate limiting.
    RateLimited,
}

/// Fake source with a scripted outcome and a call counter.
struct ScriptedSource {
    /// Source name.
    name: String,
    /// Declared trust.
    trust: f64,
    /// Scripted behavior.
    script: Script,
    /// Number of lookups served.
    calls: AtomicU32,
}

#[async_trait]
impl IntelSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn trust_weight(&self) -> f64 {
        self.trust
    }

    async fn lookup(
        &self,
        _indicator: &str,
        _indicator_type: IndicatorType,
    ) -> Result<PartialIntel, SourceFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Succeed(partial) => Ok((**partial).clone()),
            Script::Unavailable => Err(SourceFailure::BackendUnavailable("down".to_string())),
            Script::RateLimited => Err(SourceFailure::RateLimited),
        }
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns a partial with the given score, country, and confidence.
fn partial(score: f64, country: &str, confidence: f64) -> PartialIntel {
    PartialIntel {
        threat_score: Some(score),
        confidence,
        first_seen: None,
        last_seen: None,
        country: Some(country.to_string()),
        asn: Some(202_425),
        tags: vec![format!("tag-{country}")],
        resolved_ips: Vec::new(),
        raw: serde_json::json!({"score": score}),
    }
}

/// Builds a handle around a scripted source.
fn handle(name: &str, trust: f64, script: Script) -> (Arc<SourceHandle>, Arc<ScriptedSource>) {
    handle_with_limit(name, trust, script, 1_000)
}

/// Builds a handle with an explicit per-minute limit.
fn handle_with_limit(
    name: &str,
    trust: f64,
    script: Script,
    requests_per_minute: u32,
) -> (Arc<SourceHandle>, Arc<ScriptedSource>) {
    let source = Arc::new(ScriptedSource {
        name: name.to_string(),
        trust,
        script,
        calls: AtomicU32::new(0),
    });
    let handle = Arc::new(SourceHandle::new(
        Arc::clone(&source) as Arc<dyn IntelSource>,
        TokenBucket::per_minute(requests_per_minute),
        Arc::new(CircuitBreaker::new(name, CircuitBreakerConfig::default())),
        Duration::from_secs(60),
        Duration::from_secs(600),
        Duration::from_millis(20),
    ));
    (handle, source)
}

/// Builds an aggregator over the given handles.
fn aggregator(handles: Vec<Arc<SourceHandle>>) -> ThreatIntelAggregator {
    ThreatIntelAggregator::new(
        handles,
        Arc::new(IntelCache::new(64, None)),
        4,
        0.6,
        TimeoutEnvelope::default(),
    )
}

/// The fixture indicator.
fn ip() -> IpAddr {
    "141.98.80.121".parse().expect("fixture ip")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn partial_failure_returns_merged_result_with_failed_sources() {
    let (h1, _) = handle("dshield", 0.9, Script::Succeed(Box::new(partial(90.0, "NL", 0.8))));
    let (h2, _) = handle("mirror", 0.5, Script::Succeed(Box::new(partial(60.0, "NL", 0.8))));
    let (h3, _) = handle("local", 0.3, Script::Unavailable);
    let result = aggregator(vec![h1, h2, h3]).enrich_ip(ip()).await.expect("partial result");

    assert_eq!(result.sources_queried.len(), 3);
    assert_eq!(result.sources_succeeded.len(), 2);
    assert_eq!(result.sources_failed, vec!["local".to_string()]);
    let score = result.overall_threat_score.expect("score");
    // Trust-weighted mean: (0.9*90 + 0.5*60) / 1.4.
    assert!((score - 79.285).abs() < 0.01, "weighted score was {score}");
    assert_eq!(result.country.as_deref(), Some("NL"));
    assert_eq!(result.indicator_type, IndicatorType::Ipv4);
}

#[tokio::test]
async fn confidence_is_strictly_lower_with_a_failed_source() {
    let make = |all_up: bool| {
        let (h1, _) = handle("dshield", 0.9, Script::Succeed(Box::new(partial(90.0, "NL", 0.8))));
        let (h2, _) = handle("mirror", 0.5, Script::Succeed(Box::new(partial(60.0, "NL", 0.8))));
        let (h3, _) = if all_up {
            handle("local", 0.3, Script::Succeed(Box::new(partial(30.0, "NL", 0.8))))
        } else {
            handle("local", 0.3, Script::Unavailable)
        };
        aggregator(vec![h1, h2, h3])
    };
    let full = make(true).enrich_ip(ip()).await.expect("all up");
    let degraded = make(false).enrich_ip(ip()).await.expect("one down");
    assert!(
        degraded.confidence_score < full.confidence_score,
        "confidence must drop with a failed source ({} >= {})",
        degraded.confidence_score,
        full.confidence_score
    );
}

#[tokio::test]
async fn all_sources_failing_is_an_error() {
    let (h1, _) = handle("dshield", 0.9, Script::Unavailable);
    let (h2, _) = handle("mirror", 0.5, Script::RateLimited);
    let error = aggregator(vec![h1, h2]).enrich_ip(ip()).await.expect_err("all failed");
    assert_eq!(error.kind, ErrorKind::ExternalService);
    let data = error.data.expect("failure detail");
    assert_eq!(data.get("code"), Some(&serde_json::json!("all_sources_unavailable")));
}

#[tokio::test]
async fn attribution_ties_break_by_trust() {
    let (h1, _) = handle("dshield", 0.9, Script::Succeed(Box::new(partial(90.0, "NL", 0.8))));
    let (h2, _) = handle("mirror", 0.4, Script::Succeed(Box::new(partial(60.0, "DE", 0.8))));
    let result = aggregator(vec![h1, h2]).enrich_ip(ip()).await.expect("result");
    assert_eq!(result.country.as_deref(), Some("NL"), "higher trust wins the tie");
}

#[tokio::test]
async fn cache_suppresses_repeat_lookups() {
    let (h1, source) = handle("dshield", 0.9, Script::Succeed(Box::new(partial(90.0, "NL", 0.8))));
    let aggregator = aggregator(vec![h1]);
    let first = aggregator.enrich_ip(ip()).await.expect("first");
    let second = aggregator.enrich_ip(ip()).await.expect("second");
    assert_eq!(source.calls.load(Ordering::SeqCst), 1, "second call served from cache");
    assert_eq!(first.overall_threat_score, second.overall_threat_score);
    assert_eq!(aggregator.cache_stats().memory_hits, 1);
}

#[tokio::test]
async fn sustained_rate_limiting_trips_the_source_breaker() {
    // One token, then local rate limiting persists past the 20 ms window.
    let (h1, _) = handle_with_limit("dshield", 0.9, Script::RateLimited, 1);
    let aggregator = aggregator(vec![h1.clone()]);
    for _ in 0 .. 3 {
        let _ = aggregator.enrich_ip(ip()).await;
        tokio::time::sleep(Duration::from_millis(15)).await;
    }
    // Sustained limiting records breaker failures; enough rounds open it.
    for _ in 0 .. 10 {
        let _ = aggregator.enrich_ip(ip()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h1.breaker.state(), CircuitState::Open, "breaker must open eventually");
}

#[tokio::test]
async fn domains_are_validated_before_fan_out() {
    let (h1, source) = handle("dshield", 0.9, Script::Succeed(Box::new(partial(10.0, "NL", 0.8))));
    let aggregator = aggregator(vec![h1]);
    let error = aggregator.enrich_domain("not a domain").await.expect_err("invalid domain");
    assert_eq!(error.kind, ErrorKind::Validation);
    assert_eq!(source.calls.load(Ordering::SeqCst), 0, "no lookup for invalid input");

    let result = aggregator.enrich_domain("evil.example.org").await.expect("valid domain");
    assert_eq!(result.domain, "evil.example.org");
    assert_eq!(result.sources_succeeded.len(), 1);
}
