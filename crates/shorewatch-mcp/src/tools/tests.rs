// crates/shorewatch-mcp/src/tools/tests.rs
// ============================================================================
// Module: Tool Router Tests
// Description: Unit tests for the dispatch pipeline and handlers.
// Purpose: Validate gating, validation, and handler behavior in memory.
// Dependencies: async-trait, shorewatch-mcp, tokio
// ============================================================================

//! ## Overview
//! Drives the router over an empty in-memory backend: registry listing,
//! unknown tools, feature gating with missing-dependency detail, schema
//! validation failures with field paths, and the argument-free tools.

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

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use shorewatch_campaign::CampaignEngine;
use shorewatch_campaign::SiemEventSource;
use shorewatch_config::CampaignConfig;
use shorewatch_config::ElasticConfig;
use shorewatch_core::AnalyticError;
use shorewatch_core::BreakerRegistry;
use shorewatch_core::CircuitBreaker;
use shorewatch_core::CircuitBreakerConfig;
use shorewatch_core::ErrorAggregator;
use shorewatch_core::ErrorKind;
use shorewatch_core::FieldMapper;
use shorewatch_core::RetryPolicy;
use shorewatch_core::TimeoutEnvelope;
use shorewatch_core::log::NoopSink;
use shorewatch_core::resilience::aggregator::ErrorAggregatorConfig;
use shorewatch_siem::EventQueryService;
use shorewatch_siem::SearchBackend;
use shorewatch_siem::SearchRequest;
use shorewatch_siem::SearchResponse;
use shorewatch_siem::StreamRegistry;

use super::ServiceContext;
use super::ToolRouter;
use crate::features::FeatureManager;
use crate::features::FeatureSnapshot;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Backend returning empty results for every request.
struct EmptyBackend;

#[async_trait]
impl SearchBackend for EmptyBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, AnalyticError> {
        Ok(SearchResponse {
            total: 0,
            hits: Vec::new(),
            aggregations: request.body.get("aggs").map(|_| json!({"group": {"buckets": []}})),
            took_ms: 1,
            shards_scanned: 1,
        })
    }

    async fn count(&self, _request: &SearchRequest) -> Result<u64, AnalyticError> {
        Ok(0)
    }

    async fn ping(&self) -> Result<(), AnalyticError> {
        Ok(())
    }
}

/// Builds a router with elasticsearch healthy and intel absent.
fn router() -> (ToolRouter, Arc<FeatureManager>) {
    let service = EventQueryService::new(
        Arc::new(EmptyBackend),
        FieldMapper::new(Arc::new(NoopSink)),
        ElasticConfig::default(),
        Arc::new(CircuitBreaker::new("elasticsearch", CircuitBreakerConfig::default())),
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            factor: 2.0,
            max_delay: Duration::from_millis(5),
            jitter: 0.0,
        },
        TimeoutEnvelope::default(),
    );
    let engine = Arc::new(CampaignEngine::new(
        Arc::new(SiemEventSource::new(service.clone())),
        CampaignConfig::default(),
        Arc::new(NoopSink),
    ));
    let context = ServiceContext {
        query: service,
        engine,
        intel: None,
        streams: Arc::new(StreamRegistry::new(Duration::from_secs(60))),
        store: None,
        breakers: BreakerRegistry::new(&["elasticsearch"], CircuitBreakerConfig::default()),
        errors: Arc::new(ErrorAggregator::new(
            ErrorAggregatorConfig::default(),
            Arc::new(NoopSink),
        )),
        campaign_config: CampaignConfig::default(),
        envelope: TimeoutEnvelope::default(),
    };
    let features = Arc::new(FeatureManager::new());
    features.update(FeatureSnapshot {
        elasticsearch: true,
        threat_intel: false,
        persistent_cache: true,
    });
    let router = ToolRouter::new(context, Arc::clone(&features)).expect("router builds");
    (router, features)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn registry_lists_every_tool_in_order() {
    let (router, _features) = router();
    let definitions = router.definitions();
    assert_eq!(definitions.len(), 11);
    assert_eq!(definitions[0].name.as_str(), "query_dshield_events");
    assert_eq!(definitions.last().map(|tool| tool.name.as_str()), Some("get_data_dictionary"));
}

#[tokio::test]
async fn unknown_tools_are_method_not_found() {
    let (router, _features) = router();
    let error = router.handle_call("no_such_tool", &json!({})).await.expect_err("unknown");
    assert_eq!(error.kind, ErrorKind::MethodNotFound);
}

#[tokio::test]
async fn unhealthy_dependencies_gate_the_tool() {
    let (router, _features) = router();
    let error = router
        .handle_call("enrich_ip_with_dshield", &json!({"ip_address": "141.98.80.121"}))
        .await
        .expect_err("gated");
    assert_eq!(error.kind, ErrorKind::ResourceUnavailable);
    let data = error.data.expect("missing dependency detail");
    assert_eq!(data.get("missing_dependencies"), Some(&json!(["threat_intel"])));
}

#[tokio::test]
async fn schema_failures_carry_field_detail() {
    let (router, _features) = router();
    let error = router
        .handle_call("query_dshield_events", &json!({"page_size": "not-a-number"}))
        .await
        .expect_err("schema failure");
    assert_eq!(error.kind, ErrorKind::InvalidParams);
    let data = error.data.expect("field detail");
    let errors = data.get("errors").and_then(Value::as_array).expect("errors array");
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|detail| detail.get("path").is_some()));
}

#[tokio::test]
async fn query_tool_responds_with_contract_keys() {
    let (router, _features) = router();
    let result = router
        .handle_call("query_dshield_events", &json!({"time_range_hours": 24}))
        .await
        .expect("query succeeds");
    assert!(result.get("events").is_some());
    assert!(result.get("pagination").is_some());
    assert!(result.get("perf_metrics").is_some());
    assert_eq!(result.pointer("/pagination/total_count"), Some(&json!(0)));
}

#[tokio::test]
async fn data_dictionary_needs_no_features() {
    let (router, features) = router();
    features.update(FeatureSnapshot::default());
    let result =
        router.handle_call("get_data_dictionary", &json!({})).await.expect("dictionary");
    let fields = result.get("fields").and_then(Value::as_array).expect("fields");
    assert!(fields.len() >= 20);
}

#[tokio::test]
async fn health_status_reflects_features_and_breakers() {
    let (router, _features) = router();
    let result = router.handle_call("get_health_status", &json!({})).await.expect("health");
    assert_eq!(result.get("healthy"), Some(&json!(false)), "threat intel is down");
    let breakers = result.get("breakers").and_then(Value::as_array).expect("breakers");
    assert_eq!(breakers.len(), 1);
    assert_eq!(breakers[0].get("service"), Some(&json!("elasticsearch")));
}

#[tokio::test]
async fn unknown_campaigns_are_resource_not_found() {
    let (router, _features) = router();
    for (tool, args) in [
        ("expand_campaign_indicators", json!({"campaign_id": "cmp-missing"})),
        ("get_campaign_timeline", json!({"campaign_id": "cmp-missing"})),
        (
            "generate_attack_report",
            json!({"campaign_id": "cmp-missing", "template": "{{total_events}}"}),
        ),
    ] {
        let error = router.handle_call(tool, &args).await.expect_err(tool);
        assert_eq!(error.kind, ErrorKind::ResourceNotFound, "{tool}");
    }
}

#[tokio::test]
async fn attack_report_rejects_unknown_placeholders() {
    let (router, _features) = router();
    let error = router
        .handle_call(
            "generate_attack_report",
            &json!({"time_range_hours": 24, "template": "{{bogus}}"}),
        )
        .await
        .expect_err("unknown placeholder");
    assert_eq!(error.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn failed_calls_are_recorded_in_the_error_aggregator() {
    let (router, _features) = router();
    let _ = router.handle_call("no_such_tool", &json!({})).await;
    assert!(!router.context().errors.is_empty(), "aggregator must record the failure");
}
