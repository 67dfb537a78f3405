// crates/shorewatch-cli/src/wiring.rs
// ============================================================================
// Module: Service Wiring
// Description: Construction of the analytic service graph from config.
// Purpose: Assemble backends, guards, caches, and the tool router once.
// Dependencies: shorewatch-campaign, shorewatch-intel, shorewatch-mcp,
// shorewatch-siem, shorewatch-store-sqlite
// ============================================================================

//! ## Overview
//! Wiring happens exactly once at startup: the frozen configuration is
//! turned into the breaker registry, the SIEM client and query service,
//! the campaign engine, the threat-intel aggregator with its per-source
//! guards, the persistent cache store, and finally the tool router and
//! server. Nothing here is created on demand later.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use shorewatch_campaign::CampaignEngine;
use shorewatch_campaign::SiemEventSource;
use shorewatch_config::ShorewatchConfig;
use shorewatch_core::AnalyticError;
use shorewatch_core::BreakerRegistry;
use shorewatch_core::CircuitBreaker;
use shorewatch_core::CircuitBreakerConfig;
use shorewatch_core::ErrorAggregator;
use shorewatch_core::FieldMapper;
use shorewatch_core::PersistentCacheStore;
use shorewatch_core::RetryPolicy;
use shorewatch_core::TimeoutEnvelope;
use shorewatch_core::log::EventSink;
use shorewatch_core::log::NoopSink;
use shorewatch_core::resilience::aggregator::ErrorAggregatorConfig;
use shorewatch_intel::DshieldHttpSource;
use shorewatch_intel::IntelCache;
use shorewatch_intel::IntelSource;
use shorewatch_intel::ThreatIntelAggregator;
use shorewatch_intel::TokenBucket;
use shorewatch_intel::aggregator::SourceHandle;
use shorewatch_mcp::FeatureManager;
use shorewatch_mcp::McpServer;
use shorewatch_mcp::ServiceContext;
use shorewatch_mcp::ToolRouter;
use shorewatch_mcp::telemetry::NoopMetrics;
use shorewatch_siem::EventQueryService;
use shorewatch_siem::HttpSearchBackend;
use shorewatch_siem::StreamRegistry;
use shorewatch_store_sqlite::SqliteCacheConfig;
use shorewatch_store_sqlite::SqliteCacheStore;

// ============================================================================
// SECTION: Built Graph
// ============================================================================

/// The wired server and its shared handles.
pub struct BuiltServer {
    /// The MCP server.
    pub server: Arc<McpServer>,
    /// The tool router (shared with the health refresher).
    pub router: Arc<ToolRouter>,
    /// The feature manager.
    pub features: Arc<FeatureManager>,
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Builds the full service graph from a validated configuration.
///
/// # Errors
///
/// Returns [`AnalyticError`] when a component cannot be constructed
/// (unwritable output directory, invalid endpoint URLs).
pub fn build_server(config: &ShorewatchConfig) -> Result<BuiltServer, AnalyticError> {
    let sink: Arc<dyn EventSink> = Arc::new(NoopSink);
    let envelope = timeout_envelope(config);
    let retry = retry_policy(config);
    let breaker_config = breaker_config(config);

    // Breakers are global state: one per external service, built here,
    // torn down at process exit.
    let mut services: Vec<&str> = vec!["elasticsearch"];
    for source in &config.threat_intel.sources {
        services.push(source.name.as_str());
    }
    let breakers = BreakerRegistry::new(&services, breaker_config);
    let elastic_breaker = breakers
        .get("elasticsearch")
        .ok_or_else(|| AnalyticError::internal("elasticsearch breaker missing"))?;

    let mapper = FieldMapper::new(Arc::clone(&sink));
    let backend = HttpSearchBackend::new(
        &config.elasticsearch,
        Duration::from_secs(config.resilience.external_timeout_seconds),
    )?;
    let query = EventQueryService::new(
        Arc::new(backend),
        mapper,
        config.elasticsearch.clone(),
        elastic_breaker,
        retry,
        envelope,
    );

    let engine = Arc::new(CampaignEngine::new(
        Arc::new(SiemEventSource::new(query.clone())),
        config.campaign.clone(),
        Arc::clone(&sink),
    ));

    let store = open_store(config)?;
    let intel = build_intel(config, &breakers, store.clone(), envelope)?;

    let errors = Arc::new(ErrorAggregator::new(
        ErrorAggregatorConfig::default(),
        Arc::clone(&sink),
    ));
    let context = ServiceContext {
        query,
        engine,
        intel,
        streams: Arc::new(StreamRegistry::new(Duration::from_secs(
            config.elasticsearch.stream_ttl_seconds,
        ))),
        store,
        breakers,
        errors,
        campaign_config: config.campaign.clone(),
        envelope,
    };
    let features = Arc::new(FeatureManager::new());
    let router = Arc::new(ToolRouter::new(context, Arc::clone(&features))?);
    let server = Arc::new(McpServer::new(
        Arc::clone(&router),
        Arc::new(NoopMetrics),
        config.server.max_request_bytes,
    ));
    Ok(BuiltServer {
        server,
        router,
        features,
    })
}

/// Opens the persistent cache store and sweeps expired rows.
///
/// Also bootstraps the `reports/` directory so report artifacts have a
/// destination from the first request on.
fn open_store(
    config: &ShorewatchConfig,
) -> Result<Option<Arc<dyn PersistentCacheStore>>, AnalyticError> {
    std::fs::create_dir_all(config.output.directory.join("reports")).map_err(|err| {
        AnalyticError::new(
            shorewatch_core::ErrorKind::ResourceUnavailable,
            format!("cannot create reports directory: {err}"),
        )
    })?;
    let directory = config.output.directory.join("db");
    let store = SqliteCacheStore::open(SqliteCacheConfig::new(directory))
        .map_err(AnalyticError::from)?;
    store.sweep_expired()?;
    Ok(Some(Arc::new(store)))
}

/// Builds the threat-intel aggregator when sources are configured.
fn build_intel(
    config: &ShorewatchConfig,
    breakers: &BreakerRegistry,
    store: Option<Arc<dyn PersistentCacheStore>>,
    envelope: TimeoutEnvelope,
) -> Result<Option<Arc<ThreatIntelAggregator>>, AnalyticError> {
    if config.threat_intel.sources.is_empty() {
        return Ok(None);
    }
    let cache = Arc::new(IntelCache::new(config.threat_intel.memory_cache_capacity, store));
    let mut handles = Vec::with_capacity(config.threat_intel.sources.len());
    for source_config in &config.threat_intel.sources {
        let source = DshieldHttpSource::new(
            source_config,
            Duration::from_secs(config.resilience.external_timeout_seconds),
        )
        .map_err(|failure| AnalyticError::external(&source_config.name, failure.to_string()))?;
        let breaker = breakers.get(&source_config.name).unwrap_or_else(|| {
            Arc::new(CircuitBreaker::new(&source_config.name, breaker_config(config)))
        });
        handles.push(Arc::new(SourceHandle::new(
            Arc::new(source) as Arc<dyn IntelSource>,
            TokenBucket::per_minute(source_config.requests_per_minute),
            breaker,
            Duration::from_secs(source_config.memory_ttl_seconds),
            Duration::from_secs(source_config.persistent_ttl_seconds),
            Duration::from_secs(config.threat_intel.rate_limit_trip_seconds),
        )));
    }
    Ok(Some(Arc::new(ThreatIntelAggregator::new(
        handles,
        cache,
        config.threat_intel.concurrency_limit,
        config.threat_intel.success_ratio_weight,
        envelope,
    ))))
}

// ============================================================================
// SECTION: Config Translation
// ============================================================================

/// Translates resilience settings into the timeout envelope.
fn timeout_envelope(config: &ShorewatchConfig) -> TimeoutEnvelope {
    TimeoutEnvelope {
        tool_execution: Duration::from_secs(config.resilience.tool_timeout_seconds),
        external_service: Duration::from_secs(config.resilience.external_timeout_seconds),
        resource_access: Duration::from_secs(config.resilience.resource_timeout_seconds),
        validation: Duration::from_secs(config.resilience.validation_timeout_seconds),
    }
}

/// Translates resilience settings into the retry policy.
fn retry_policy(config: &ShorewatchConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.resilience.max_attempts,
        base_delay: Duration::from_millis(config.resilience.base_delay_ms),
        factor: config.resilience.backoff_factor,
        max_delay: Duration::from_millis(config.resilience.max_delay_ms),
        jitter: config.resilience.jitter,
    }
}

/// Translates resilience settings into breaker thresholds.
fn breaker_config(config: &ShorewatchConfig) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: config.resilience.failure_threshold,
        success_threshold: config.resilience.success_threshold,
        recovery_timeout: Duration::from_secs(config.resilience.recovery_timeout_seconds),
        half_open_max_calls: config.resilience.half_open_max_calls,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
