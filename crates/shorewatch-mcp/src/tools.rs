// crates/shorewatch-mcp/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Frozen tool registry with gating, validation, and dispatch.
// Purpose: Execute tool calls under schema and timeout discipline.
// Dependencies: jsonschema, serde_json, shorewatch-campaign, shorewatch-core,
// shorewatch-intel, shorewatch-siem
// ============================================================================

//! ## Overview
//! The router owns the frozen tool registry built from the contract crate.
//! Dispatch is a fixed pipeline: resolve the tool, gate on dependency
//! health, validate arguments against the tool schema, then execute the
//! handler inside the tool's timeout envelope. Handler failures are
//! recorded in the error aggregator before they surface; the server module
//! performs the final JSON-RPC translation.
//! Security posture: tool arguments are untrusted until schema validation
//! passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use serde_json::json;
use shorewatch_campaign::AnalyzeRequest;
use shorewatch_campaign::CampaignEngine;
use shorewatch_campaign::ExpansionStrategy;
use shorewatch_campaign::TimelineGranularity;
use shorewatch_campaign::anomaly::AnomalyMethod;
use shorewatch_campaign::anomaly::detect_anomalies;
use shorewatch_campaign::anomaly::detect_ongoing_campaigns;
use shorewatch_campaign::expansion::IndicatorGraph;
use shorewatch_campaign::timeline::build_timeline;
use shorewatch_config::CampaignConfig;
use shorewatch_contract::ToolContract;
use shorewatch_contract::ToolDefinition;
use shorewatch_contract::ToolName;
use shorewatch_contract::tool_contracts;
use shorewatch_core::AnalyticError;
use shorewatch_core::BreakerRegistry;
use shorewatch_core::CorrelationMethod;
use shorewatch_core::ErrorAggregator;
use shorewatch_core::ErrorKind;
use shorewatch_core::FallbackStrategy;
use shorewatch_core::OptimizationLevel;
use shorewatch_core::PersistentCacheStore;
use shorewatch_core::SortOrder;
use shorewatch_core::TimeRange;
use shorewatch_core::TimeoutEnvelope;
use shorewatch_core::dictionary::data_dictionary;
use shorewatch_core::with_deadline;
use shorewatch_intel::ThreatIntelAggregator;
use shorewatch_siem::EventQueryService;
use shorewatch_siem::SessionStreamRequest;
use shorewatch_siem::StreamRegistry;
use shorewatch_siem::query::filters_from_json;
use shorewatch_siem::stream::DEFAULT_SESSION_FIELDS;
use shorewatch_siem::stream::SessionStream;
use time::OffsetDateTime;

use crate::features::FeatureManager;
use crate::features::FeatureSnapshot;
use crate::health::CacheHealth;
use crate::health::HealthStatus;
use crate::report::AttackReport;
use crate::report::render_template;

// ============================================================================
// SECTION: Service Context
// ============================================================================

/// Shared services the tool handlers execute against.
///
/// # Invariants
/// - All fields are constructed at startup and immutable thereafter.
pub struct ServiceContext {
    /// SIEM query service.
    pub query: EventQueryService,
    /// Campaign correlation engine.
    pub engine: Arc<CampaignEngine>,
    /// Threat-intelligence aggregator, when sources are configured.
    pub intel: Option<Arc<ThreatIntelAggregator>>,
    /// Resumable stream registry.
    pub streams: Arc<StreamRegistry>,
    /// Persistent cache store, when configured.
    pub store: Option<Arc<dyn PersistentCacheStore>>,
    /// Per-service breaker registry.
    pub breakers: BreakerRegistry,
    /// Process-wide error aggregator.
    pub errors: Arc<ErrorAggregator>,
    /// Campaign engine tunables shared with expansion.
    pub campaign_config: CampaignConfig,
    /// Timeout envelope for tool execution.
    pub envelope: TimeoutEnvelope,
}

impl ServiceContext {
    /// Runs dependency health checks and swaps the feature snapshot.
    pub async fn refresh_features(&self, features: &FeatureManager) {
        let elasticsearch = self.query.ping().await.is_ok();
        let threat_intel =
            self.intel.as_ref().is_some_and(|intel| intel.any_source_available());
        // A missing persistent tier is healthy: the cache is best-effort.
        let persistent_cache =
            self.store.as_ref().is_none_or(|store| store.readiness().is_ok());
        features.update(FeatureSnapshot {
            elasticsearch,
            threat_intel,
            persistent_cache,
        });
    }
}

// ============================================================================
// SECTION: Stream Identifiers
// ============================================================================

/// Boot-scoped stream identifier generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
struct StreamIdGenerator {
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for identifiers issued in this process.
    counter: AtomicU64,
}

impl StreamIdGenerator {
    /// Creates a new generator.
    fn new() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new stream identifier.
    fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("stm-{:016x}-{:08x}", self.boot_id, seq)
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Frozen tool registry and dispatch pipeline.
///
/// # Invariants
/// - The registry is built once; tools never change at runtime.
pub struct ToolRouter {
    /// Tool contracts in listing order.
    contracts: Vec<ToolContract>,
    /// Compiled argument validators per tool.
    validators: BTreeMap<ToolName, jsonschema::Validator>,
    /// Health-driven feature manager.
    features: Arc<FeatureManager>,
    /// Shared service context.
    context: ServiceContext,
    /// Stream identifier generator.
    stream_ids: StreamIdGenerator,
}

impl ToolRouter {
    /// Builds the router, compiling every tool schema.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `Internal` when a contract
    /// schema fails to compile; that is a build defect, not bad input.
    pub fn new(
        context: ServiceContext,
        features: Arc<FeatureManager>,
    ) -> Result<Self, AnalyticError> {
        let contracts = tool_contracts();
        let mut validators = BTreeMap::new();
        for contract in &contracts {
            let validator = jsonschema::options()
                .with_draft(jsonschema::Draft::Draft202012)
                .build(&contract.input_schema)
                .map_err(|err| {
                    AnalyticError::internal(format!(
                        "schema for {} failed to compile: {err}",
                        contract.name.as_str()
                    ))
                })?;
            validators.insert(contract.name, validator);
        }
        Ok(Self {
            contracts,
            validators,
            features,
            context,
            stream_ids: StreamIdGenerator::new(),
        })
    }

    /// Returns the tool listing definitions in registry order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.contracts.iter().map(ToolContract::definition).collect()
    }

    /// Returns the shared service context.
    #[must_use]
    pub const fn context(&self) -> &ServiceContext {
        &self.context
    }

    /// Dispatches one tool call through the gate pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] mapped by the server into a JSON-RPC
    /// error: `MethodNotFound`, `ResourceUnavailable` (feature gate),
    /// `InvalidParams` (schema), or the handler's own failure.
    pub async fn handle_call(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<Value, AnalyticError> {
        let result = self.dispatch(name, arguments).await;
        if let Err(error) = &result {
            self.context.errors.record(
                error.json_rpc_code(),
                error.kind,
                error.service.as_deref(),
            );
        }
        result
    }

    /// Runs resolve, gate, validate, and execute.
    async fn dispatch(&self, name: &str, arguments: &Value) -> Result<Value, AnalyticError> {
        let Some(tool) = ToolName::parse(name) else {
            return Err(AnalyticError::new(
                ErrorKind::MethodNotFound,
                format!("unknown tool: {name}"),
            ));
        };
        let contract = self
            .contracts
            .iter()
            .find(|contract| contract.name == tool)
            .ok_or_else(|| AnalyticError::internal("tool missing from registry"))?;

        let missing = self.features.missing(&contract.required_features);
        if !missing.is_empty() {
            let labels: Vec<&str> = missing.iter().map(|feature| feature.label()).collect();
            return Err(AnalyticError::new(
                ErrorKind::ResourceUnavailable,
                format!("tool {name} unavailable: unhealthy dependencies"),
            )
            .with_data(json!({"missing_dependencies": labels})));
        }

        if let Some(validator) = self.validators.get(&tool) {
            let details: Vec<Value> = validator
                .iter_errors(arguments)
                .map(|error| {
                    json!({
                        "path": error.instance_path().to_string(),
                        "message": error.to_string(),
                    })
                })
                .collect();
            if !details.is_empty() {
                return Err(AnalyticError::new(
                    ErrorKind::InvalidParams,
                    format!("invalid arguments for {name}"),
                )
                .with_data(json!({"errors": details})));
            }
        }

        with_deadline(
            &self.context.envelope,
            contract.timeout_class,
            name,
            self.execute(tool, arguments),
        )
        .await
    }

    /// Executes the resolved tool handler.
    async fn execute(&self, tool: ToolName, args: &Value) -> Result<Value, AnalyticError> {
        match tool {
            ToolName::QueryDshieldEvents => self.tool_query_events(args).await,
            ToolName::StreamDshieldEventsWithSessionContext => {
                self.tool_stream_sessions(args).await
            }
            ToolName::AnalyzeCampaign => self.tool_analyze_campaign(args).await,
            ToolName::ExpandCampaignIndicators => self.tool_expand_indicators(args),
            ToolName::GetCampaignTimeline => self.tool_campaign_timeline(args),
            ToolName::DetectStatisticalAnomalies => self.tool_detect_anomalies(args).await,
            ToolName::EnrichIpWithDshield => self.tool_enrich_ip(args).await,
            ToolName::EnrichDomainWithDshield => self.tool_enrich_domain(args).await,
            ToolName::GenerateAttackReport => self.tool_attack_report(args).await,
            ToolName::GetHealthStatus => Ok(self.tool_health_status()),
            ToolName::GetDataDictionary => self.tool_data_dictionary(),
        }
    }

    // ------------------------------------------------------------------
    // Query tools
    // ------------------------------------------------------------------

    /// Handles `query_dshield_events`.
    async fn tool_query_events(&self, args: &Value) -> Result<Value, AnalyticError> {
        let request = self.query_request_from_args(args)?;
        let timeout_override = args
            .get("query_timeout_seconds")
            .and_then(Value::as_u64)
            .map(Duration::from_secs);
        let page = match timeout_override {
            Some(deadline) => tokio::time::timeout(deadline, self.context.query.query_events(&request))
                .await
                .map_err(|_| AnalyticError::timeout("query_dshield_events"))??,
            None => self.context.query.query_events(&request).await?,
        };
        Ok(json!({
            "events": page.events,
            "aggregations": page.aggregations,
            "pagination": page.pagination,
            "perf_metrics": page.perf,
        }))
    }

    /// Handles `stream_dshield_events_with_session_context`.
    async fn tool_stream_sessions(&self, args: &Value) -> Result<Value, AnalyticError> {
        let mut query = self.query_request_from_args(args)?;
        query.page = None;
        query.cursor = None;
        let chunk_size = args
            .get("chunk_size")
            .and_then(Value::as_u64)
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or_else(|| {
                usize::try_from(self.context.query.config().stream_chunk_size).unwrap_or(500)
            });
        let session_fields: Vec<String> = args
            .get("session_fields")
            .and_then(Value::as_array)
            .map(|fields| {
                fields.iter().filter_map(Value::as_str).map(ToString::to_string).collect()
            })
            .unwrap_or_else(|| {
                DEFAULT_SESSION_FIELDS.iter().map(|field| (*field).to_string()).collect()
            });
        let max_gap_minutes = args
            .get("max_session_gap_minutes")
            .and_then(Value::as_u64)
            .unwrap_or(30);
        let stream_id = args
            .get("stream_id")
            .and_then(Value::as_str)
            .map_or_else(|| self.stream_ids.issue(), ToString::to_string);
        // A resumed stream starts from its persisted cursor; a fresh
        // stream from the caller-provided cursor, when any.
        let resume_cursor = if args.get("stream_id").is_some() {
            self.context.streams.load(&stream_id)?
        } else {
            args.get("cursor").and_then(Value::as_str).map(ToString::to_string)
        };

        let mut stream = SessionStream::new(
            self.context.query.clone(),
            SessionStreamRequest {
                query,
                chunk_size,
                session_fields,
                max_session_gap: Duration::from_secs(max_gap_minutes * 60),
            },
        );
        stream.seek(resume_cursor);
        let chunk = stream.next_chunk().await?;
        match chunk {
            Some(chunk) => {
                self.context.streams.save(&stream_id, chunk.next_cursor.clone());
                Ok(json!({
                    "events": chunk.events,
                    "total_estimate": chunk.total_estimate,
                    "next_cursor": chunk.next_cursor,
                    "stream_id": stream_id,
                }))
            }
            None => {
                self.context.streams.remove(&stream_id);
                Ok(json!({
                    "events": [],
                    "total_estimate": 0,
                    "next_cursor": null,
                    "stream_id": stream_id,
                }))
            }
        }
    }

    /// Builds a query request from shared tool arguments.
    fn query_request_from_args(&self, args: &Value) -> Result<QueryRequestArgs, AnalyticError> {
        let hours = args
            .get("time_range_hours")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| {
                AnalyticError::new(ErrorKind::InvalidParams, "time_range_hours is required")
            })?;
        let time_range = TimeRange::last_hours(hours, OffsetDateTime::now_utc())?;
        let filters = match args.get("filters") {
            Some(filters) => filters_from_json(filters)?,
            None => Vec::new(),
        };
        let fields = args.get("fields").and_then(Value::as_array).map(|fields| {
            fields.iter().filter_map(Value::as_str).map(ToString::to_string).collect()
        });
        let page = args
            .get("page")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok());
        let cursor = args.get("cursor").and_then(Value::as_str).map(ToString::to_string);
        let page_size = args
            .get("page_size")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(100);
        let sort_by = args
            .get("sort_by")
            .and_then(Value::as_str)
            .unwrap_or("@timestamp")
            .to_string();
        let sort_order = match args.get("sort_order").and_then(Value::as_str) {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        let optimization = match args.get("optimization").and_then(Value::as_str) {
            Some("none") => OptimizationLevel::None,
            Some("aggressive") => OptimizationLevel::Aggressive,
            _ => OptimizationLevel::Auto,
        };
        let fallback = match args.get("fallback_strategy").and_then(Value::as_str) {
            Some("aggregate") => FallbackStrategy::Aggregate,
            Some("sample") => FallbackStrategy::Sample,
            _ => FallbackStrategy::Error,
        };
        let max_result_size_mb = args
            .get("max_result_size_mb")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok());
        Ok(QueryRequestArgs {
            time_range,
            filters,
            fields,
            page,
            cursor,
            page_size,
            sort_by,
            sort_order,
            optimization,
            fallback,
            max_result_size_mb,
        })
    }

    // ------------------------------------------------------------------
    // Campaign tools
    // ------------------------------------------------------------------

    /// Handles `analyze_campaign`.
    async fn tool_analyze_campaign(&self, args: &Value) -> Result<Value, AnalyticError> {
        let seeds: Vec<String> = args
            .get("seed_indicators")
            .and_then(Value::as_array)
            .map(|seeds| seeds.iter().filter_map(Value::as_str).map(ToString::to_string).collect())
            .unwrap_or_default();
        let hours = args
            .get("time_range_hours")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(24);
        let methods = match args.get("correlation_methods").and_then(Value::as_array) {
            Some(raw) => raw
                .iter()
                .filter_map(Value::as_str)
                .map(parse_method)
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![
                CorrelationMethod::IpExact,
                CorrelationMethod::IpSubnet,
                CorrelationMethod::TemporalCluster,
            ],
        };
        let request = AnalyzeRequest {
            seed_indicators: seeds,
            time_range: TimeRange::last_hours(hours, OffsetDateTime::now_utc())?,
            correlation_methods: methods,
            min_confidence: args.get("min_confidence").and_then(Value::as_f64).unwrap_or(0.5),
            include_relationships: args
                .get("include_relationships")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        };
        let campaign = self.context.engine.analyze_campaign(&request).await?;
        let mut response = serde_json::to_value(&campaign)
            .map_err(|err| AnalyticError::internal(err.to_string()))?;
        if args.get("include_timeline").and_then(Value::as_bool).unwrap_or(false)
            && let Value::Object(map) = &mut response
        {
            let buckets = build_timeline(&campaign.events, TimelineGranularity::Hourly);
            map.insert(
                "timeline".to_string(),
                serde_json::to_value(buckets)
                    .map_err(|err| AnalyticError::internal(err.to_string()))?,
            );
        }
        if request.include_relationships
            && let Value::Object(map) = &mut response
        {
            let relationships = self.context.engine.relationships(&campaign.campaign_id);
            map.insert(
                "relationships".to_string(),
                serde_json::to_value(relationships)
                    .map_err(|err| AnalyticError::internal(err.to_string()))?,
            );
        }
        Ok(response)
    }

    /// Handles `expand_campaign_indicators`.
    fn tool_expand_indicators(&self, args: &Value) -> Result<Value, AnalyticError> {
        let campaign_id = required_str(args, "campaign_id")?;
        let campaign = self.context.engine.campaign(campaign_id).ok_or_else(|| {
            AnalyticError::new(
                ErrorKind::ResourceNotFound,
                format!("unknown campaign: {campaign_id}"),
            )
        })?;
        let depth = args
            .get("expansion_depth")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(2);
        let strategy = match args.get("expansion_strategy").and_then(Value::as_str) {
            Some("infrastructure") => ExpansionStrategy::Infrastructure,
            Some("temporal") => ExpansionStrategy::Temporal,
            _ => ExpansionStrategy::Comprehensive,
        };
        let graph =
            IndicatorGraph::from_relationships(self.context.engine.relationships(campaign_id));
        let seeds: Vec<String> = campaign.seed_indicators.iter().cloned().collect();
        let result =
            graph.expand(&seeds, strategy, depth, self.context.campaign_config.expansion_fanout_cap);
        Ok(json!({
            "campaign_id": campaign_id,
            "indicators": result.indicators,
            "relationships": result.relationships,
            "depth_reached": result.depth_reached,
        }))
    }

    /// Handles `get_campaign_timeline`.
    fn tool_campaign_timeline(&self, args: &Value) -> Result<Value, AnalyticError> {
        let campaign_id = required_str(args, "campaign_id")?;
        let campaign = self.context.engine.campaign(campaign_id).ok_or_else(|| {
            AnalyticError::new(
                ErrorKind::ResourceNotFound,
                format!("unknown campaign: {campaign_id}"),
            )
        })?;
        let granularity = match args.get("timeline_granularity").and_then(Value::as_str) {
            Some("minute") => TimelineGranularity::Minute,
            Some("daily") => TimelineGranularity::Daily,
            _ => TimelineGranularity::Hourly,
        };
        let buckets = build_timeline(&campaign.events, granularity);
        Ok(json!({
            "campaign_id": campaign_id,
            "granularity": granularity.label(),
            "buckets": buckets,
        }))
    }

    /// Handles `detect_statistical_anomalies`.
    async fn tool_detect_anomalies(&self, args: &Value) -> Result<Value, AnalyticError> {
        let request = self.query_request_from_args(args)?;
        let page = self.context.query.query_events(&request).await?;
        let methods: Vec<AnomalyMethod> = match args.get("anomaly_methods").and_then(Value::as_array)
        {
            Some(raw) => raw
                .iter()
                .filter_map(Value::as_str)
                .map(parse_anomaly_method)
                .collect::<Result<Vec<_>, _>>()?,
            None => AnomalyMethod::ALL.to_vec(),
        };
        let sensitivity = args.get("sensitivity").and_then(Value::as_f64).unwrap_or(0.5);
        let events_examined = page.events.len();
        let window_total = page.pagination.total_count;
        let events = page.events;
        let run_methods = methods.clone();
        // CPU-bound scan; keep it off the cooperative executor.
        let (anomalies, ongoing) = tokio::task::spawn_blocking(move || {
            let anomalies = detect_anomalies(&events, &run_methods, sensitivity);
            let ongoing = detect_ongoing_campaigns(&events, 10, 0.5);
            (anomalies, ongoing)
        })
        .await
        .map_err(|_| AnalyticError::internal("anomaly detection worker failed"))?;
        Ok(json!({
            "anomalies": anomalies,
            "methods_run": methods.iter().map(|method| method.label()).collect::<Vec<_>>(),
            "baseline": {
                "events_examined": events_examined,
                "window_total": window_total,
            },
            "ongoing_campaigns": ongoing,
        }))
    }

    // ------------------------------------------------------------------
    // Intel tools
    // ------------------------------------------------------------------

    /// Handles `enrich_ip_with_dshield`.
    async fn tool_enrich_ip(&self, args: &Value) -> Result<Value, AnalyticError> {
        let raw = required_str(args, "ip_address")?;
        let ip: std::net::IpAddr = raw
            .parse()
            .map_err(|_| AnalyticError::validation(format!("{raw} is not a valid IP address")))?;
        let intel = self.intel()?;
        let result = intel.enrich_ip(ip).await?;
        serde_json::to_value(result).map_err(|err| AnalyticError::internal(err.to_string()))
    }

    /// Handles `enrich_domain_with_dshield`.
    async fn tool_enrich_domain(&self, args: &Value) -> Result<Value, AnalyticError> {
        let domain = required_str(args, "domain")?;
        let intel = self.intel()?;
        let result = intel.enrich_domain(domain).await?;
        serde_json::to_value(result).map_err(|err| AnalyticError::internal(err.to_string()))
    }

    /// Returns the intel aggregator or an unavailable error.
    fn intel(&self) -> Result<&Arc<ThreatIntelAggregator>, AnalyticError> {
        self.context.intel.as_ref().ok_or_else(|| {
            AnalyticError::new(
                ErrorKind::ResourceUnavailable,
                "no threat-intelligence sources configured",
            )
        })
    }

    // ------------------------------------------------------------------
    // Report / health / dictionary
    // ------------------------------------------------------------------

    /// Handles `generate_attack_report`.
    async fn tool_attack_report(&self, args: &Value) -> Result<Value, AnalyticError> {
        let template = required_str(args, "template")?;
        let report = match args.get("campaign_id").and_then(Value::as_str) {
            Some(campaign_id) => {
                let campaign = self.context.engine.campaign(campaign_id).ok_or_else(|| {
                    AnalyticError::new(
                        ErrorKind::ResourceNotFound,
                        format!("unknown campaign: {campaign_id}"),
                    )
                })?;
                AttackReport::from_campaign(&campaign)
            }
            None => {
                let request = self.query_request_from_args(args)?;
                let page = self.context.query.query_events(&request).await?;
                AttackReport::from_events(&page.events)
            }
        };
        let rendered = render_template(template, &report)?;
        Ok(json!({
            "rendered": rendered,
            "report": report,
        }))
    }

    /// Handles `get_health_status`.
    fn tool_health_status(&self) -> Value {
        let cache = self.context.intel.as_ref().map_or_else(CacheHealth::default, |intel| {
            let stats = intel.cache_stats();
            CacheHealth {
                memory_hits: stats.memory_hits,
                persistent_hits: stats.persistent_hits,
                misses: stats.misses,
            }
        });
        let status = HealthStatus::assemble(
            self.features.snapshot(),
            self.context.breakers.snapshots(),
            cache,
        );
        serde_json::to_value(status).unwrap_or_else(|_| json!({"healthy": false}))
    }

    /// Handles `get_data_dictionary`.
    fn tool_data_dictionary(&self) -> Result<Value, AnalyticError> {
        let records = data_dictionary(self.context.query.mapper())?;
        Ok(json!({"fields": records}))
    }
}

/// Shared query-argument bundle alias.
type QueryRequestArgs = shorewatch_siem::QueryRequest;

// ============================================================================
// SECTION: Argument Helpers
// ============================================================================

/// Extracts a required string argument.
fn required_str<'args>(args: &'args Value, key: &str) -> Result<&'args str, AnalyticError> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        AnalyticError::new(ErrorKind::InvalidParams, format!("{key} is required"))
    })
}

/// Parses a correlation-method label.
fn parse_method(label: &str) -> Result<CorrelationMethod, AnalyticError> {
    match label {
        "ip_exact" => Ok(CorrelationMethod::IpExact),
        "ip_subnet" => Ok(CorrelationMethod::IpSubnet),
        "ip_asn" => Ok(CorrelationMethod::IpAsn),
        "shared_infrastructure" => Ok(CorrelationMethod::SharedInfrastructure),
        "behavioral_match" => Ok(CorrelationMethod::BehavioralMatch),
        "temporal_cluster" => Ok(CorrelationMethod::TemporalCluster),
        "geospatial" => Ok(CorrelationMethod::Geospatial),
        other => Err(AnalyticError::new(
            ErrorKind::InvalidParams,
            format!("unknown correlation method: {other}"),
        )),
    }
}

/// Parses an anomaly-method label.
fn parse_anomaly_method(label: &str) -> Result<AnomalyMethod, AnalyticError> {
    match label {
        "rate_spike" => Ok(AnomalyMethod::RateSpike),
        "rare_category" => Ok(AnomalyMethod::RareCategory),
        "new_source_burst" => Ok(AnomalyMethod::NewSourceBurst),
        other => Err(AnalyticError::new(
            ErrorKind::InvalidParams,
            format!("unknown anomaly method: {other}"),
        )),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
