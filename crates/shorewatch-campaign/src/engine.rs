// crates/shorewatch-campaign/src/engine.rs
// ============================================================================
// Module: Campaign Correlation Engine
// Description: Five-stage correlation from seed indicators to a campaign.
// Purpose: Build campaigns with per-event confidence and stable identity.
// Dependencies: async-trait, serde_json, shorewatch-core, shorewatch-siem
// ============================================================================

//! ## Overview
//! `analyze_campaign` runs the staged pipeline: S1 retrieves seed events
//! with one query per IP-bearing document path (a composite should-query
//! is forbidden there; it misses events on some index layouts), S2 expands
//! by exact IP, subnet, and ASN, S3 by shared infrastructure indicators,
//! S4 by behavioral sequence similarity, and S5 by temporal clustering.
//! Events deduplicate by id across stages; each stage reinforces the
//! methods that touched an event, and per-event confidence is the mean of
//! method scores with a decay for methods that never reinforced the event.
//! Completed campaigns are retained in an in-memory registry for the
//! expansion and timeline tools.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use shorewatch_config::CampaignConfig;
use shorewatch_core::AnalyticError;
use shorewatch_core::Campaign;
use shorewatch_core::CampaignConfidence;
use shorewatch_core::CampaignEvent;
use shorewatch_core::CorrelationMethod;
use shorewatch_core::ErrorKind;
use shorewatch_core::EventRole;
use shorewatch_core::IndicatorRelationship;
use shorewatch_core::RelationKind;
use shorewatch_core::SecurityEvent;
use shorewatch_core::TimeRange;
use shorewatch_core::log::EventLevel;
use shorewatch_core::log::EventSink;
use shorewatch_core::log::StructuredEvent;
use shorewatch_core::model::campaign::campaign_id;
use shorewatch_siem::EventQueryService;
use shorewatch_siem::executor::QueryRequest;

use crate::scoring::score_campaign;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// IP-bearing document paths queried individually during seed retrieval.
pub const SEED_IP_PATHS: &[&str] =
    &["source.ip", "source.address", "destination.ip", "destination.address", "related.ip"];

// ============================================================================
// SECTION: Event Source Seam
// ============================================================================

/// Read-only event access used by the engine.
#[async_trait]
pub trait CampaignEventSource: Send + Sync {
    /// Runs one term query against a single document path.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] on backend failures.
    async fn events_for_path(
        &self,
        path: &str,
        value: &str,
        range: &TimeRange,
        limit: u32,
    ) -> Result<Vec<SecurityEvent>, AnalyticError>;

    /// Runs a terms query over a user-visible field.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] on backend failures.
    async fn events_matching(
        &self,
        field: &str,
        values: &[Value],
        range: &TimeRange,
        limit: u32,
    ) -> Result<Vec<SecurityEvent>, AnalyticError>;

    /// Returns recent events in the window without seeding.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] on backend failures.
    async fn recent_events(
        &self,
        range: &TimeRange,
        limit: u32,
    ) -> Result<Vec<SecurityEvent>, AnalyticError>;
}

/// Event source backed by the SIEM query layer.
pub struct SiemEventSource {
    /// Underlying query service.
    service: EventQueryService,
}

impl SiemEventSource {
    /// Creates a source over the query service.
    #[must_use]
    pub const fn new(service: EventQueryService) -> Self {
        Self {
            service,
        }
    }

    /// Builds a base query request for engine lookups.
    fn base_request(range: &TimeRange, limit: u32) -> QueryRequest {
        QueryRequest {
            time_range: *range,
            filters: Vec::new(),
            fields: None,
            page: Some(1),
            cursor: None,
            page_size: limit,
            sort_by: "@timestamp".to_string(),
            sort_order: shorewatch_core::SortOrder::Asc,
            optimization: shorewatch_core::OptimizationLevel::None,
            fallback: shorewatch_core::FallbackStrategy::Error,
            max_result_size_mb: None,
        }
    }
}

#[async_trait]
impl CampaignEventSource for SiemEventSource {
    async fn events_for_path(
        &self,
        path: &str,
        value: &str,
        range: &TimeRange,
        limit: u32,
    ) -> Result<Vec<SecurityEvent>, AnalyticError> {
        self.service.events_for_document_path(path, &json!(value), range, limit).await
    }

    async fn events_matching(
        &self,
        field: &str,
        values: &[Value],
        range: &TimeRange,
        limit: u32,
    ) -> Result<Vec<SecurityEvent>, AnalyticError> {
        let mut request = Self::base_request(range, limit);
        request.filters = vec![shorewatch_core::QueryFilter {
            field: field.to_string(),
            operator: shorewatch_core::FilterOperator::In,
            value: shorewatch_core::FilterValue::List(values.to_vec()),
        }];
        Ok(self.service.query_events(&request).await?.events)
    }

    async fn recent_events(
        &self,
        range: &TimeRange,
        limit: u32,
    ) -> Result<Vec<SecurityEvent>, AnalyticError> {
        let request = Self::base_request(range, limit);
        Ok(self.service.query_events(&request).await?.events)
    }
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// One campaign analysis request.
///
/// # Invariants
/// - `seed_indicators` is non-empty and holds syntactically valid IPs.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    /// Seed indicators (IP addresses).
    pub seed_indicators: Vec<String>,
    /// Analysis window.
    pub time_range: TimeRange,
    /// Correlation methods to apply, in stage order.
    pub correlation_methods: Vec<CorrelationMethod>,
    /// Per-event confidence floor.
    pub min_confidence: f64,
    /// Attach indicator relationships to the result.
    pub include_relationships: bool,
}

// ============================================================================
// SECTION: Working State
// ============================================================================

/// Accumulated correlation state across stages.
#[derive(Default)]
struct Workbench {
    /// Events by id.
    events: HashMap<String, SecurityEvent>,
    /// Role per event id.
    roles: HashMap<String, EventRole>,
    /// Methods that introduced or reinforced each event.
    methods: HashMap<String, BTreeSet<CorrelationMethod>>,
    /// Temporal proximity score per event id.
    proximity: HashMap<String, f64>,
    /// Relationship edges discovered during correlation.
    relationships: Vec<IndicatorRelationship>,
    /// Methods that contributed at least one event.
    methods_used: BTreeSet<CorrelationMethod>,
}

impl Workbench {
    /// Adds or reinforces an event under a method.
    fn absorb(&mut self, event: SecurityEvent, role: EventRole, method: CorrelationMethod) {
        let id = event.id.clone();
        self.events.entry(id.clone()).or_insert(event);
        self.roles.entry(id.clone()).or_insert(role);
        self.methods.entry(id).or_default().insert(method);
        self.methods_used.insert(method);
    }

    /// Reinforces an already-present event under a method.
    fn reinforce(&mut self, event_id: &str, method: CorrelationMethod) {
        if self.events.contains_key(event_id) {
            self.methods.entry(event_id.to_string()).or_default().insert(method);
            self.methods_used.insert(method);
        }
    }

    /// Returns every IP currently in the working set.
    fn all_ips(&self) -> BTreeSet<IpAddr> {
        self.events.values().flat_map(SecurityEvent::ips).collect()
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Campaign correlation engine.
///
/// # Invariants
/// - The engine holds read-only references to the event source.
/// - Completed campaigns are retained until process shutdown.
pub struct CampaignEngine {
    /// Read-only event access.
    source: Arc<dyn CampaignEventSource>,
    /// Engine configuration.
    config: CampaignConfig,
    /// Operational event sink.
    sink: Arc<dyn EventSink>,
    /// Completed campaigns by id.
    registry: Mutex<HashMap<String, Campaign>>,
    /// Relationship edges per campaign id.
    edges: Mutex<HashMap<String, Vec<IndicatorRelationship>>>,
}

impl CampaignEngine {
    /// Creates an engine over an event source.
    #[must_use]
    pub fn new(
        source: Arc<dyn CampaignEventSource>,
        config: CampaignConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            source,
            config,
            sink,
            registry: Mutex::new(HashMap::new()),
            edges: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a completed campaign by id.
    #[must_use]
    pub fn campaign(&self, campaign_id: &str) -> Option<Campaign> {
        self.registry.lock().ok().and_then(|registry| registry.get(campaign_id).cloned())
    }

    /// Runs the staged correlation pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `ResourceNotFound` when no seed
    /// indicator matches any event, `Validation` for malformed seeds, and
    /// `ExternalService` when every correlation stage fails on backend
    /// errors.
    pub async fn analyze_campaign(&self, request: &AnalyzeRequest) -> Result<Campaign, AnalyticError> {
        let seeds = validate_seeds(&request.seed_indicators)?;
        let mut bench = Workbench::default();

        self.stage_seed_retrieval(&seeds, request, &mut bench).await?;

        let mut stage_failures = 0u32;
        let mut stages_run = 0u32;
        for method in &request.correlation_methods {
            let outcome = match method {
                CorrelationMethod::IpExact
                | CorrelationMethod::IpSubnet
                | CorrelationMethod::IpAsn => {
                    stages_run += 1;
                    self.stage_ip_correlation(*method, request, &mut bench).await
                }
                CorrelationMethod::SharedInfrastructure => {
                    stages_run += 1;
                    self.stage_infrastructure(request, &mut bench).await
                }
                CorrelationMethod::BehavioralMatch => {
                    stages_run += 1;
                    self.stage_behavioral(&mut bench);
                    Ok(())
                }
                CorrelationMethod::TemporalCluster => {
                    stages_run += 1;
                    self.stage_temporal(request, &mut bench).await
                }
                CorrelationMethod::Geospatial => {
                    stages_run += 1;
                    self.stage_geospatial(&mut bench);
                    Ok(())
                }
            };
            if let Err(error) = outcome {
                stage_failures += 1;
                self.sink.record(&StructuredEvent::now(
                    "campaign_engine",
                    "stage_failed",
                    EventLevel::Warning,
                    json!({"method": method.label(), "error": error.to_string()}),
                ));
            }
        }
        if stages_run > 0 && stage_failures == stages_run {
            return Err(AnalyticError::external(
                "campaign_engine",
                "every correlation stage failed; backend unavailable",
            ));
        }

        Ok(self.finish(request, &seeds, bench))
    }

    // ------------------------------------------------------------------
    // Stage S1: seed retrieval
    // ------------------------------------------------------------------

    /// Retrieves seed events with one query per IP-bearing path.
    async fn stage_seed_retrieval(
        &self,
        seeds: &BTreeSet<String>,
        request: &AnalyzeRequest,
        bench: &mut Workbench,
    ) -> Result<(), AnalyticError> {
        let per_path_limit = self.config.max_seed_events;
        for seed in seeds {
            for path in SEED_IP_PATHS {
                match self
                    .source
                    .events_for_path(path, seed, &request.time_range, per_path_limit)
                    .await
                {
                    Ok(events) => {
                        for event in events {
                            if bench.events.len()
                                >= usize::try_from(self.config.max_seed_events).unwrap_or(usize::MAX)
                            {
                                break;
                            }
                            bench.absorb(event, EventRole::Seed, CorrelationMethod::IpExact);
                        }
                    }
                    Err(error) => {
                        self.sink.record(&StructuredEvent::now(
                            "campaign_engine",
                            "seed_path_failed",
                            EventLevel::Warning,
                            json!({"path": path, "seed": seed, "error": error.to_string()}),
                        ));
                    }
                }
            }
        }
        if bench.events.is_empty() {
            return Err(AnalyticError::new(
                ErrorKind::ResourceNotFound,
                "no seed indicator matched any event in the window",
            )
            .with_data(json!({"code": "no_seed_events"})));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stage S2: IP correlation
    // ------------------------------------------------------------------

    /// Expands the working set by exact IP, subnet, or ASN.
    async fn stage_ip_correlation(
        &self,
        method: CorrelationMethod,
        request: &AnalyzeRequest,
        bench: &mut Workbench,
    ) -> Result<(), AnalyticError> {
        let budget = self.config.stage_event_budget;
        let values: Vec<Value> = match method {
            CorrelationMethod::IpExact => {
                bench.all_ips().iter().map(|ip| json!(ip.to_string())).collect()
            }
            CorrelationMethod::IpSubnet => {
                let subnets: BTreeSet<String> = bench
                    .all_ips()
                    .iter()
                    .filter_map(|ip| subnet_of(*ip, self.config.subnet_prefix_v4))
                    .collect();
                self.record_subnet_edges(&subnets, bench);
                subnets.into_iter().map(|subnet| json!(subnet)).collect()
            }
            CorrelationMethod::IpAsn => {
                let asns: BTreeSet<u32> =
                    bench.events.values().filter_map(|event| event.asn).collect();
                asns.into_iter().map(|asn| json!(asn)).collect()
            }
            _ => Vec::new(),
        };
        if values.is_empty() {
            return Ok(());
        }
        let field = if method == CorrelationMethod::IpAsn { "asn" } else { "source_ip" };
        let events =
            self.source.events_matching(field, &values, &request.time_range, budget).await?;
        for event in sorted_by_id(events) {
            let id = event.id.clone();
            if bench.events.contains_key(&id) {
                bench.reinforce(&id, method);
            } else {
                bench.absorb(event, EventRole::Correlated, method);
            }
        }
        Ok(())
    }

    /// Records same-subnet relationship edges.
    fn record_subnet_edges(&self, subnets: &BTreeSet<String>, bench: &mut Workbench) {
        for subnet in subnets {
            let members: Vec<&SecurityEvent> = bench
                .events
                .values()
                .filter(|event| {
                    event
                        .source_ip
                        .and_then(|ip| subnet_of(ip, self.config.subnet_prefix_v4))
                        .is_some_and(|candidate| candidate == *subnet)
                })
                .collect();
            if members.len() < 2 {
                continue;
            }
            let evidence: Vec<String> = members.iter().map(|event| event.id.clone()).collect();
            let mut ips: BTreeSet<String> = members
                .iter()
                .filter_map(|event| event.source_ip.map(|ip| ip.to_string()))
                .collect();
            let Some(first) = ips.iter().next().cloned() else {
                continue;
            };
            ips.remove(&first);
            for other in ips {
                bench.relationships.push(IndicatorRelationship {
                    source_indicator: first.clone(),
                    related_indicator: other,
                    relation_kind: RelationKind::SameSubnet,
                    confidence: 0.6,
                    evidence_event_ids: evidence.clone(),
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Stage S3: infrastructure correlation
    // ------------------------------------------------------------------

    /// Expands the working set by shared infrastructure indicators.
    async fn stage_infrastructure(
        &self,
        request: &AnalyzeRequest,
        bench: &mut Workbench,
    ) -> Result<(), AnalyticError> {
        let mut domains: BTreeSet<String> = BTreeSet::new();
        let mut user_agents: BTreeSet<String> = BTreeSet::new();
        for event in bench.events.values() {
            for indicator in infrastructure_indicators(event) {
                match indicator {
                    InfraIndicator::Domain(domain) => {
                        domains.insert(domain);
                    }
                    InfraIndicator::UserAgent(agent) => {
                        user_agents.insert(agent);
                    }
                }
            }
        }
        let budget = self.config.stage_event_budget;
        for (field, values) in [("domain", domains), ("user_agent", user_agents)] {
            if values.is_empty() {
                continue;
            }
            let values: Vec<Value> = values.iter().map(|value| json!(value)).collect();
            let events =
                self.source.events_matching(field, &values, &request.time_range, budget).await?;
            for event in sorted_by_id(events) {
                let id = event.id.clone();
                if bench.events.contains_key(&id) {
                    bench.reinforce(&id, CorrelationMethod::SharedInfrastructure);
                } else {
                    bench.absorb(
                        event,
                        EventRole::Correlated,
                        CorrelationMethod::SharedInfrastructure,
                    );
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stage S4: behavioral correlation
    // ------------------------------------------------------------------

    /// Reinforces events whose source IPs behave alike.
    ///
    /// Two IPs correlate when the edit distance between their event-kind
    /// sequences falls below the configured threshold, or when they share
    /// a normalized payload signature.
    fn stage_behavioral(&self, bench: &mut Workbench) {
        let sequences: BTreeMap<IpAddr, Vec<&'static str>> = behavior_sequences(bench);
        let ips: Vec<IpAddr> = sequences.keys().copied().collect();
        let mut correlated: BTreeSet<IpAddr> = BTreeSet::new();
        for (index, left) in ips.iter().enumerate() {
            for right in ips.iter().skip(index + 1) {
                let distance = sequence_distance(&sequences[left], &sequences[right]);
                if distance <= self.config.behavioral_distance_threshold {
                    correlated.insert(*left);
                    correlated.insert(*right);
                    let evidence = events_for_source(bench, *left)
                        .chain(events_for_source(bench, *right))
                        .collect();
                    bench.relationships.push(IndicatorRelationship {
                        source_indicator: left.to_string(),
                        related_indicator: right.to_string(),
                        relation_kind: RelationKind::BehavioralMatch,
                        confidence: 0.7,
                        evidence_event_ids: evidence,
                    });
                }
            }
        }
        let reinforced: Vec<String> = bench
            .events
            .values()
            .filter(|event| event.source_ip.is_some_and(|ip| correlated.contains(&ip)))
            .map(|event| event.id.clone())
            .collect();
        for id in reinforced {
            bench.reinforce(&id, CorrelationMethod::BehavioralMatch);
        }
    }

    // ------------------------------------------------------------------
    // Stage S5: temporal correlation
    // ------------------------------------------------------------------

    /// Adds events falling inside windows populated by the working set.
    async fn stage_temporal(
        &self,
        request: &AnalyzeRequest,
        bench: &mut Workbench,
    ) -> Result<(), AnalyticError> {
        let window =
            time::Duration::minutes(i64::from(self.config.window_minutes));
        let populated: BTreeSet<i64> = bench
            .events
            .values()
            .map(|event| window_index(event, window))
            .collect();
        let candidates = self
            .source
            .recent_events(&request.time_range, self.config.stage_event_budget)
            .await?;
        let included: Vec<time::OffsetDateTime> =
            bench.events.values().map(|event| event.timestamp).collect();
        let tau = f64::from(self.config.tau_seconds);
        for event in sorted_by_id(candidates) {
            let id = event.id.clone();
            if bench.events.contains_key(&id) {
                bench.reinforce(&id, CorrelationMethod::TemporalCluster);
                continue;
            }
            if !populated.contains(&window_index(&event, window)) {
                continue;
            }
            let nearest = included
                .iter()
                .map(|at| (event.timestamp - *at).whole_seconds().abs())
                .min()
                .unwrap_or(i64::MAX);
            let proximity = f64::exp(-to_f64_seconds(nearest) / tau);
            bench.proximity.insert(event.id.clone(), proximity);
            bench.absorb(event, EventRole::Correlated, CorrelationMethod::TemporalCluster);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Geospatial correlation
    // ------------------------------------------------------------------

    /// Reinforces events sharing country attribution with the seeds.
    fn stage_geospatial(&self, bench: &mut Workbench) {
        let seed_countries: BTreeSet<String> = bench
            .roles
            .iter()
            .filter(|(_, role)| **role == EventRole::Seed)
            .filter_map(|(id, _)| bench.events.get(id).and_then(|event| event.country.clone()))
            .collect();
        if seed_countries.is_empty() {
            return;
        }
        let reinforced: Vec<String> = bench
            .events
            .values()
            .filter(|event| {
                event.country.as_ref().is_some_and(|country| seed_countries.contains(country))
            })
            .map(|event| event.id.clone())
            .collect();
        for id in reinforced {
            bench.reinforce(&id, CorrelationMethod::Geospatial);
        }
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Scores events, derives confidence, and assembles the campaign.
    fn finish(
        &self,
        request: &AnalyzeRequest,
        seeds: &BTreeSet<String>,
        bench: Workbench,
    ) -> Campaign {
        let active_methods: Vec<CorrelationMethod> = {
            let mut methods = vec![CorrelationMethod::IpExact];
            methods.extend(request.correlation_methods.iter().copied());
            methods.sort_unstable();
            methods.dedup();
            methods
        };
        let decay = self.config.method_decay;
        let mut members: Vec<CampaignEvent> = Vec::with_capacity(bench.events.len());
        for (id, event) in &bench.events {
            let touched = bench.methods.get(id).cloned().unwrap_or_default();
            let score_sum: f64 = active_methods
                .iter()
                .map(|method| if touched.contains(method) { 1.0 } else { decay })
                .sum();
            let confidence = score_sum / to_f64_count(active_methods.len().max(1));
            if confidence < request.min_confidence {
                continue;
            }
            members.push(CampaignEvent {
                event: event.clone(),
                confidence,
                time_proximity_score: bench.proximity.get(id).copied().unwrap_or(1.0),
                role: bench.roles.get(id).copied().unwrap_or(EventRole::Correlated),
            });
        }
        members.sort_by(|a, b| {
            a.event.timestamp.cmp(&b.event.timestamp).then(a.event.id.cmp(&b.event.id))
        });

        let confidence_score = if members.is_empty() {
            0.0
        } else {
            members.iter().map(|member| member.confidence).sum::<f64>()
                / to_f64_count(members.len())
        };
        let start_time = members
            .first()
            .map_or(request.time_range.start, |member| member.event.timestamp);
        let end_time =
            members.last().map_or(request.time_range.end, |member| member.event.timestamp);

        let mut related_indicators: BTreeSet<String> =
            members.iter().flat_map(|member| member.event.ips()).map(|ip| ip.to_string()).collect();
        if !members.is_empty() {
            related_indicators.extend(seeds.iter().cloned());
        }
        let attack_vectors: BTreeSet<String> = members
            .iter()
            .map(|member| member.event.event_kind.label().to_string())
            .collect();

        let mut campaign = Campaign {
            campaign_id: campaign_id(seeds, start_time, end_time),
            confidence: CampaignConfidence::from_score(confidence_score),
            confidence_score,
            start_time,
            end_time,
            seed_indicators: seeds.clone(),
            related_indicators,
            events: members,
            correlation_methods_used: bench.methods_used.clone(),
            attack_vectors,
            suspected_actor: None,
            sophistication_score: 0.0,
        };
        campaign.sophistication_score = score_campaign(&campaign);
        if let Ok(mut registry) = self.registry.lock() {
            registry.insert(campaign.campaign_id.clone(), campaign.clone());
        }
        self.store_relationships(&campaign.campaign_id, bench.relationships);
        campaign
    }

    /// Retains discovered relationships alongside the campaign.
    fn store_relationships(&self, campaign_id: &str, relationships: Vec<IndicatorRelationship>) {
        if let Ok(mut edges) = self.edges.lock() {
            edges.insert(campaign_id.to_string(), relationships);
        }
    }

    /// Returns the relationships recorded for a campaign.
    #[must_use]
    pub fn relationships(&self, campaign_id: &str) -> Vec<IndicatorRelationship> {
        self.edges
            .lock()
            .ok()
            .and_then(|edges| edges.get(campaign_id).cloned())
            .unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates and normalizes seed indicators.
fn validate_seeds(seeds: &[String]) -> Result<BTreeSet<String>, AnalyticError> {
    if seeds.is_empty() {
        return Err(AnalyticError::validation("seed_indicators must be non-empty"));
    }
    let mut validated = BTreeSet::new();
    for seed in seeds {
        let parsed: IpAddr = seed
            .parse()
            .map_err(|_| AnalyticError::validation(format!("seed {seed} is not a valid IP")))?;
        validated.insert(parsed.to_string());
    }
    Ok(validated)
}

/// Returns the /prefix subnet of an IPv4 address in CIDR form.
fn subnet_of(ip: IpAddr, prefix: u8) -> Option<String> {
    let IpAddr::V4(v4) = ip else {
        return None;
    };
    let bits = u32::from(v4);
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) };
    let network = std::net::Ipv4Addr::from(bits & mask);
    Some(format!("{network}/{prefix}"))
}

/// Infrastructure indicator kinds extracted from events.
enum InfraIndicator {
    /// A domain (DNS name, TLS SNI, or URL host).
    Domain(String),
    /// A client user-agent string.
    UserAgent(String),
}

/// Extracts infrastructure indicators from an event's raw document.
fn infrastructure_indicators(event: &SecurityEvent) -> Vec<InfraIndicator> {
    let mut indicators = Vec::new();
    let lookups: [(&str, &[&str]); 2] = [
        ("domain", &["destination.domain", "dns.question.name", "tls.client.server_name"]),
        ("user_agent", &["user_agent.original", "http.user_agent"]),
    ];
    for (kind, paths) in lookups {
        for path in paths {
            if let Some(value) = raw_lookup(event, path).and_then(Value::as_str) {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                indicators.push(match kind {
                    "domain" => InfraIndicator::Domain(value.to_string()),
                    _ => InfraIndicator::UserAgent(value.to_string()),
                });
            }
        }
    }
    if let Some(url) = raw_lookup(event, "url.original").and_then(Value::as_str)
        && let Some(host) = host_of(url)
    {
        indicators.push(InfraIndicator::Domain(host));
    }
    indicators
}

/// Resolves a dotted path in an event's raw document.
fn raw_lookup<'event>(event: &'event SecurityEvent, path: &str) -> Option<&'event Value> {
    if let Some(value) = event.raw.get(path) {
        return Some(value);
    }
    let (head, rest) = path.split_once('.')?;
    let mut current = event.raw.get(head)?;
    for segment in rest.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Extracts the host from a URL without a full parser.
fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.split('@').next_back()?.split(':').next()?;
    (!host.is_empty()).then(|| host.to_string())
}

/// Builds per-source event-kind sequences for behavioral comparison.
fn behavior_sequences(bench: &Workbench) -> BTreeMap<IpAddr, Vec<&'static str>> {
    let mut per_source: BTreeMap<IpAddr, Vec<(time::OffsetDateTime, &'static str)>> =
        BTreeMap::new();
    for event in bench.events.values() {
        if let Some(ip) = event.source_ip {
            per_source.entry(ip).or_default().push((event.timestamp, event.event_kind.label()));
        }
    }
    per_source
        .into_iter()
        .map(|(ip, mut entries)| {
            entries.sort_by_key(|(at, _)| *at);
            (ip, entries.into_iter().map(|(_, kind)| kind).collect())
        })
        .collect()
}

/// Edit distance between two event-kind sequences.
fn sequence_distance(left: &[&'static str], right: &[&'static str]) -> u32 {
    let mut previous: Vec<u32> = (0..=u32::try_from(right.len()).unwrap_or(u32::MAX)).collect();
    let mut current = vec![0u32; right.len() + 1];
    for (i, left_kind) in left.iter().enumerate() {
        current[0] = u32::try_from(i).unwrap_or(u32::MAX).saturating_add(1);
        for (j, right_kind) in right.iter().enumerate() {
            let substitution = previous[j] + u32::from(left_kind != right_kind);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[right.len()]
}

/// Returns the ids of events originating from a source IP.
fn events_for_source<'bench>(
    bench: &'bench Workbench,
    ip: IpAddr,
) -> impl Iterator<Item = String> + 'bench {
    bench
        .events
        .values()
        .filter(move |event| event.source_ip == Some(ip))
        .map(|event| event.id.clone())
}

/// Returns the temporal window index for an event.
fn window_index(event: &SecurityEvent, window: time::Duration) -> i64 {
    let seconds = window.whole_seconds().max(1);
    event.timestamp.unix_timestamp().div_euclid(seconds)
}

/// Sorts events by id for deterministic merging.
fn sorted_by_id(mut events: Vec<SecurityEvent>) -> Vec<SecurityEvent> {
    events.sort_by(|a, b| a.id.cmp(&b.id));
    events
}

/// Converts an absolute second count to f64.
fn to_f64_seconds(seconds: i64) -> f64 {
    u32::try_from(seconds.unsigned_abs().min(u64::from(u32::MAX)))
        .map_or(f64::MAX, f64::from)
}

/// Converts a collection length to f64.
fn to_f64_count(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::MAX, f64::from)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
