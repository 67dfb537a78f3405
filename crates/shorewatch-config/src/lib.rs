// crates/shorewatch-config/src/lib.rs
// ============================================================================
// Module: Shorewatch Configuration
// Description: Frozen configuration tree and secret resolution seams.
// Purpose: Validate and freeze every tunable the analytic core consumes.
// Dependencies: serde, thiserror, url
// ============================================================================

//! ## Overview
//! The configuration tree is deserialized once (the CLI owns file parsing),
//! secret references are resolved through a [`SecretsProvider`], the tree is
//! validated fail-closed, and the frozen value is handed to every subsystem
//! by reference. Nothing re-reads configuration after startup.
//! Security posture: configuration values are operator-supplied but secret
//! references must never be logged after resolution.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod secrets;
#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub use secrets::EnvSecrets;
pub use secrets::SecretsError;
pub use secrets::SecretsProvider;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration validation errors.
///
/// # Invariants
/// - Messages name the offending field path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// A secret reference failed to resolve.
    #[error("secret resolution failed: {0}")]
    Secret(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Transport the MCP server listens on.
///
/// # Invariants
/// - Variants are stable for CLI flags and config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Newline-delimited JSON-RPC over stdio.
    #[default]
    Stdio,
    /// Newline-delimited JSON-RPC over TCP.
    Tcp,
}

/// MCP server configuration.
///
/// # Invariants
/// - `tcp_port` is required when `transport` is `Tcp`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport selection.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the TCP transport.
    #[serde(default = "default_tcp_bind")]
    pub tcp_bind: String,
    /// Port for the TCP transport.
    #[serde(default)]
    pub tcp_port: Option<u16>,
    /// Maximum framed request size in bytes.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            tcp_bind: default_tcp_bind(),
            tcp_port: None,
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

/// Returns the default TCP bind address.
fn default_tcp_bind() -> String {
    "127.0.0.1".to_string()
}

/// Returns the default maximum framed request size.
const fn default_max_request_bytes() -> usize {
    1024 * 1024
}

// ============================================================================
// SECTION: Elasticsearch
// ============================================================================

/// Major-version compatibility bridging for the backing store.
///
/// # Invariants
/// - Variants map 1:1 to total-hits response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityMode {
    /// Detect from the response shape.
    #[default]
    Auto,
    /// Force 7.x semantics.
    Es7,
    /// Force 8.x semantics.
    Es8,
}

/// Backing SIEM (Elasticsearch-compatible) configuration.
///
/// # Invariants
/// - `url` uses the https scheme unless `allow_http` is set.
/// - `index_patterns` is non-empty.
/// - `max_window_hours`, `max_page_size`, and `max_result_size_mb` are
///   greater than zero.
#[derive(Debug, Clone, Deserialize)]
pub struct ElasticConfig {
    /// Base URL of the cluster.
    pub url: String,
    /// Allow cleartext HTTP (disabled by default).
    #[serde(default)]
    pub allow_http: bool,
    /// Optional basic-auth username.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional basic-auth password (secret reference permitted).
    #[serde(default)]
    pub password: Option<String>,
    /// Index patterns queried by the event layer.
    #[serde(default = "default_index_patterns")]
    pub index_patterns: Vec<String>,
    /// Major-version compatibility bridging.
    #[serde(default)]
    pub compatibility_mode: CompatibilityMode,
    /// Maximum query window in hours.
    #[serde(default = "default_max_window_hours")]
    pub max_window_hours: u32,
    /// Maximum page size for event queries.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Page size floor used by the optimization ladder.
    #[serde(default = "default_optimization_floor")]
    pub optimization_page_floor: u32,
    /// Page offset beyond which cursors are required.
    #[serde(default = "default_page_offset_threshold")]
    pub page_offset_threshold: u64,
    /// Hard result-size budget in megabytes.
    #[serde(default = "default_max_result_size_mb")]
    pub max_result_size_mb: u32,
    /// Estimated average document size in bytes for size budgeting.
    #[serde(default = "default_avg_document_bytes")]
    pub avg_document_bytes: u32,
    /// Stream chunk size in events.
    #[serde(default = "default_stream_chunk_size")]
    pub stream_chunk_size: u32,
    /// Resumable stream TTL in seconds.
    #[serde(default = "default_stream_ttl_seconds")]
    pub stream_ttl_seconds: u64,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:9200".to_string(),
            allow_http: false,
            username: None,
            password: None,
            index_patterns: default_index_patterns(),
            compatibility_mode: CompatibilityMode::Auto,
            max_window_hours: default_max_window_hours(),
            max_page_size: default_max_page_size(),
            optimization_page_floor: default_optimization_floor(),
            page_offset_threshold: default_page_offset_threshold(),
            max_result_size_mb: default_max_result_size_mb(),
            avg_document_bytes: default_avg_document_bytes(),
            stream_chunk_size: default_stream_chunk_size(),
            stream_ttl_seconds: default_stream_ttl_seconds(),
        }
    }
}

/// Returns the default index patterns for honeypot data.
fn default_index_patterns() -> Vec<String> {
    vec!["cowrie-*".to_string(), "netflow-*".to_string()]
}

/// Returns the default maximum query window in hours.
const fn default_max_window_hours() -> u32 {
    24 * 30
}

/// Returns the default maximum page size.
const fn default_max_page_size() -> u32 {
    1_000
}

/// Returns the default optimization page-size floor.
const fn default_optimization_floor() -> u32 {
    100
}

/// Returns the default page-offset threshold for cursor enforcement.
const fn default_page_offset_threshold() -> u64 {
    10_000
}

/// Returns the default result-size budget in megabytes.
const fn default_max_result_size_mb() -> u32 {
    10
}

/// Returns the default estimated document size in bytes.
const fn default_avg_document_bytes() -> u32 {
    2_048
}

/// Returns the default stream chunk size.
const fn default_stream_chunk_size() -> u32 {
    500
}

/// Returns the default resumable-stream TTL in seconds.
const fn default_stream_ttl_seconds() -> u64 {
    600
}

// ============================================================================
// SECTION: Threat Intelligence
// ============================================================================

/// One threat-intelligence source endpoint.
///
/// # Invariants
/// - `name` is unique across sources.
/// - `trust_weight` falls in `0..=1`; `requests_per_minute` is nonzero.
#[derive(Debug, Clone, Deserialize)]
pub struct IntelSourceConfig {
    /// Unique source name.
    pub name: String,
    /// Base URL of the source API.
    pub url: String,
    /// Optional API key (secret reference permitted).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Declared trust weight in `0..=1`.
    #[serde(default = "default_trust_weight")]
    pub trust_weight: f64,
    /// Rate limit in requests per minute.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Memory-cache TTL in seconds.
    #[serde(default = "default_memory_ttl_seconds")]
    pub memory_ttl_seconds: u64,
    /// Persistent-cache TTL in seconds.
    #[serde(default = "default_persistent_ttl_seconds")]
    pub persistent_ttl_seconds: u64,
}

/// Returns the default source trust weight.
const fn default_trust_weight() -> f64 {
    0.5
}

/// Returns the default source rate limit.
const fn default_requests_per_minute() -> u32 {
    30
}

/// Returns the default memory-cache TTL.
const fn default_memory_ttl_seconds() -> u64 {
    300
}

/// Returns the default persistent-cache TTL.
const fn default_persistent_ttl_seconds() -> u64 {
    86_400
}

/// Threat-intelligence aggregator configuration.
///
/// # Invariants
/// - `success_ratio_weight` falls in `0..=1`.
/// - `concurrency_limit` is greater than zero.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreatIntelConfig {
    /// Configured sources.
    #[serde(default)]
    pub sources: Vec<IntelSourceConfig>,
    /// Weight of the success ratio in merged confidence.
    #[serde(default = "default_success_ratio_weight")]
    pub success_ratio_weight: f64,
    /// Maximum concurrent source lookups per request.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Memory-cache capacity in entries.
    #[serde(default = "default_memory_cache_capacity")]
    pub memory_cache_capacity: usize,
    /// Window of sustained rate limiting that trips a source breaker, in
    /// seconds.
    #[serde(default = "default_rate_limit_trip_seconds")]
    pub rate_limit_trip_seconds: u64,
}

impl Default for ThreatIntelConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            success_ratio_weight: default_success_ratio_weight(),
            concurrency_limit: default_concurrency_limit(),
            memory_cache_capacity: default_memory_cache_capacity(),
            rate_limit_trip_seconds: default_rate_limit_trip_seconds(),
        }
    }
}

/// Returns the default success-ratio weight.
const fn default_success_ratio_weight() -> f64 {
    0.6
}

/// Returns the default per-request source concurrency limit.
const fn default_concurrency_limit() -> usize {
    4
}

/// Returns the default memory-cache capacity.
const fn default_memory_cache_capacity() -> usize {
    4_096
}

/// Returns the default rate-limit trip window.
const fn default_rate_limit_trip_seconds() -> u64 {
    120
}

// ============================================================================
// SECTION: Campaign Engine
// ============================================================================

/// Campaign correlation engine configuration.
///
/// # Invariants
/// - `subnet_prefix_v4` falls in `8..=30`.
/// - `behavioral_distance_threshold` is greater than zero.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    /// Maximum events retrieved per seed indicator.
    #[serde(default = "default_max_seed_events")]
    pub max_seed_events: u32,
    /// Maximum events added per correlation stage.
    #[serde(default = "default_stage_event_budget")]
    pub stage_event_budget: u32,
    /// IPv4 subnet prefix for subnet grouping.
    #[serde(default = "default_subnet_prefix_v4")]
    pub subnet_prefix_v4: u8,
    /// Temporal window width in minutes.
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
    /// Temporal decay constant tau in seconds.
    #[serde(default = "default_tau_seconds")]
    pub tau_seconds: u32,
    /// Decay factor for non-reinforcing methods in per-event confidence.
    #[serde(default = "default_method_decay")]
    pub method_decay: f64,
    /// Behavioral sequence edit-distance threshold.
    #[serde(default = "default_behavioral_distance")]
    pub behavioral_distance_threshold: u32,
    /// Indicator expansion per-level fan-out cap.
    #[serde(default = "default_expansion_fanout")]
    pub expansion_fanout_cap: usize,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            max_seed_events: default_max_seed_events(),
            stage_event_budget: default_stage_event_budget(),
            subnet_prefix_v4: default_subnet_prefix_v4(),
            window_minutes: default_window_minutes(),
            tau_seconds: default_tau_seconds(),
            method_decay: default_method_decay(),
            behavioral_distance_threshold: default_behavioral_distance(),
            expansion_fanout_cap: default_expansion_fanout(),
        }
    }
}

/// Returns the default per-seed event budget.
const fn default_max_seed_events() -> u32 {
    1_000
}

/// Returns the default per-stage event budget.
const fn default_stage_event_budget() -> u32 {
    2_000
}

/// Returns the default IPv4 subnet prefix.
const fn default_subnet_prefix_v4() -> u8 {
    24
}

/// Returns the default temporal window width.
const fn default_window_minutes() -> u32 {
    30
}

/// Returns the default temporal decay constant.
const fn default_tau_seconds() -> u32 {
    1_800
}

/// Returns the default non-reinforcing method decay.
const fn default_method_decay() -> f64 {
    0.3
}

/// Returns the default behavioral distance threshold.
const fn default_behavioral_distance() -> u32 {
    3
}

/// Returns the default expansion fan-out cap.
const fn default_expansion_fanout() -> usize {
    50
}

// ============================================================================
// SECTION: Resilience
// ============================================================================

/// Resilience substrate configuration.
///
/// # Invariants
/// - Thresholds and attempt counts are greater than zero.
#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceConfig {
    /// Consecutive failures that open a breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close a breaker.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    /// Breaker recovery timeout in seconds.
    #[serde(default = "default_recovery_timeout_seconds")]
    pub recovery_timeout_seconds: u64,
    /// Maximum concurrent half-open probes.
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
    /// Maximum retry attempts for transient failures.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base retry delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Retry backoff factor.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Maximum retry delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Retry jitter fraction in `0..=1`.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// Tool-execution deadline in seconds.
    #[serde(default = "default_tool_timeout_seconds")]
    pub tool_timeout_seconds: u64,
    /// External-service deadline in seconds.
    #[serde(default = "default_external_timeout_seconds")]
    pub external_timeout_seconds: u64,
    /// Resource-access deadline in seconds.
    #[serde(default = "default_resource_timeout_seconds")]
    pub resource_timeout_seconds: u64,
    /// Validation deadline in seconds.
    #[serde(default = "default_validation_timeout_seconds")]
    pub validation_timeout_seconds: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            recovery_timeout_seconds: default_recovery_timeout_seconds(),
            half_open_max_calls: default_half_open_max_calls(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
            tool_timeout_seconds: default_tool_timeout_seconds(),
            external_timeout_seconds: default_external_timeout_seconds(),
            resource_timeout_seconds: default_resource_timeout_seconds(),
            validation_timeout_seconds: default_validation_timeout_seconds(),
        }
    }
}

/// Returns the default breaker failure threshold.
const fn default_failure_threshold() -> u32 {
    5
}

/// Returns the default breaker success threshold.
const fn default_success_threshold() -> u32 {
    2
}

/// Returns the default breaker recovery timeout.
const fn default_recovery_timeout_seconds() -> u64 {
    30
}

/// Returns the default half-open probe cap.
const fn default_half_open_max_calls() -> u32 {
    1
}

/// Returns the default retry attempt budget.
const fn default_max_attempts() -> u32 {
    3
}

/// Returns the default base retry delay.
const fn default_base_delay_ms() -> u64 {
    200
}

/// Returns the default backoff factor.
const fn default_backoff_factor() -> f64 {
    2.0
}

/// Returns the default maximum retry delay.
const fn default_max_delay_ms() -> u64 {
    10_000
}

/// Returns the default jitter fraction.
const fn default_jitter() -> f64 {
    0.2
}

/// Returns the default tool-execution deadline.
const fn default_tool_timeout_seconds() -> u64 {
    60
}

/// Returns the default external-service deadline.
const fn default_external_timeout_seconds() -> u64 {
    15
}

/// Returns the default resource-access deadline.
const fn default_resource_timeout_seconds() -> u64 {
    5
}

/// Returns the default validation deadline.
const fn default_validation_timeout_seconds() -> u64 {
    1
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Persisted-state layout configuration.
///
/// # Invariants
/// - `directory` holds `db/` and `reports/` subdirectories at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root output directory.
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

/// Returns the default output directory under the user home.
fn default_output_directory() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("dshield-mcp-output"), |home| {
            PathBuf::from(home).join("dshield-mcp-output")
        })
}

// ============================================================================
// SECTION: Root
// ============================================================================

/// Frozen Shorewatch configuration tree.
///
/// # Invariants
/// - Validated and secret-resolved before any subsystem sees it.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ShorewatchConfig {
    /// MCP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Backing SIEM settings.
    #[serde(default)]
    pub elasticsearch: ElasticConfig,
    /// Threat-intelligence settings.
    #[serde(default)]
    pub threat_intel: ThreatIntelConfig,
    /// Campaign engine settings.
    #[serde(default)]
    pub campaign: CampaignConfig,
    /// Resilience substrate settings.
    #[serde(default)]
    pub resilience: ResilienceConfig,
    /// Persisted-state layout.
    #[serde(default)]
    pub output: OutputConfig,
}

impl ShorewatchConfig {
    /// Validates the configuration tree, failing closed on the first error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_elastic(&self.elasticsearch)?;
        validate_threat_intel(&self.threat_intel)?;
        validate_campaign(&self.campaign)?;
        validate_resilience(&self.resilience)?;
        Ok(())
    }

    /// Resolves secret references in place through the provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Secret`] when a reference cannot resolve.
    pub fn resolve_secrets(&mut self, provider: &dyn SecretsProvider) -> Result<(), ConfigError> {
        if let Some(password) = self.elasticsearch.password.as_mut() {
            *password = secrets::resolve_reference(password, provider)
                .map_err(|err| ConfigError::Secret(err.to_string()))?;
        }
        for source in &mut self.threat_intel.sources {
            if let Some(api_key) = source.api_key.as_mut() {
                *api_key = secrets::resolve_reference(api_key, provider)
                    .map_err(|err| ConfigError::Secret(err.to_string()))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates server settings.
fn validate_server(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.transport == ServerTransport::Tcp && config.tcp_port.is_none() {
        return Err(ConfigError::Invalid("server.tcp_port required for tcp transport".to_string()));
    }
    if config.max_request_bytes == 0 {
        return Err(ConfigError::Invalid(
            "server.max_request_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates SIEM settings.
fn validate_elastic(config: &ElasticConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|_| ConfigError::Invalid("elasticsearch.url is not a valid URL".to_string()))?;
    if url.scheme() == "http" && !config.allow_http {
        return Err(ConfigError::Invalid(
            "elasticsearch.url uses http without allow_http".to_string(),
        ));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid("elasticsearch.url scheme must be http(s)".to_string()));
    }
    if config.index_patterns.is_empty() {
        return Err(ConfigError::Invalid(
            "elasticsearch.index_patterns must be non-empty".to_string(),
        ));
    }
    for (label, value) in [
        ("elasticsearch.max_window_hours", u64::from(config.max_window_hours)),
        ("elasticsearch.max_page_size", u64::from(config.max_page_size)),
        ("elasticsearch.optimization_page_floor", u64::from(config.optimization_page_floor)),
        ("elasticsearch.max_result_size_mb", u64::from(config.max_result_size_mb)),
        ("elasticsearch.avg_document_bytes", u64::from(config.avg_document_bytes)),
        ("elasticsearch.stream_chunk_size", u64::from(config.stream_chunk_size)),
        ("elasticsearch.stream_ttl_seconds", config.stream_ttl_seconds),
    ] {
        if value == 0 {
            return Err(ConfigError::Invalid(format!("{label} must be greater than zero")));
        }
    }
    if config.optimization_page_floor > config.max_page_size {
        return Err(ConfigError::Invalid(
            "elasticsearch.optimization_page_floor exceeds max_page_size".to_string(),
        ));
    }
    Ok(())
}

/// Validates threat-intelligence settings.
fn validate_threat_intel(config: &ThreatIntelConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.success_ratio_weight) {
        return Err(ConfigError::Invalid(
            "threat_intel.success_ratio_weight must be in 0..=1".to_string(),
        ));
    }
    if config.concurrency_limit == 0 {
        return Err(ConfigError::Invalid(
            "threat_intel.concurrency_limit must be greater than zero".to_string(),
        ));
    }
    if config.memory_cache_capacity == 0 {
        return Err(ConfigError::Invalid(
            "threat_intel.memory_cache_capacity must be greater than zero".to_string(),
        ));
    }
    let mut names = std::collections::BTreeSet::new();
    for source in &config.sources {
        if source.name.is_empty() {
            return Err(ConfigError::Invalid("threat_intel.sources[].name is empty".to_string()));
        }
        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "threat_intel.sources name {} duplicated",
                source.name
            )));
        }
        Url::parse(&source.url).map_err(|_| {
            ConfigError::Invalid(format!("threat_intel.sources[{}].url invalid", source.name))
        })?;
        if !(0.0..=1.0).contains(&source.trust_weight) {
            return Err(ConfigError::Invalid(format!(
                "threat_intel.sources[{}].trust_weight must be in 0..=1",
                source.name
            )));
        }
        if source.requests_per_minute == 0 {
            return Err(ConfigError::Invalid(format!(
                "threat_intel.sources[{}].requests_per_minute must be greater than zero",
                source.name
            )));
        }
    }
    Ok(())
}

/// Validates campaign engine settings.
fn validate_campaign(config: &CampaignConfig) -> Result<(), ConfigError> {
    if !(8..=30).contains(&config.subnet_prefix_v4) {
        return Err(ConfigError::Invalid("campaign.subnet_prefix_v4 must be in 8..=30".to_string()));
    }
    if config.max_seed_events == 0 || config.stage_event_budget == 0 {
        return Err(ConfigError::Invalid("campaign event budgets must be greater than zero".to_string()));
    }
    if config.window_minutes == 0 || config.tau_seconds == 0 {
        return Err(ConfigError::Invalid(
            "campaign temporal parameters must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.method_decay) {
        return Err(ConfigError::Invalid("campaign.method_decay must be in 0..=1".to_string()));
    }
    if config.expansion_fanout_cap == 0 {
        return Err(ConfigError::Invalid(
            "campaign.expansion_fanout_cap must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates resilience settings.
fn validate_resilience(config: &ResilienceConfig) -> Result<(), ConfigError> {
    for (label, value) in [
        ("resilience.failure_threshold", u64::from(config.failure_threshold)),
        ("resilience.success_threshold", u64::from(config.success_threshold)),
        ("resilience.half_open_max_calls", u64::from(config.half_open_max_calls)),
        ("resilience.max_attempts", u64::from(config.max_attempts)),
        ("resilience.base_delay_ms", config.base_delay_ms),
        ("resilience.tool_timeout_seconds", config.tool_timeout_seconds),
        ("resilience.external_timeout_seconds", config.external_timeout_seconds),
        ("resilience.resource_timeout_seconds", config.resource_timeout_seconds),
        ("resilience.validation_timeout_seconds", config.validation_timeout_seconds),
    ] {
        if value == 0 {
            return Err(ConfigError::Invalid(format!("{label} must be greater than zero")));
        }
    }
    if config.backoff_factor < 1.0 {
        return Err(ConfigError::Invalid("resilience.backoff_factor must be >= 1.0".to_string()));
    }
    if !(0.0..=1.0).contains(&config.jitter) {
        return Err(ConfigError::Invalid("resilience.jitter must be in 0..=1".to_string()));
    }
    Ok(())
}

