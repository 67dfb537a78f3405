// crates/shorewatch-config/src/tests.rs
// ============================================================================
// Module: Configuration Tests
// Description: Unit tests for validation and secret substitution.
// Purpose: Validate fail-closed checks over the configuration tree.
// Dependencies: shorewatch-config, toml
// ============================================================================

//! ## Overview
//! Exercises tree validation, defaults, and in-place secret resolution.

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

use super::ConfigError;
use super::IntelSourceConfig;
use super::ServerTransport;
use super::ShorewatchConfig;
use super::secrets::SecretsError;
use super::secrets::SecretsProvider;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Table-driven provider for deterministic tests.
struct TableSecrets {
    /// Known secrets.
    table: BTreeMap<&'static str, &'static str>,
}

impl SecretsProvider for TableSecrets {
    fn resolve(&self, name: &str) -> Result<String, SecretsError> {
        self.table
            .get(name)
            .map(|value| (*value).to_string())
            .ok_or_else(|| SecretsError::NotFound(name.to_string()))
    }
}

/// Returns an intel source pointing at a placeholder endpoint.
fn sample_source(name: &str) -> IntelSourceConfig {
    IntelSourceConfig {
        name: name.to_string(),
        url: "https://intel.example.org/api".to_string(),
        api_key: Some("${env:INTEL_KEY}".to_string()),
        trust_weight: 0.8,
        requests_per_minute: 30,
        memory_ttl_seconds: 300,
        persistent_ttl_seconds: 86_400,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn defaults_validate() {
    let config = ShorewatchConfig::default();
    assert!(config.validate().is_ok());
}

#[test]
fn toml_round_trip_with_defaults() {
    let raw = r#"
        [elasticsearch]
        url = "https://siem.internal:9200"
        index_patterns = ["cowrie-*"]

        [server]
        transport = "stdio"
    "#;
    let config: ShorewatchConfig = toml::from_str(raw).expect("parse");
    assert_eq!(config.server.transport, ServerTransport::Stdio);
    assert_eq!(config.elasticsearch.max_page_size, 1_000);
    assert!(config.validate().is_ok());
}

#[test]
fn tcp_transport_requires_a_port() {
    let mut config = ShorewatchConfig::default();
    config.server.transport = ServerTransport::Tcp;
    let error = config.validate().expect_err("missing port");
    assert!(matches!(error, ConfigError::Invalid(message) if message.contains("tcp_port")));
}

#[test]
fn cleartext_url_requires_allow_http() {
    let mut config = ShorewatchConfig::default();
    config.elasticsearch.url = "http://siem.internal:9200".to_string();
    assert!(config.validate().is_err());
    config.elasticsearch.allow_http = true;
    assert!(config.validate().is_ok());
}

#[test]
fn duplicate_source_names_are_rejected() {
    let mut config = ShorewatchConfig::default();
    config.threat_intel.sources = vec![sample_source("dshield"), sample_source("dshield")];
    let error = config.validate().expect_err("duplicate names");
    assert!(matches!(error, ConfigError::Invalid(message) if message.contains("duplicated")));
}

#[test]
fn optimization_floor_cannot_exceed_page_size() {
    let mut config = ShorewatchConfig::default();
    config.elasticsearch.optimization_page_floor = config.elasticsearch.max_page_size + 1;
    assert!(config.validate().is_err());
}

#[test]
fn subnet_prefix_bounds_are_enforced() {
    let mut config = ShorewatchConfig::default();
    config.campaign.subnet_prefix_v4 = 31;
    assert!(config.validate().is_err());
    config.campaign.subnet_prefix_v4 = 7;
    assert!(config.validate().is_err());
    config.campaign.subnet_prefix_v4 = 24;
    assert!(config.validate().is_ok());
}

#[test]
fn secrets_resolve_in_place() {
    let mut config = ShorewatchConfig::default();
    config.threat_intel.sources = vec![sample_source("dshield")];
    config.elasticsearch.password = Some("literal-password".to_string());
    let provider = TableSecrets {
        table: [("INTEL_KEY", "k-9")].into_iter().collect(),
    };
    config.resolve_secrets(&provider).expect("resolve");
    assert_eq!(config.threat_intel.sources[0].api_key.as_deref(), Some("k-9"));
    assert_eq!(config.elasticsearch.password.as_deref(), Some("literal-password"));
}

#[test]
fn unresolvable_secret_aborts() {
    let mut config = ShorewatchConfig::default();
    config.threat_intel.sources = vec![sample_source("dshield")];
    let provider = TableSecrets {
        table: BTreeMap::new(),
    };
    let error = config.resolve_secrets(&provider).expect_err("missing secret");
    assert!(matches!(error, ConfigError::Secret(_)));
}
