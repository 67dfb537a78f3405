// crates/shorewatch-cli/src/wiring/tests.rs
// ============================================================================
// Module: Service Wiring Tests
// Description: Unit tests for startup wiring from configuration.
// Purpose: Validate the service graph builds from a frozen config.
// Dependencies: shorewatch-cli, tempfile
// ============================================================================

//! ## Overview
//! Builds the full service graph against a temporary output directory and
//! asserts the tool surface and output layout.

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

use shorewatch_config::IntelSourceConfig;
use shorewatch_config::ShorewatchConfig;

use super::build_server;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns a config rooted in a temporary output directory.
fn config_in_temp_dir(dir: &tempfile::TempDir) -> ShorewatchConfig {
    let mut config = ShorewatchConfig::default();
    config.output.directory = dir.path().to_path_buf();
    config
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn graph_builds_without_intel_sources() {
    let dir = tempfile::tempdir().expect("temp dir");
    let built = build_server(&config_in_temp_dir(&dir)).expect("wiring");
    assert_eq!(built.router.definitions().len(), 11);
    assert!(built.router.context().intel.is_none());
    assert!(dir.path().join("db").exists(), "db directory bootstrapped");
    assert!(dir.path().join("reports").exists(), "reports directory bootstrapped");
    assert!(!built.features.snapshot().elasticsearch, "features start unhealthy");
}

#[test]
fn graph_builds_with_intel_sources_and_breakers() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = config_in_temp_dir(&dir);
    config.threat_intel.sources = vec![IntelSourceConfig {
        name: "dshield".to_string(),
        url: "https://intel.example.org/api".to_string(),
        api_key: None,
        trust_weight: 0.8,
        requests_per_minute: 30,
        memory_ttl_seconds: 300,
        persistent_ttl_seconds: 86_400,
    }];
    let built = build_server(&config).expect("wiring");
    let context = built.router.context();
    assert!(context.intel.is_some());
    assert!(context.breakers.get("dshield").is_some(), "per-source breaker registered");
    assert!(context.breakers.get("elasticsearch").is_some());
}
