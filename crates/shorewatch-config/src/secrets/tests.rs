// crates/shorewatch-config/src/secrets/tests.rs
// ============================================================================
// Module: Secret Resolution Tests
// Description: Unit tests for reference parsing and provider dispatch.
// Purpose: Validate literal pass-through and reference resolution.
// Dependencies: shorewatch-config
// ============================================================================

//! ## Overview
//! Exercises reference parsing with a table-driven fake provider.

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

use super::SecretsError;
use super::SecretsProvider;
use super::resolve_reference;

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

/// Returns a provider with one known key.
fn provider() -> TableSecrets {
    TableSecrets {
        table: [("DSHIELD_API_KEY", "k-123")].into_iter().collect(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn literals_pass_through() {
    let resolved = resolve_reference("plain-value", &provider()).expect("literal");
    assert_eq!(resolved, "plain-value");
}

#[test]
fn env_references_resolve() {
    let resolved = resolve_reference("${env:DSHIELD_API_KEY}", &provider()).expect("reference");
    assert_eq!(resolved, "k-123");
}

#[test]
fn missing_secrets_fail_closed() {
    let error = resolve_reference("${env:ABSENT}", &provider()).expect_err("missing");
    assert_eq!(error, SecretsError::NotFound("ABSENT".to_string()));
}

#[test]
fn unknown_schemes_are_rejected() {
    let error = resolve_reference("${vault:key}", &provider()).expect_err("unsupported");
    assert!(matches!(error, SecretsError::Unsupported(_)));
    let error = resolve_reference("${env:}", &provider()).expect_err("empty name");
    assert!(matches!(error, SecretsError::Unsupported(_)));
}
