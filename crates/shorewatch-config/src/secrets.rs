// crates/shorewatch-config/src/secrets.rs
// ============================================================================
// Module: Secret Resolution
// Description: Secret reference resolution seam for configuration values.
// Purpose: Keep secret material out of configuration files.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Secret-bearing configuration fields may hold a reference of the form
//! `${env:NAME}` instead of a literal. References are resolved exactly once
//! at startup through a [`SecretsProvider`]; literals pass through
//! unchanged. Resolution failures are configuration errors and abort
//! startup.
//! Security posture: resolved values must never be echoed into logs or
//! error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Secret resolution errors.
///
/// # Invariants
/// - Messages name the reference, never the resolved value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretsError {
    /// The referenced secret does not exist.
    #[error("secret not found: {0}")]
    NotFound(String),
    /// The reference syntax is not recognized.
    #[error("unsupported secret reference: {0}")]
    Unsupported(String),
}

// ============================================================================
// SECTION: Provider Trait
// ============================================================================

/// Resolves secret references to their values.
pub trait SecretsProvider: Send + Sync {
    /// Resolves a secret by name.
    ///
    /// # Errors
    ///
    /// Returns [`SecretsError`] when the secret cannot be resolved.
    fn resolve(&self, name: &str) -> Result<String, SecretsError>;
}

/// Provider backed by process environment variables.
///
/// # Invariants
/// - Lookup is live against the process environment; values are read at
///   resolution time, not construction time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

impl SecretsProvider for EnvSecrets {
    fn resolve(&self, name: &str) -> Result<String, SecretsError> {
        std::env::var(name).map_err(|_| SecretsError::NotFound(name.to_string()))
    }
}

// ============================================================================
// SECTION: Reference Resolution
// ============================================================================

/// Resolves a configuration value that may be a secret reference.
///
/// Literals pass through unchanged. `${env:NAME}` resolves through the
/// provider.
///
/// # Errors
///
/// Returns [`SecretsError`] for unknown reference schemes or missing
/// secrets.
pub fn resolve_reference(
    value: &str,
    provider: &dyn SecretsProvider,
) -> Result<String, SecretsError> {
    let Some(body) = value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) else {
        return Ok(value.to_string());
    };
    match body.split_once(':') {
        Some(("env", name)) if !name.is_empty() => provider.resolve(name),
        _ => Err(SecretsError::Unsupported(value.to_string())),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
