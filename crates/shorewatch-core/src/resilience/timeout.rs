// crates/shorewatch-core/src/resilience/timeout.rs
// ============================================================================
// Module: Timeout Envelopes
// Description: Per-operation-class deadlines with cancellation.
// Purpose: Bound every operation with a class-appropriate deadline.
// Dependencies: serde, tokio
// ============================================================================

//! ## Overview
//! Every operation runs inside a deadline drawn from its class: tool
//! execution, external service calls, resource access, or validation.
//! [`with_deadline`] attaches the deadline with `tokio::time::timeout`;
//! dropping the future on expiry cancels any in-flight I/O the operation
//! owns, and the caller observes a `Timeout` error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::AnalyticError;

// ============================================================================
// SECTION: Classes
// ============================================================================

/// Operation class a deadline is drawn from.
///
/// # Invariants
/// - Variants are stable for tool descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutClass {
    /// Complete tool invocation.
    ToolExecution,
    /// One outbound call to an external service.
    ExternalService,
    /// Local resource access (persistent cache, report files).
    ResourceAccess,
    /// Pure validation work.
    Validation,
}

impl TimeoutClass {
    /// Returns a stable label for the class.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ToolExecution => "tool_execution",
            Self::ExternalService => "external_service",
            Self::ResourceAccess => "resource_access",
            Self::Validation => "validation",
        }
    }
}

/// Deadline budget per operation class.
///
/// # Invariants
/// - All durations are greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutEnvelope {
    /// Deadline for a complete tool invocation.
    pub tool_execution: Duration,
    /// Deadline for one external service call.
    pub external_service: Duration,
    /// Deadline for local resource access.
    pub resource_access: Duration,
    /// Deadline for validation work.
    pub validation: Duration,
}

impl Default for TimeoutEnvelope {
    fn default() -> Self {
        Self {
            tool_execution: Duration::from_secs(60),
            external_service: Duration::from_secs(15),
            resource_access: Duration::from_secs(5),
            validation: Duration::from_secs(1),
        }
    }
}

impl TimeoutEnvelope {
    /// Returns the deadline for an operation class.
    #[must_use]
    pub const fn deadline(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::ToolExecution => self.tool_execution,
            TimeoutClass::ExternalService => self.external_service,
            TimeoutClass::ResourceAccess => self.resource_access,
            TimeoutClass::Validation => self.validation,
        }
    }
}

// ============================================================================
// SECTION: Deadline Wrapper
// ============================================================================

/// Runs a future under the deadline for its class.
///
/// On expiry the future is dropped, cancelling in-flight I/O it owns;
/// partial results are discarded by construction.
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `Timeout` when the deadline elapses,
/// or the operation's own error otherwise.
pub async fn with_deadline<T, Fut>(
    envelope: &TimeoutEnvelope,
    class: TimeoutClass,
    operation_label: &str,
    future: Fut,
) -> Result<T, AnalyticError>
where
    Fut: Future<Output = Result<T, AnalyticError>>,
{
    match tokio::time::timeout(envelope.deadline(class), future).await {
        Ok(result) => result,
        Err(_) => Err(AnalyticError::timeout(format!("{} ({})", operation_label, class.label()))),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
