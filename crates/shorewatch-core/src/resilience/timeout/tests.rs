// crates/shorewatch-core/src/resilience/timeout/tests.rs
// ============================================================================
// Module: Timeout Envelope Tests
// Description: Unit tests for deadline enforcement per class.
// Purpose: Validate expiry mapping and pass-through of inner results.
// Dependencies: shorewatch-core, tokio
// ============================================================================

//! ## Overview
//! Exercises deadline expiry and inner-result pass-through with short
//! envelopes.

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

use std::time::Duration;

use super::TimeoutClass;
use super::TimeoutEnvelope;
use super::with_deadline;
use crate::error::AnalyticError;
use crate::error::ErrorKind;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns an envelope with very short deadlines.
fn short_envelope() -> TimeoutEnvelope {
    TimeoutEnvelope {
        tool_execution: Duration::from_millis(50),
        external_service: Duration::from_millis(20),
        resource_access: Duration::from_millis(20),
        validation: Duration::from_millis(10),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn expiry_maps_to_timeout_kind() {
    let envelope = short_envelope();
    let result: Result<(), AnalyticError> =
        with_deadline(&envelope, TimeoutClass::ExternalService, "siem search", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
    let error = result.expect_err("deadline elapses");
    assert_eq!(error.kind, ErrorKind::Timeout);
    assert!(error.message.contains("external_service"));
}

#[tokio::test]
async fn fast_operations_pass_through() {
    let envelope = short_envelope();
    let result =
        with_deadline(&envelope, TimeoutClass::Validation, "arg check", async { Ok(7u32) }).await;
    assert_eq!(result.ok(), Some(7));
}

#[tokio::test]
async fn inner_errors_are_not_rewritten() {
    let envelope = short_envelope();
    let result: Result<(), AnalyticError> =
        with_deadline(&envelope, TimeoutClass::ToolExecution, "tool", async {
            Err(AnalyticError::validation("bad arg"))
        })
        .await;
    assert_eq!(result.expect_err("inner error").kind, ErrorKind::Validation);
}

#[test]
fn envelope_resolves_each_class() {
    let envelope = short_envelope();
    assert_eq!(envelope.deadline(TimeoutClass::ToolExecution), Duration::from_millis(50));
    assert_eq!(envelope.deadline(TimeoutClass::ExternalService), Duration::from_millis(20));
    assert_eq!(envelope.deadline(TimeoutClass::ResourceAccess), Duration::from_millis(20));
    assert_eq!(envelope.deadline(TimeoutClass::Validation), Duration::from_millis(10));
}
