// crates/shorewatch-core/src/resilience/breaker/tests.rs
// ============================================================================
// Module: Circuit Breaker Tests
// Description: Unit tests for breaker transitions and probe accounting.
// Purpose: Validate trip, recovery, and half-open admission behavior.
// Dependencies: shorewatch-core
// ============================================================================

//! ## Overview
//! Drives the breaker through trip-and-recover cycles with short recovery
//! timeouts and asserts probe admission limits.

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
use std::time::Instant;

use super::CircuitBreaker;
use super::CircuitBreakerConfig;
use super::CircuitState;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns a breaker with a short recovery timeout for tests.
fn test_breaker(recovery_ms: u64) -> CircuitBreaker {
    CircuitBreaker::new(
        "mock-siem",
        CircuitBreakerConfig {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_millis(recovery_ms),
            half_open_max_calls: 1,
        },
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn five_consecutive_failures_trip_the_breaker() {
    let breaker = test_breaker(60_000);
    for _ in 0 .. 4 {
        assert!(breaker.can_execute());
        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
    assert!(breaker.can_execute());
    breaker.on_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.can_execute());
}

#[test]
fn open_rejection_is_fast() {
    let breaker = test_breaker(60_000);
    for _ in 0 .. 5 {
        breaker.on_failure();
    }
    let started = Instant::now();
    for _ in 0 .. 1_000 {
        assert!(!breaker.can_execute());
    }
    assert!(started.elapsed() < Duration::from_millis(5));
}

#[test]
fn recovery_admits_probes_and_successes_close() {
    let breaker = test_breaker(20);
    for _ in 0 .. 5 {
        breaker.on_failure();
    }
    assert!(!breaker.can_execute());
    std::thread::sleep(Duration::from_millis(30));

    // First probe admitted; concurrent probe over the cap rejected.
    assert!(breaker.can_execute());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(!breaker.can_execute());
    breaker.on_success();

    assert!(breaker.can_execute());
    breaker.on_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(breaker.can_execute());
}

#[test]
fn half_open_failure_reopens_with_fresh_timer() {
    let breaker = test_breaker(20);
    for _ in 0 .. 5 {
        breaker.on_failure();
    }
    std::thread::sleep(Duration::from_millis(30));
    assert!(breaker.can_execute());
    breaker.on_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.can_execute());
    std::thread::sleep(Duration::from_millis(30));
    assert!(breaker.can_execute());
}

#[test]
fn consecutive_failure_count_resets_on_success() {
    let breaker = test_breaker(60_000);
    for _ in 0 .. 4 {
        breaker.on_failure();
    }
    breaker.on_success();
    for _ in 0 .. 4 {
        breaker.on_failure();
    }
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[test]
fn abandoned_probes_release_the_half_open_slot() {
    let breaker = test_breaker(20);
    for _ in 0 .. 5 {
        breaker.on_failure();
    }
    std::thread::sleep(Duration::from_millis(30));
    assert!(breaker.can_execute());
    breaker.on_abandon();
    // The slot is free again and the abandonment counted as neither
    // success nor failure.
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(breaker.can_execute());
    breaker.on_success();
    assert!(breaker.can_execute());
    breaker.on_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[test]
fn snapshot_reports_state_and_counters() {
    let breaker = test_breaker(60_000);
    breaker.on_failure();
    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.service, "mock-siem");
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.consecutive_failures, 1);
    assert!(snapshot.open_for_ms.is_none());
}
