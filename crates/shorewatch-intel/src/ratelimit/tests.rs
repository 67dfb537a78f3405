// crates/shorewatch-intel/src/ratelimit/tests.rs
// ============================================================================
// Module: Rate Limiter Tests
// Description: Unit tests for the non-blocking token bucket.
// Purpose: Validate draining, non-blocking rejection, and refill.
// Dependencies: shorewatch-intel
// ============================================================================

//! ## Overview
//! Exercises the bucket with burst draining and timed refill.

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

use super::TokenBucket;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn bucket_allows_a_burst_then_rejects() {
    let bucket = TokenBucket::per_minute(5);
    for _ in 0 .. 5 {
        assert!(bucket.try_acquire());
    }
    assert!(!bucket.try_acquire(), "drained bucket rejects");
    assert_eq!(bucket.remaining(), 0);
}

#[test]
fn rejection_is_non_blocking() {
    let bucket = TokenBucket::per_minute(1);
    assert!(bucket.try_acquire());
    let started = Instant::now();
    for _ in 0 .. 1_000 {
        let _ = bucket.try_acquire();
    }
    assert!(started.elapsed() < Duration::from_millis(50));
}

#[test]
fn tokens_regenerate_over_time() {
    // 600 per minute = 10 per second; 200 ms should earn two tokens.
    let bucket = TokenBucket::per_minute(600);
    while bucket.try_acquire() {}
    assert_eq!(bucket.remaining(), 0);
    std::thread::sleep(Duration::from_millis(250));
    assert!(bucket.try_acquire(), "tokens must regenerate");
}

#[test]
fn refill_never_exceeds_the_burst_cap() {
    let bucket = TokenBucket::per_minute(3);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(bucket.remaining(), 3);
}
