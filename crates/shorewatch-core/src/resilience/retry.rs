// crates/shorewatch-core/src/resilience/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Bounded retry with exponential backoff and jitter.
// Purpose: Retry transient failures without bypassing the breaker.
// Dependencies: rand, serde, tokio
// ============================================================================

//! ## Overview
//! [`retry_with_policy`] wraps an async operation in a bounded retry loop.
//! Only transient kinds (`ExternalService`, `Timeout`, `RateLimited`) are
//! retried; validation failures, breaker rejections, and internal errors
//! surface immediately. The delay before attempt `n` is
//! `min(base * factor^(n-1), max_delay)` with uniform jitter, and every
//! attempt re-consults the breaker so retries never bypass it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::error::AnalyticError;
use crate::resilience::breaker::CircuitBreaker;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry policy parameters.
///
/// # Invariants
/// - `max_attempts >= 1`; `factor >= 1.0`; `jitter` falls in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts including the first.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied per attempt.
    pub factor: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Jitter fraction of the computed delay.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            factor: 2.0,
            max_delay: Duration::from_secs(10),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Computes the nominal (jitter-free) delay before retry `attempt`.
    ///
    /// `attempt` is 1-based: the delay taken after the first failure is
    /// `delay_for_attempt(1)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.factor.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let nominal = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(nominal.min(self.max_delay.as_secs_f64()))
    }

    /// Applies uniform jitter in `[-jitter, +jitter]` of the delay.
    #[must_use]
    pub fn jittered(&self, nominal: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return nominal;
        }
        let spread = nominal.as_secs_f64() * self.jitter;
        let offset = rand::thread_rng().gen_range(-spread ..= spread);
        Duration::from_secs_f64((nominal.as_secs_f64() + offset).max(0.0))
    }
}

// ============================================================================
// SECTION: Retry Loop
// ============================================================================

/// Runs an operation under the retry policy and optional breaker.
///
/// Each attempt consults the breaker first; a rejected attempt fails with
/// `CircuitOpen` without consuming a backend credit. Successes and failures
/// are reported back to the breaker.
///
/// # Errors
///
/// Returns the last [`AnalyticError`] once attempts are exhausted, or
/// immediately for non-transient kinds and breaker rejections.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    breaker: Option<&CircuitBreaker>,
    mut operation: F,
) -> Result<T, AnalyticError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalyticError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if let Some(breaker) = breaker
            && !breaker.can_execute()
        {
            return Err(AnalyticError::circuit_open(breaker.service()));
        }
        match operation().await {
            Ok(value) => {
                if let Some(breaker) = breaker {
                    breaker.on_success();
                }
                return Ok(value);
            }
            Err(error) => {
                if let Some(breaker) = breaker {
                    breaker.on_failure();
                }
                if !error.is_transient() || attempt >= policy.max_attempts {
                    return Err(error);
                }
                let delay = policy.jittered(policy.delay_for_attempt(attempt));
                tokio::time::sleep(delay).await;
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
