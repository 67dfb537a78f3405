// crates/shorewatch-core/src/resilience/breaker.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Per-service closed/open/half-open breaker state machine.
// Purpose: Shed load from failing backends without consuming their credits.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! One [`CircuitBreaker`] guards one external service. Consecutive failures
//! open the breaker; after the recovery timeout it admits a bounded number
//! of half-open probes, and consecutive probe successes close it again.
//! State transitions hold the inner mutex only for the transition itself;
//! state inspection reads a lock-free atomic tag.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Circuit breaker thresholds.
///
/// # Invariants
/// - `failure_threshold`, `success_threshold`, and `half_open_max_calls`
///   are greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the breaker.
    pub success_threshold: u32,
    /// Time the breaker stays open before admitting probes.
    pub recovery_timeout: Duration,
    /// Maximum concurrent half-open probes.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
        }
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Breaker state.
///
/// # Invariants
/// - Variants are stable for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected.
    Open,
    /// A bounded number of probes is admitted.
    HalfOpen,
}

impl CircuitState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Atomic tag value for [`CircuitState::Closed`].
const TAG_CLOSED: u8 = 0;
/// Atomic tag value for [`CircuitState::Open`].
const TAG_OPEN: u8 = 1;
/// Atomic tag value for [`CircuitState::HalfOpen`].
const TAG_HALF_OPEN: u8 = 2;

/// Mutable breaker bookkeeping guarded by the state mutex.
#[derive(Debug)]
struct BreakerInner {
    /// Current state.
    state: CircuitState,
    /// Consecutive failures while closed.
    consecutive_failures: u32,
    /// Consecutive successes while half-open.
    consecutive_successes: u32,
    /// Instant the breaker last opened.
    opened_at: Option<Instant>,
    /// Probes currently in flight while half-open.
    half_open_in_flight: u32,
}

/// Snapshot of breaker state for health reporting.
///
/// # Invariants
/// - Counters reflect the state at snapshot time; they may be stale by one
///   transition.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    /// Guarded service label.
    pub service: String,
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures while closed.
    pub consecutive_failures: u32,
    /// Consecutive successes while half-open.
    pub consecutive_successes: u32,
    /// Milliseconds since the breaker opened, when open.
    pub open_for_ms: Option<u64>,
}

// ============================================================================
// SECTION: Circuit Breaker
// ============================================================================

/// Per-service circuit breaker.
///
/// # Invariants
/// - `state_tag` always mirrors `inner.state`.
/// - The inner mutex is held only for state transitions, never across I/O.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Guarded service label.
    service: String,
    /// Breaker thresholds.
    config: CircuitBreakerConfig,
    /// Lock-free state tag for inspection reads.
    state_tag: AtomicU8,
    /// Guarded bookkeeping.
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker for the named service.
    #[must_use]
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            service: service.into(),
            config,
            state_tag: AtomicU8::new(TAG_CLOSED),
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                half_open_in_flight: 0,
            }),
        }
    }

    /// Returns the guarded service label.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the current state without taking the mutex.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        match self.state_tag.load(Ordering::Acquire) {
            TAG_OPEN => CircuitState::Open,
            TAG_HALF_OPEN => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Reports whether a call may proceed, admitting half-open probes.
    ///
    /// In `Open`, the call is rejected until the recovery timeout elapses,
    /// at which point the breaker moves to `HalfOpen` and admits up to the
    /// configured number of concurrent probes. An admitted probe must be
    /// concluded with [`Self::on_success`] or [`Self::on_failure`].
    #[must_use]
    pub fn can_execute(&self) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(Duration::ZERO, |at| at.elapsed());
                if elapsed < self.config.recovery_timeout {
                    return false;
                }
                inner.state = CircuitState::HalfOpen;
                inner.consecutive_successes = 0;
                inner.half_open_in_flight = 1;
                self.state_tag.store(TAG_HALF_OPEN, Ordering::Release);
                true
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight >= self.config.half_open_max_calls {
                    return false;
                }
                inner.half_open_in_flight += 1;
                true
            }
        }
    }

    /// Records a successful call.
    pub fn on_success(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    inner.opened_at = None;
                    inner.half_open_in_flight = 0;
                    self.state_tag.store(TAG_CLOSED, Ordering::Release);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call.
    pub fn on_failure(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    inner.half_open_in_flight = 0;
                    self.state_tag.store(TAG_OPEN, Ordering::Release);
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.consecutive_successes = 0;
                inner.half_open_in_flight = 0;
                self.state_tag.store(TAG_OPEN, Ordering::Release);
            }
            CircuitState::Open => {}
        }
    }

    /// Releases an admitted probe without recording an outcome.
    ///
    /// Used when an admitted call never reached the backend (local rate
    /// limit); the half-open slot is returned and no counter moves.
    pub fn on_abandon(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    /// Returns a snapshot for health reporting.
    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        let Ok(inner) = self.inner.lock() else {
            return BreakerSnapshot {
                service: self.service.clone(),
                state: self.state(),
                consecutive_failures: 0,
                consecutive_successes: 0,
                open_for_ms: None,
            };
        };
        BreakerSnapshot {
            service: self.service.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            open_for_ms: inner
                .opened_at
                .map(|at| u64::try_from(at.elapsed().as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Frozen map of per-service breakers built at startup.
///
/// # Invariants
/// - The set of services never changes after construction.
#[derive(Debug, Clone)]
pub struct BreakerRegistry {
    /// Breakers keyed by service label.
    breakers: Arc<BTreeMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    /// Builds a registry guarding the named services.
    #[must_use]
    pub fn new(services: &[&str], config: CircuitBreakerConfig) -> Self {
        let breakers = services
            .iter()
            .map(|service| {
                ((*service).to_string(), Arc::new(CircuitBreaker::new(*service, config)))
            })
            .collect();
        Self {
            breakers: Arc::new(breakers),
        }
    }

    /// Returns the breaker for a service, when registered.
    #[must_use]
    pub fn get(&self, service: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(service).cloned()
    }

    /// Returns snapshots of every breaker for health reporting.
    #[must_use]
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers.values().map(|breaker| breaker.snapshot()).collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
