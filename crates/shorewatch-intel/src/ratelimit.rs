// crates/shorewatch-intel/src/ratelimit.rs
// ============================================================================
// Module: Source Rate Limiting
// Description: Non-blocking per-source token bucket.
// Purpose: Enforce requests-per-minute limits without blocking callers.
// Dependencies: std
// ============================================================================

//! ## Overview
//! One token bucket per source. Tokens regenerate continuously from the
//! configured per-minute rate; acquisition is non-blocking and a drained
//! bucket reports rate limiting instead of waiting. The aggregator maps a
//! failed acquisition to a `RateLimited` source failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

// ============================================================================
// SECTION: Token Bucket
// ============================================================================

/// Non-blocking token bucket.
///
/// # Invariants
/// - The token count never exceeds `max_tokens`.
/// - Acquisition never blocks; refill happens inline on access.
#[derive(Debug)]
pub struct TokenBucket {
    /// Current whole tokens.
    tokens: AtomicU64,
    /// Maximum (burst) tokens.
    max_tokens: u64,
    /// Regeneration rate in tokens per second.
    refill_per_second: f64,
    /// Instant of the last refill, guarded for fractional accounting.
    last_refill: Mutex<Instant>,
}

impl TokenBucket {
    /// Creates a bucket from a requests-per-minute limit.
    ///
    /// The burst size equals one minute's budget.
    #[must_use]
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let max_tokens = u64::from(requests_per_minute.max(1));
        Self {
            tokens: AtomicU64::new(max_tokens),
            max_tokens,
            refill_per_second: f64::from(requests_per_minute.max(1)) / 60.0,
            last_refill: Mutex::new(Instant::now()),
        }
    }

    /// Attempts to consume one token.
    ///
    /// Returns false when the bucket is drained; the caller reports rate
    /// limiting rather than waiting.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.refill();
        loop {
            let current = self.tokens.load(Ordering::Acquire);
            if current == 0 {
                return false;
            }
            if self
                .tokens
                .compare_exchange_weak(current, current - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Returns the remaining whole tokens after a refill.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.refill();
        self.tokens.load(Ordering::Acquire)
    }

    /// Regenerates tokens from elapsed time.
    fn refill(&self) {
        let Ok(mut last_refill) = self.last_refill.lock() else {
            return;
        };
        let elapsed = last_refill.elapsed();
        let earned = elapsed.as_secs_f64() * self.refill_per_second;
        if earned < 1.0 {
            return;
        }
        // Only whole tokens are credited; the remainder stays accrued by
        // keeping last_refill at the instant the credited tokens were
        // earned.
        let whole = earned.floor();
        let credited = if whole >= 9_007_199_254_740_992.0 {
            u64::MAX
        } else {
            // Bounded by the check above.
            #[allow(clippy::cast_possible_truncation, reason = "Bounded by the range check above.")]
            #[allow(clippy::cast_sign_loss, reason = "floor of a positive value")]
            {
                whole as u64
            }
        };
        let current = self.tokens.load(Ordering::Acquire);
        let refreshed = current.saturating_add(credited).min(self.max_tokens);
        self.tokens.store(refreshed, Ordering::Release);
        *last_refill = Instant::now();
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
