// crates/shorewatch-intel/src/aggregator.rs
// ============================================================================
// Module: Threat Intel Aggregator
// Description: Concurrent multi-source enrichment with trust-weighted merge.
// Purpose: Produce one merged result per indicator across sources.
// Dependencies: serde_json, shorewatch-core, tokio
// ============================================================================

//! ## Overview
//! Enrichment fans out to every configured source concurrently under a
//! semaphore cap. Each source passes its own gate sequence: cache, circuit
//! breaker, token bucket, then the bounded HTTP lookup. Partial results
//! merge with trust-weighted numeric aggregation, majority-vote
//! attribution with trust-ranked tie-breaks, and earliest/latest
//! observation times. The call fails only when every source fails;
//! otherwise failed sources are listed in the result. Sustained rate
//! limiting beyond the configured window counts as a breaker failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use serde_json::json;
use shorewatch_core::AnalyticError;
use shorewatch_core::CircuitBreaker;
use shorewatch_core::DomainIntelResult;
use shorewatch_core::ErrorKind;
use shorewatch_core::IndicatorType;
use shorewatch_core::ThreatIntelResult;
use shorewatch_core::TimeoutClass;
use shorewatch_core::TimeoutEnvelope;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::CacheStats;
use crate::cache::IntelCache;
use crate::ratelimit::TokenBucket;
use crate::source::IntelSource;
use crate::source::PartialIntel;
use crate::source::SourceFailure;

// ============================================================================
// SECTION: Source Handle
// ============================================================================

/// One configured source with its guards and TTLs.
///
/// # Invariants
/// - The breaker and limiter belong to this source alone.
pub struct SourceHandle {
    /// The source adapter.
    pub source: Arc<dyn IntelSource>,
    /// Per-source token bucket.
    pub limiter: TokenBucket,
    /// Per-source circuit breaker.
    pub breaker: Arc<CircuitBreaker>,
    /// Memory-tier TTL.
    pub memory_ttl: Duration,
    /// Persistent-tier TTL.
    pub persistent_ttl: Duration,
    /// Window of sustained rate limiting that trips the breaker.
    pub rate_limit_trip_window: Duration,
    /// Start of the current sustained rate-limited period.
    rate_limited_since: Mutex<Option<Instant>>,
}

impl SourceHandle {
    /// Creates a handle wiring a source to its guards.
    #[must_use]
    pub fn new(
        source: Arc<dyn IntelSource>,
        limiter: TokenBucket,
        breaker: Arc<CircuitBreaker>,
        memory_ttl: Duration,
        persistent_ttl: Duration,
        rate_limit_trip_window: Duration,
    ) -> Self {
        Self {
            source,
            limiter,
            breaker,
            memory_ttl,
            persistent_ttl,
            rate_limit_trip_window,
            rate_limited_since: Mutex::new(None),
        }
    }

    /// Records a rate-limited observation; trips the breaker only when the
    /// condition persists beyond the configured window.
    fn note_rate_limited(&self) {
        let Ok(mut since) = self.rate_limited_since.lock() else {
            return;
        };
        match *since {
            Some(started) if started.elapsed() >= self.rate_limit_trip_window => {
                self.breaker.on_failure();
            }
            Some(_) => {}
            None => {
                *since = Some(Instant::now());
            }
        }
    }

    /// Clears the sustained rate-limited period after a success.
    fn clear_rate_limited(&self) {
        if let Ok(mut since) = self.rate_limited_since.lock() {
            *since = None;
        }
    }
}

/// Outcome of one source lookup.
enum SourceOutcome {
    /// The source contributed a partial result.
    Success(PartialIntel),
    /// The source failed; the label explains why.
    Failure(&'static str),
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Multi-source threat-intelligence aggregator.
///
/// # Invariants
/// - `success_ratio_weight` falls in `0..=1`.
/// - Concurrency never exceeds the semaphore capacity.
pub struct ThreatIntelAggregator {
    /// Configured sources with guards.
    handles: Vec<Arc<SourceHandle>>,
    /// Shared two-tier cache.
    cache: Arc<IntelCache>,
    /// Per-request concurrency cap.
    semaphore: Arc<Semaphore>,
    /// Weight of the success ratio in merged confidence.
    success_ratio_weight: f64,
    /// Deadline envelope for source lookups.
    envelope: TimeoutEnvelope,
}

impl ThreatIntelAggregator {
    /// Creates an aggregator over configured source handles.
    #[must_use]
    pub fn new(
        handles: Vec<Arc<SourceHandle>>,
        cache: Arc<IntelCache>,
        concurrency_limit: usize,
        success_ratio_weight: f64,
        envelope: TimeoutEnvelope,
    ) -> Self {
        Self {
            handles,
            cache,
            semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
            success_ratio_weight,
            envelope,
        }
    }

    /// Returns the configured source names.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        self.handles.iter().map(|handle| handle.source.name().to_string()).collect()
    }

    /// Returns cache statistics for health reporting.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Returns true when at least one source breaker admits calls.
    #[must_use]
    pub fn any_source_available(&self) -> bool {
        self.handles
            .iter()
            .any(|handle| handle.breaker.state() != shorewatch_core::CircuitState::Open)
    }

    /// Enriches an IP address across all sources.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `ExternalService` when every
    /// source fails or is rate limited.
    pub async fn enrich_ip(&self, ip: IpAddr) -> Result<ThreatIntelResult, AnalyticError> {
        let indicator = ip.to_string();
        let indicator_type = match ip {
            IpAddr::V4(_) => IndicatorType::Ipv4,
            IpAddr::V6(_) => IndicatorType::Ipv6,
        };
        let outcomes = self.fan_out(&indicator, indicator_type).await;
        let merged = self.merge_ip(&indicator, indicator_type, outcomes)?;
        merged.validate()?;
        Ok(merged)
    }

    /// Enriches a domain across all sources.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `Validation` for syntactically
    /// invalid domains, or `ExternalService` when every source fails.
    pub async fn enrich_domain(&self, domain: &str) -> Result<DomainIntelResult, AnalyticError> {
        if IndicatorType::classify(domain) != Some(IndicatorType::Domain) {
            return Err(AnalyticError::validation(format!("{domain} is not a valid domain")));
        }
        let outcomes = self.fan_out(domain, IndicatorType::Domain).await;
        self.merge_domain(domain, outcomes)
    }

    // ------------------------------------------------------------------
    // Fan-out
    // ------------------------------------------------------------------

    /// Runs the per-source gate sequence concurrently.
    async fn fan_out(
        &self,
        indicator: &str,
        indicator_type: IndicatorType,
    ) -> Vec<(String, f64, SourceOutcome)> {
        let mut join_set = JoinSet::new();
        for handle in &self.handles {
            let handle = Arc::clone(handle);
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&self.semaphore);
            let envelope = self.envelope;
            let indicator = indicator.to_string();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let name = handle.source.name().to_string();
                let trust = handle.source.trust_weight();
                let outcome = lookup_one(&handle, &cache, &envelope, &indicator, indicator_type).await;
                (name, trust, outcome)
            });
        }
        let mut outcomes = Vec::with_capacity(self.handles.len());
        while let Some(joined) = join_set.join_next().await {
            if let Ok(outcome) = joined {
                outcomes.push(outcome);
            }
        }
        // Deterministic merge order regardless of completion order.
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        outcomes
    }

    // ------------------------------------------------------------------
    // Merging
    // ------------------------------------------------------------------

    /// Merges IP outcomes into the aggregate result.
    fn merge_ip(
        &self,
        indicator: &str,
        indicator_type: IndicatorType,
        outcomes: Vec<(String, f64, SourceOutcome)>,
    ) -> Result<ThreatIntelResult, AnalyticError> {
        let parts = partition(outcomes);
        if parts.succeeded.is_empty() {
            return Err(all_sources_unavailable(indicator, &parts.failed));
        }
        let confidence = self.merged_confidence(&parts);
        let succeeded = &parts.succeeded;
        Ok(ThreatIntelResult {
            indicator: indicator.to_string(),
            indicator_type,
            source_payloads: succeeded
                .iter()
                .map(|(name, _, partial)| (name.clone(), partial.raw.clone()))
                .collect(),
            overall_threat_score: weighted_score(succeeded),
            confidence_score: confidence,
            first_seen: succeeded.iter().filter_map(|(_, _, p)| p.first_seen).min(),
            last_seen: succeeded.iter().filter_map(|(_, _, p)| p.last_seen).max(),
            country: majority_vote(succeeded, |partial| partial.country.clone()),
            asn: majority_vote(succeeded, |partial| partial.asn),
            tags: union_tags(succeeded),
            sources_queried: parts.queried.clone(),
            sources_succeeded: succeeded.iter().map(|(name, _, _)| name.clone()).collect(),
            sources_failed: parts.failed.iter().map(|(name, _)| name.clone()).collect(),
        })
    }

    /// Merges domain outcomes into the aggregate result.
    fn merge_domain(
        &self,
        domain: &str,
        outcomes: Vec<(String, f64, SourceOutcome)>,
    ) -> Result<DomainIntelResult, AnalyticError> {
        let parts = partition(outcomes);
        if parts.succeeded.is_empty() {
            return Err(all_sources_unavailable(domain, &parts.failed));
        }
        let confidence = self.merged_confidence(&parts);
        let succeeded = &parts.succeeded;
        let mut resolved_ips: Vec<IpAddr> =
            succeeded.iter().flat_map(|(_, _, partial)| partial.resolved_ips.clone()).collect();
        resolved_ips.sort();
        resolved_ips.dedup();
        Ok(DomainIntelResult {
            domain: domain.to_string(),
            source_payloads: succeeded
                .iter()
                .map(|(name, _, partial)| (name.clone(), partial.raw.clone()))
                .collect(),
            overall_threat_score: weighted_score(succeeded),
            confidence_score: confidence,
            resolved_ips,
            registrar: succeeded
                .iter()
                .find_map(|(_, _, partial)| {
                    partial.raw.pointer("/domain/registrar").and_then(serde_json::Value::as_str)
                })
                .map(ToString::to_string),
            tags: union_tags(succeeded),
            sources_queried: parts.queried.clone(),
            sources_succeeded: succeeded.iter().map(|(name, _, _)| name.clone()).collect(),
            sources_failed: parts.failed.iter().map(|(name, _)| name.clone()).collect(),
        })
    }

    /// Computes merged confidence from the success ratio and per-source
    /// confidences.
    fn merged_confidence(&self, parts: &Partitioned) -> f64 {
        if parts.queried.is_empty() {
            return 0.0;
        }
        let succeeded = parts.succeeded.len();
        let ratio = to_f64(succeeded) / to_f64(parts.queried.len());
        let mean_confidence = if succeeded == 0 {
            0.0
        } else {
            parts.succeeded.iter().map(|(_, _, partial)| partial.confidence).sum::<f64>()
                / to_f64(succeeded)
        };
        let w = self.success_ratio_weight;
        (w * ratio + (1.0 - w) * mean_confidence).clamp(0.0, 1.0)
    }
}

// ============================================================================
// SECTION: Per-Source Gate Sequence
// ============================================================================

/// Runs one source through cache, breaker, limiter, and lookup.
async fn lookup_one(
    handle: &SourceHandle,
    cache: &IntelCache,
    envelope: &TimeoutEnvelope,
    indicator: &str,
    indicator_type: IndicatorType,
) -> SourceOutcome {
    let name = handle.source.name();
    if let Some(cached) = cache.get(name, indicator, handle.memory_ttl) {
        return SourceOutcome::Success(cached);
    }
    if !handle.breaker.can_execute() {
        return SourceOutcome::Failure("circuit_open");
    }
    if !handle.limiter.try_acquire() {
        handle.note_rate_limited();
        handle.breaker.on_abandon();
        return SourceOutcome::Failure("rate_limited");
    }
    let result = shorewatch_core::with_deadline(
        envelope,
        TimeoutClass::ExternalService,
        "intel lookup",
        async {
            handle
                .source
                .lookup(indicator, indicator_type)
                .await
                .map_err(|failure| match failure {
                    SourceFailure::RateLimited => {
                        AnalyticError::new(ErrorKind::RateLimited, "source rate limited")
                    }
                    SourceFailure::BackendUnavailable(message) => {
                        AnalyticError::external(handle.source.name(), message)
                    }
                })
        },
    )
    .await;
    match result {
        Ok(partial) => {
            handle.breaker.on_success();
            handle.clear_rate_limited();
            cache.put(name, indicator, &partial, handle.memory_ttl, handle.persistent_ttl);
            SourceOutcome::Success(partial)
        }
        Err(error) if error.kind == ErrorKind::RateLimited => {
            handle.note_rate_limited();
            handle.breaker.on_abandon();
            cache.record_miss();
            SourceOutcome::Failure("rate_limited")
        }
        Err(_) => {
            handle.breaker.on_failure();
            cache.record_miss();
            SourceOutcome::Failure("backend_unavailable")
        }
    }
}

// ============================================================================
// SECTION: Merge Helpers
// ============================================================================

/// Outcomes partitioned into successes and failures.
struct Partitioned {
    /// Every queried source name, sorted.
    queried: Vec<String>,
    /// Succeeding sources with trust and payload.
    succeeded: Vec<(String, f64, PartialIntel)>,
    /// Failed sources with a reason label.
    failed: Vec<(String, &'static str)>,
}

/// Partitions outcomes by success.
fn partition(outcomes: Vec<(String, f64, SourceOutcome)>) -> Partitioned {
    let mut queried = Vec::with_capacity(outcomes.len());
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for (name, trust, outcome) in outcomes {
        queried.push(name.clone());
        match outcome {
            SourceOutcome::Success(partial) => succeeded.push((name, trust, partial)),
            SourceOutcome::Failure(reason) => failed.push((name, reason)),
        }
    }
    Partitioned {
        queried,
        succeeded,
        failed,
    }
}

/// Builds the every-source-failed error.
fn all_sources_unavailable(indicator: &str, failed: &[(String, &'static str)]) -> AnalyticError {
    AnalyticError::new(
        ErrorKind::ExternalService,
        format!("all threat-intel sources unavailable for {indicator}"),
    )
    .with_data(json!({
        "code": "all_sources_unavailable",
        "sources_failed": failed
            .iter()
            .map(|(name, reason)| json!({"source": name, "reason": reason}))
            .collect::<Vec<_>>(),
    }))
}

/// Computes the trust-weighted mean threat score.
fn weighted_score(succeeded: &[(String, f64, PartialIntel)]) -> Option<f64> {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (_, trust, partial) in succeeded {
        if let Some(score) = partial.threat_score {
            numerator += trust * score;
            denominator += trust;
        }
    }
    (denominator > 0.0).then(|| numerator / denominator)
}

/// Majority vote over an attribute with trust-ranked tie-breaks.
fn majority_vote<T: Ord + Clone>(
    succeeded: &[(String, f64, PartialIntel)],
    attribute: impl Fn(&PartialIntel) -> Option<T>,
) -> Option<T> {
    let mut votes: BTreeMap<T, (usize, f64)> = BTreeMap::new();
    for (_, trust, partial) in succeeded {
        if let Some(value) = attribute(partial) {
            let entry = votes.entry(value).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 = entry.1.max(*trust);
        }
    }
    votes
        .into_iter()
        .max_by(|a, b| {
            a.1.0.cmp(&b.1.0).then(a.1.1.partial_cmp(&b.1.1).unwrap_or(std::cmp::Ordering::Equal))
        })
        .map(|(value, _)| value)
}

/// Unions and sorts tags across sources.
fn union_tags(succeeded: &[(String, f64, PartialIntel)]) -> Vec<String> {
    let mut tags: Vec<String> =
        succeeded.iter().flat_map(|(_, _, partial)| partial.tags.clone()).collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Converts a collection length to f64 without precision surprises.
fn to_f64(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::MAX, f64::from)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
