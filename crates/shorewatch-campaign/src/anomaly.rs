// crates/shorewatch-campaign/src/anomaly.rs
// ============================================================================
// Module: Statistical Anomaly Detection
// Description: Rate, rarity, and burst anomaly methods over recent events.
// Purpose: Surface unusual activity and ongoing unseeded campaigns.
// Dependencies: serde, shorewatch-core, time
// ============================================================================

//! ## Overview
//! Three detection methods run over a recent-event window: event-rate
//! z-scores per hourly bucket, categories rarer than a frequency floor,
//! and source IPs whose events burst inside a short span. Sensitivity
//! scales thresholds; tests assert ordering properties only, never
//! absolute values. Ongoing-campaign detection groups recent events by
//! connected components over subnet and ASN relations and keeps
//! components above the confidence threshold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;
use shorewatch_core::SecurityEvent;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Shapes
// ============================================================================

/// Anomaly detection method.
///
/// # Invariants
/// - Variants are stable for tool schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMethod {
    /// Hourly event-rate spike by z-score.
    RateSpike,
    /// Category rarer than the frequency floor.
    RareCategory,
    /// New source IP with a concentrated burst of events.
    NewSourceBurst,
}

impl AnomalyMethod {
    /// Every method, in execution order.
    pub const ALL: [Self; 3] = [Self::RateSpike, Self::RareCategory, Self::NewSourceBurst];

    /// Returns a stable label for the method.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RateSpike => "rate_spike",
            Self::RareCategory => "rare_category",
            Self::NewSourceBurst => "new_source_burst",
        }
    }
}

/// One detected anomaly.
///
/// # Invariants
/// - `score` grows with anomaly strength; scales are method-specific.
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    /// Detection method.
    pub method: AnomalyMethod,
    /// Anomaly strength (method-specific scale).
    pub score: f64,
    /// Subject of the anomaly (bucket start, category, or IP).
    pub subject: String,
    /// Events supporting the finding.
    pub evidence_event_ids: Vec<String>,
}

/// An unseeded campaign candidate found by component grouping.
///
/// # Invariants
/// - `event_count >= indicators.len()`.
#[derive(Debug, Clone, Serialize)]
pub struct OngoingCampaign {
    /// Source indicators in the component.
    pub indicators: Vec<String>,
    /// Events attributed to the component.
    pub event_count: usize,
    /// Mean edge confidence of the component.
    pub confidence: f64,
}

// ============================================================================
// SECTION: Detection
// ============================================================================

/// Runs the selected anomaly methods over recent events.
///
/// `sensitivity` in `0..=1` scales thresholds: higher sensitivity lowers
/// them and yields more findings.
#[must_use]
pub fn detect_anomalies(
    events: &[SecurityEvent],
    methods: &[AnomalyMethod],
    sensitivity: f64,
) -> Vec<Anomaly> {
    let sensitivity = sensitivity.clamp(0.0, 1.0);
    let mut anomalies = Vec::new();
    for method in methods {
        match method {
            AnomalyMethod::RateSpike => anomalies.extend(rate_spikes(events, sensitivity)),
            AnomalyMethod::RareCategory => anomalies.extend(rare_categories(events, sensitivity)),
            AnomalyMethod::NewSourceBurst => anomalies.extend(source_bursts(events, sensitivity)),
        }
    }
    anomalies.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    anomalies
}

/// Flags hourly buckets whose rate z-score exceeds the threshold.
fn rate_spikes(events: &[SecurityEvent], sensitivity: f64) -> Vec<Anomaly> {
    let mut buckets: BTreeMap<i64, Vec<&SecurityEvent>> = BTreeMap::new();
    for event in events {
        buckets.entry(event.timestamp.unix_timestamp().div_euclid(3_600)).or_default().push(event);
    }
    if buckets.len() < 3 {
        return Vec::new();
    }
    let counts: Vec<f64> = buckets.values().map(|members| to_f64(members.len())).collect();
    let mean = counts.iter().sum::<f64>() / to_f64(counts.len());
    let variance =
        counts.iter().map(|count| (count - mean).powi(2)).sum::<f64>() / to_f64(counts.len());
    let sigma = variance.sqrt();
    if sigma == 0.0 {
        return Vec::new();
    }
    // Sensitivity 1.0 flags everything past one sigma; 0.0 past four.
    let threshold = 4.0 - 3.0 * sensitivity;
    buckets
        .iter()
        .filter_map(|(index, members)| {
            let z = (to_f64(members.len()) - mean) / sigma;
            (z > threshold).then(|| Anomaly {
                method: AnomalyMethod::RateSpike,
                score: z,
                subject: OffsetDateTime::from_unix_timestamp(index * 3_600)
                    .map_or_else(|_| index.to_string(), |at| at.to_string()),
                evidence_event_ids: members.iter().map(|event| event.id.clone()).collect(),
            })
        })
        .collect()
}

/// Flags categories below the frequency floor.
fn rare_categories(events: &[SecurityEvent], sensitivity: f64) -> Vec<Anomaly> {
    if events.is_empty() {
        return Vec::new();
    }
    let mut per_category: BTreeMap<&'static str, Vec<&SecurityEvent>> = BTreeMap::new();
    for event in events {
        per_category.entry(category_label(event)).or_default().push(event);
    }
    let total = to_f64(events.len());
    // Sensitivity 1.0 flags anything under 5 percent; 0.0 under 0.5.
    let floor = 0.005 + 0.045 * sensitivity;
    per_category
        .into_iter()
        .filter_map(|(category, members)| {
            let frequency = to_f64(members.len()) / total;
            (frequency < floor && members.len() < events.len()).then(|| Anomaly {
                method: AnomalyMethod::RareCategory,
                score: 1.0 - frequency / floor,
                subject: category.to_string(),
                evidence_event_ids: members.iter().map(|event| event.id.clone()).collect(),
            })
        })
        .collect()
}

/// Flags source IPs with many events in a short span.
fn source_bursts(events: &[SecurityEvent], sensitivity: f64) -> Vec<Anomaly> {
    let mut per_source: BTreeMap<IpAddr, Vec<&SecurityEvent>> = BTreeMap::new();
    for event in events {
        if let Some(ip) = event.source_ip {
            per_source.entry(ip).or_default().push(event);
        }
    }
    // Sensitivity 1.0 flags bursts of 5; 0.0 requires 50.
    let min_events = 50.0 - 45.0 * sensitivity;
    per_source
        .into_iter()
        .filter_map(|(ip, mut members)| {
            if to_f64(members.len()) < min_events {
                return None;
            }
            members.sort_by_key(|event| event.timestamp);
            let span = match (members.first(), members.last()) {
                (Some(first), Some(last)) => {
                    (last.timestamp - first.timestamp).whole_seconds().max(1)
                }
                _ => return None,
            };
            let rate = to_f64(members.len()) / to_f64_i64(span);
            Some(Anomaly {
                method: AnomalyMethod::NewSourceBurst,
                score: rate,
                subject: ip.to_string(),
                evidence_event_ids: members.iter().map(|event| event.id.clone()).collect(),
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Ongoing Campaign Detection
// ============================================================================

/// Groups recent events into unseeded campaign candidates.
///
/// Source IPs connect when they share a /24 subnet (confidence 0.6) or an
/// autonomous system (confidence 0.5); components with at least
/// `min_events` events and mean edge confidence at or above
/// `correlation_threshold` survive.
#[must_use]
pub fn detect_ongoing_campaigns(
    events: &[SecurityEvent],
    min_events: usize,
    correlation_threshold: f64,
) -> Vec<OngoingCampaign> {
    let sources: Vec<IpAddr> = {
        let set: BTreeSet<IpAddr> = events.iter().filter_map(|event| event.source_ip).collect();
        set.into_iter().collect()
    };
    if sources.is_empty() {
        return Vec::new();
    }
    let _index_of: BTreeMap<IpAddr, usize> =
        sources.iter().enumerate().map(|(index, ip)| (*ip, index)).collect();
    let mut parent: Vec<usize> = (0 .. sources.len()).collect();
    let mut edge_confidences: Vec<Vec<f64>> = vec![Vec::new(); sources.len()];

    let asn_of: BTreeMap<IpAddr, u32> = events
        .iter()
        .filter_map(|event| event.source_ip.zip(event.asn))
        .collect();

    for (i, left) in sources.iter().enumerate() {
        for (j, right) in sources.iter().enumerate().skip(i + 1) {
            let confidence = if same_subnet_24(*left, *right) {
                Some(0.6)
            } else if asn_of.get(left).is_some_and(|asn| Some(asn) == asn_of.get(right)) {
                Some(0.5)
            } else {
                None
            };
            if let Some(confidence) = confidence {
                union(&mut parent, i, j);
                edge_confidences[i].push(confidence);
                edge_confidences[j].push(confidence);
            }
        }
    }

    let mut components: BTreeMap<usize, (Vec<IpAddr>, Vec<f64>)> = BTreeMap::new();
    for (index, ip) in sources.iter().enumerate() {
        let root = find(&mut parent, index);
        let entry = components.entry(root).or_default();
        entry.0.push(*ip);
        entry.1.extend(edge_confidences[index].iter().copied());
    }

    let mut campaigns = Vec::new();
    for (_, (members, confidences)) in components {
        if members.len() < 2 || confidences.is_empty() {
            continue;
        }
        let member_set: BTreeSet<IpAddr> = members.iter().copied().collect();
        let component_events: Vec<&SecurityEvent> = events
            .iter()
            .filter(|event| event.source_ip.is_some_and(|ip| member_set.contains(&ip)))
            .collect();
        if component_events.len() < min_events {
            continue;
        }
        let confidence = confidences.iter().sum::<f64>() / to_f64(confidences.len());
        if confidence < correlation_threshold {
            continue;
        }
        campaigns.push(OngoingCampaign {
            indicators: members.iter().map(ToString::to_string).collect(),
            event_count: component_events.len(),
            confidence,
        });
    }
    campaigns.sort_by(|a, b| b.event_count.cmp(&a.event_count));
    campaigns
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the category label used for rarity grouping.
fn category_label(event: &SecurityEvent) -> &'static str {
    match event.category {
        shorewatch_core::EventCategory::Network => "network",
        shorewatch_core::EventCategory::Authentication => "authentication",
        shorewatch_core::EventCategory::Malware => "malware",
        shorewatch_core::EventCategory::Intrusion => "intrusion",
        shorewatch_core::EventCategory::Reconnaissance => "reconnaissance",
        shorewatch_core::EventCategory::Other => "other",
    }
}

/// Returns true when two addresses share an IPv4 /24.
fn same_subnet_24(left: IpAddr, right: IpAddr) -> bool {
    match (left, right) {
        (IpAddr::V4(left), IpAddr::V4(right)) => {
            u32::from(left) >> 8 == u32::from(right) >> 8 && left != right
        }
        _ => false,
    }
}

/// Union-find: find with path compression.
fn find(parent: &mut Vec<usize>, node: usize) -> usize {
    let mut root = node;
    while parent[root] != root {
        root = parent[root];
    }
    let mut current = node;
    while parent[current] != root {
        let next = parent[current];
        parent[current] = root;
        current = next;
    }
    root
}

/// Union-find: union by root.
fn union(parent: &mut Vec<usize>, left: usize, right: usize) {
    let left_root = find(parent, left);
    let right_root = find(parent, right);
    if left_root != right_root {
        parent[right_root] = left_root;
    }
}

/// Converts a collection length to f64.
fn to_f64(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::MAX, f64::from)
}

/// Converts a positive i64 to f64.
fn to_f64_i64(value: i64) -> f64 {
    u32::try_from(value.max(0).min(i64::from(u32::MAX))).map_or(f64::MAX, f64::from)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
