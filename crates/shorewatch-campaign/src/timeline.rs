// crates/shorewatch-campaign/src/timeline.rs
// ============================================================================
// Module: Campaign Timeline
// Description: Bucketed timeline construction over campaign events.
// Purpose: Summarize campaign activity per minute, hour, or day.
// Dependencies: serde, shorewatch-core, time
// ============================================================================

//! ## Overview
//! A timeline is a finite sequence of fixed-width buckets spanning the
//! event range. Each bucket carries its event count, the top event kinds,
//! and a bounded sample of event ids. Construction is cheap and pure;
//! callers restart a timeline by rebuilding it from the same events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use shorewatch_core::CampaignEvent;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum sampled event ids per bucket.
const SAMPLE_IDS_PER_BUCKET: usize = 5;
/// Maximum top event kinds per bucket.
const TOP_KINDS_PER_BUCKET: usize = 3;

// ============================================================================
// SECTION: Granularity
// ============================================================================

/// Timeline bucket width.
///
/// # Invariants
/// - Variants are stable for tool schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimelineGranularity {
    /// One-minute buckets.
    Minute,
    /// One-hour buckets.
    #[default]
    Hourly,
    /// One-day buckets.
    Daily,
}

impl TimelineGranularity {
    /// Returns the bucket width in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hourly => 3_600,
            Self::Daily => 86_400,
        }
    }

    /// Returns a stable label for the granularity.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}

// ============================================================================
// SECTION: Buckets
// ============================================================================

/// One timeline bucket.
///
/// # Invariants
/// - `event_count >= sample_event_ids.len()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBucket {
    /// Bucket start (UTC, inclusive).
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// Events in the bucket.
    pub event_count: u64,
    /// Most frequent event kinds, descending.
    pub top_event_kinds: Vec<String>,
    /// Sample of member event ids.
    pub sample_event_ids: Vec<String>,
}

/// Builds the bucketed timeline for a set of campaign events.
///
/// Buckets cover the closed span from the first to the last event; empty
/// buckets inside the span are included so gaps are visible.
#[must_use]
pub fn build_timeline(
    events: &[CampaignEvent],
    granularity: TimelineGranularity,
) -> Vec<TimelineBucket> {
    let width = granularity.seconds();
    let Some(first) = events.iter().map(|member| member.event.timestamp).min() else {
        return Vec::new();
    };
    let Some(last) = events.iter().map(|member| member.event.timestamp).max() else {
        return Vec::new();
    };
    let first_index = first.unix_timestamp().div_euclid(width);
    let last_index = last.unix_timestamp().div_euclid(width);

    let mut grouped: BTreeMap<i64, Vec<&CampaignEvent>> = BTreeMap::new();
    for member in events {
        grouped
            .entry(member.event.timestamp.unix_timestamp().div_euclid(width))
            .or_default()
            .push(member);
    }

    let mut buckets = Vec::new();
    for index in first_index ..= last_index {
        let members = grouped.get(&index).map(Vec::as_slice).unwrap_or_default();
        let mut kind_counts: BTreeMap<&str, u64> = BTreeMap::new();
        for member in members {
            *kind_counts.entry(member.event.event_kind.label()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(&str, u64)> = kind_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let start = OffsetDateTime::from_unix_timestamp(index * width)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        buckets.push(TimelineBucket {
            start,
            event_count: u64::try_from(members.len()).unwrap_or(u64::MAX),
            top_event_kinds: ranked
                .into_iter()
                .take(TOP_KINDS_PER_BUCKET)
                .map(|(kind, _)| kind.to_string())
                .collect(),
            sample_event_ids: members
                .iter()
                .take(SAMPLE_IDS_PER_BUCKET)
                .map(|member| member.event.id.clone())
                .collect(),
        });
    }
    buckets
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
