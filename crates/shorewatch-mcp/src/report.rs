// crates/shorewatch-mcp/src/report.rs
// ============================================================================
// Module: Attack Report Data
// Description: Structured report assembly and template substitution.
// Purpose: Emit report data and a substituted template for rendering.
// Dependencies: serde, serde_json, shorewatch-core, time
// ============================================================================

//! ## Overview
//! Report generation is data-only: the tool assembles a structured
//! [`AttackReport`] from events or a prior campaign and substitutes
//! `{{name}}` placeholders from a fixed vocabulary into the caller's
//! template. Rendering to PDF is a downstream collaborator. An unknown
//! placeholder is a validation error; silent blanks would corrupt
//! published reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use shorewatch_core::AnalyticError;
use shorewatch_core::Campaign;
use shorewatch_core::SecurityEvent;
use shorewatch_core::Severity;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Report Shape
// ============================================================================

/// One ranked attacker entry.
#[derive(Debug, Clone, Serialize)]
pub struct TopSource {
    /// Source address.
    pub source_ip: String,
    /// Events attributed to the source.
    pub event_count: usize,
}

/// Structured attack report data.
///
/// # Invariants
/// - `total_events >= top_sources` entry counts.
#[derive(Debug, Clone, Serialize)]
pub struct AttackReport {
    /// Report window start (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub window_start: OffsetDateTime,
    /// Report window end (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub window_end: OffsetDateTime,
    /// Total events covered.
    pub total_events: usize,
    /// Events at high or critical severity.
    pub high_severity_events: usize,
    /// Ranked attacking sources.
    pub top_sources: Vec<TopSource>,
    /// Observed attack vectors, sorted.
    pub attack_vectors: Vec<String>,
    /// Campaign identifier when the report covers a campaign.
    pub campaign_id: Option<String>,
    /// Campaign confidence label when applicable.
    pub campaign_confidence: Option<String>,
}

impl AttackReport {
    /// Builds a report from raw events.
    #[must_use]
    pub fn from_events(events: &[SecurityEvent]) -> Self {
        let window_start = events
            .iter()
            .map(|event| event.timestamp)
            .min()
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let window_end = events
            .iter()
            .map(|event| event.timestamp)
            .max()
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let mut per_source: BTreeMap<String, usize> = BTreeMap::new();
        for event in events {
            if let Some(ip) = event.source_ip {
                *per_source.entry(ip.to_string()).or_insert(0) += 1;
            }
        }
        let mut top_sources: Vec<TopSource> = per_source
            .into_iter()
            .map(|(source_ip, event_count)| TopSource {
                source_ip,
                event_count,
            })
            .collect();
        top_sources.sort_by(|a, b| b.event_count.cmp(&a.event_count));
        top_sources.truncate(10);
        let attack_vectors: Vec<String> = {
            let set: std::collections::BTreeSet<String> =
                events.iter().map(|event| event.event_kind.label().to_string()).collect();
            set.into_iter().collect()
        };
        Self {
            window_start,
            window_end,
            total_events: events.len(),
            high_severity_events: events
                .iter()
                .filter(|event| {
                    event.severity.is_some_and(|severity| severity >= Severity::High)
                })
                .count(),
            top_sources,
            attack_vectors,
            campaign_id: None,
            campaign_confidence: None,
        }
    }

    /// Builds a report from a completed campaign.
    #[must_use]
    pub fn from_campaign(campaign: &Campaign) -> Self {
        let events: Vec<SecurityEvent> =
            campaign.events.iter().map(|member| member.event.clone()).collect();
        let mut report = Self::from_events(&events);
        report.window_start = campaign.start_time;
        report.window_end = campaign.end_time;
        report.campaign_id = Some(campaign.campaign_id.clone());
        report.campaign_confidence = Some(format!("{:?}", campaign.confidence).to_lowercase());
        report
    }

    /// Returns the substitution vocabulary for this report.
    #[must_use]
    pub fn placeholders(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        map.insert("window_start", self.window_start.to_string());
        map.insert("window_end", self.window_end.to_string());
        map.insert("total_events", self.total_events.to_string());
        map.insert("high_severity_events", self.high_severity_events.to_string());
        map.insert(
            "top_source",
            self.top_sources
                .first()
                .map_or_else(|| "none".to_string(), |top| top.source_ip.clone()),
        );
        map.insert("attack_vectors", self.attack_vectors.join(", "));
        map.insert(
            "campaign_id",
            self.campaign_id.clone().unwrap_or_else(|| "none".to_string()),
        );
        map.insert(
            "campaign_confidence",
            self.campaign_confidence.clone().unwrap_or_else(|| "none".to_string()),
        );
        map
    }
}

// ============================================================================
// SECTION: Template Substitution
// ============================================================================

/// Substitutes `{{name}}` placeholders from the report vocabulary.
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `Validation` naming any unknown
/// placeholder.
pub fn render_template(template: &str, report: &AttackReport) -> Result<String, AnalyticError> {
    let vocabulary = report.placeholders();
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        rendered.push_str(&rest[.. open]);
        let after_open = &rest[open + 2 ..];
        let Some(close) = after_open.find("}}") else {
            return Err(AnalyticError::validation("unterminated placeholder in template"));
        };
        let name = after_open[.. close].trim();
        let Some(value) = vocabulary.get(name) else {
            return Err(AnalyticError::validation(format!("unknown placeholder: {name}"))
                .with_data(json!({
                    "placeholder": name,
                    "known": vocabulary.keys().collect::<Vec<_>>(),
                })));
        };
        rendered.push_str(value);
        rest = &after_open[close + 2 ..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
