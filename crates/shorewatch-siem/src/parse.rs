// crates/shorewatch-siem/src/parse.rs
// ============================================================================
// Module: Document Normalization
// Description: SIEM document to SecurityEvent normalization.
// Purpose: Parse untrusted hits into the canonical event shape once.
// Dependencies: serde_json, shorewatch-core
// ============================================================================

//! ## Overview
//! Every hit is normalized into a [`SecurityEvent`] through the field
//! mapper: candidate paths are probed in precedence order, malformed values
//! degrade to `None` rather than failing the document, and only a missing
//! id or timestamp rejects a hit. Unmapped top-level paths are reported to
//! the operator sink once per document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use shorewatch_core::AnalyticError;
use shorewatch_core::EventCategory;
use shorewatch_core::EventKind;
use shorewatch_core::FieldMapper;
use shorewatch_core::SecurityEvent;
use shorewatch_core::Severity;
use shorewatch_core::model::event::parse_ip;
use shorewatch_core::model::event::parse_port;
use shorewatch_core::model::event::parse_timestamp;

use crate::client::SearchHit;

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes one hit into a [`SecurityEvent`].
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `Validation` when the document
/// carries no usable timestamp; the id comes from the hit envelope and is
/// always present.
pub fn event_from_hit(mapper: &FieldMapper, hit: &SearchHit) -> Result<SecurityEvent, AnalyticError> {
    let document = &hit.source;
    mapper.log_unmapped(document);
    let timestamp = mapper
        .extract(document, "timestamp")
        .and_then(parse_timestamp)
        .ok_or_else(|| {
            AnalyticError::validation(format!("document {} has no usable timestamp", hit.id))
        })?;
    let event = SecurityEvent {
        id: hit.id.clone(),
        timestamp,
        event_kind: mapper
            .extract(document, "event_type")
            .and_then(Value::as_str)
            .map_or(EventKind::Unknown, EventKind::from_label),
        severity: mapper
            .extract(document, "severity")
            .and_then(Value::as_str)
            .and_then(Severity::from_label),
        category: mapper
            .extract(document, "category")
            .and_then(Value::as_str)
            .map_or(EventCategory::Other, EventCategory::from_label),
        source_ip: mapper.extract(document, "source_ip").and_then(parse_ip),
        destination_ip: mapper.extract(document, "destination_ip").and_then(parse_ip),
        source_port: mapper.extract(document, "source_port").and_then(parse_port),
        destination_port: mapper.extract(document, "destination_port").and_then(parse_port),
        protocol: extract_string(mapper, document, "protocol"),
        country: extract_string(mapper, document, "country"),
        asn: mapper
            .extract(document, "asn")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok()),
        organization: extract_string(mapper, document, "organization"),
        reputation_score: mapper
            .extract(document, "reputation_score")
            .and_then(Value::as_u64)
            .and_then(|value| u8::try_from(value).ok())
            .filter(|score| *score <= 100),
        raw: retain_raw(document),
    };
    event.validate()?;
    Ok(event)
}

/// Extracts a string field, trimming empties to `None`.
fn extract_string(mapper: &FieldMapper, document: &Value, field: &str) -> Option<String> {
    mapper
        .extract(document, field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Retains the original top-level document fields as the raw payload.
fn retain_raw(document: &Value) -> BTreeMap<String, Value> {
    document
        .as_object()
        .map(|map| map.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
        .unwrap_or_default()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
