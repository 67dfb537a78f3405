// crates/shorewatch-core/src/dictionary.rs
// ============================================================================
// Module: Data Dictionary
// Description: Field descriptions and example values for analyst tooling.
// Purpose: Back the data-dictionary tool with a static, typed catalog.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The data dictionary describes every user-visible field: what it means,
//! which document paths feed it, what values look like, and how to filter
//! on it. The catalog is static and mirrors the field mapper so the two
//! cannot drift: construction takes the mapper and fails closed if a
//! described field is unknown to it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::error::AnalyticError;
use crate::fields::FieldMapper;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Value shape of a dictionary field.
///
/// # Invariants
/// - Variants are stable for tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValueKind {
    /// Free-form string.
    Text,
    /// IP address.
    IpAddress,
    /// Integer value.
    Integer,
    /// Timestamp value.
    Timestamp,
    /// Closed enumeration.
    Enumeration,
}

/// One data-dictionary entry.
///
/// # Invariants
/// - `name` is known to the field mapper.
#[derive(Debug, Clone, Serialize)]
pub struct FieldRecord {
    /// User-visible field name.
    pub name: &'static str,
    /// Analyst-facing description.
    pub description: &'static str,
    /// Value shape.
    pub value_kind: FieldValueKind,
    /// Example value.
    pub example: &'static str,
    /// Candidate document paths, highest precedence first.
    pub paths: Vec<&'static str>,
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Builds the data dictionary from the field mapper.
///
/// # Errors
///
/// Returns [`AnalyticError`] with kind `Internal` when a described field is
/// unknown to the mapper; the catalog and mapper must never drift.
pub fn data_dictionary(mapper: &FieldMapper) -> Result<Vec<FieldRecord>, AnalyticError> {
    let described: [(&'static str, &'static str, FieldValueKind, &'static str); 20] = [
        ("timestamp", "Event time in UTC.", FieldValueKind::Timestamp, "2026-01-15T10:30:00Z"),
        ("event_id", "Source document identifier.", FieldValueKind::Text, "a1b2c3d4"),
        ("event_type", "Normalized event kind.", FieldValueKind::Enumeration, "authentication"),
        ("category", "Event category.", FieldValueKind::Enumeration, "network"),
        ("severity", "Event severity band.", FieldValueKind::Enumeration, "high"),
        ("source_ip", "Attacking or initiating address.", FieldValueKind::IpAddress, "141.98.80.121"),
        ("destination_ip", "Target address.", FieldValueKind::IpAddress, "10.23.0.4"),
        ("source_port", "Initiating port.", FieldValueKind::Integer, "51234"),
        ("destination_port", "Target port.", FieldValueKind::Integer, "22"),
        ("protocol", "Transport or application protocol.", FieldValueKind::Text, "tcp"),
        ("country", "Source country attribution.", FieldValueKind::Text, "NL"),
        ("asn", "Source autonomous system number.", FieldValueKind::Integer, "202425"),
        ("organization", "Source network organization.", FieldValueKind::Text, "ExampleNet BV"),
        ("reputation_score", "Source reputation (0 worst, 100 best).", FieldValueKind::Integer, "12"),
        ("user", "Username observed in the event.", FieldValueKind::Text, "root"),
        ("session_id", "Sensor session identifier.", FieldValueKind::Text, "s-9f2c"),
        ("url", "Requested URL.", FieldValueKind::Text, "http://198.51.100.9/sh"),
        ("user_agent", "Client user-agent string.", FieldValueKind::Text, "curl/8.5.0"),
        ("domain", "Domain observed via DNS, TLS SNI, or HTTP.", FieldValueKind::Text, "evil.example.org"),
        ("payload", "Raw event payload or message.", FieldValueKind::Text, "cat /etc/passwd"),
    ];
    let mut records = Vec::with_capacity(described.len());
    for (name, description, value_kind, example) in described {
        let paths = mapper.map_for_query(name).map_err(|_| {
            AnalyticError::internal(format!("dictionary field {name} unknown to the field mapper"))
        })?;
        records.push(FieldRecord {
            name,
            description,
            value_kind,
            example,
            paths,
        });
    }
    Ok(records)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
