// crates/shorewatch-core/src/fields.rs
// ============================================================================
// Module: SIEM Field Mapper
// Description: User-visible field names to ECS document-path candidates.
// Purpose: Translate filters and extract values across index variants.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Honeypot indices populate the same logical field under several document
//! paths depending on sensor and pipeline version: a source address may live
//! at `source.ip`, `source.address`, or only inside `related.ip`. The field
//! mapper keeps one candidate list per user-visible name. Query building
//! must match any candidate; extraction probes candidates in a fixed
//! precedence order (ECS dotted paths before legacy flat names) and returns
//! the first non-null value. The multi-candidate shape is a correctness
//! contract, not an optimization: collapsing candidates loses events on
//! indices that only populate the fallback paths.
//! Security posture: document contents are untrusted; extraction never
//! panics on unexpected shapes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::log::EventLevel;
use crate::log::EventSink;
use crate::log::StructuredEvent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum edit distance for field-name suggestions.
const SUGGESTION_MAX_DISTANCE: usize = 2;

/// Fallback candidate appended to every IP-bearing field.
///
/// Some index configurations only populate `related.ip`; it must always be
/// probed last for IP fields.
pub const RELATED_IP_PATH: &str = "related.ip";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Field mapping errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldMapError {
    /// Unknown user-visible field name.
    #[error("unknown field name: {field} (did you mean one of {suggestions:?}?)")]
    InvalidFieldName {
        /// The unrecognized name.
        field: String,
        /// Known names within edit distance of the input.
        suggestions: Vec<String>,
    },
}

// ============================================================================
// SECTION: Mapping Entry
// ============================================================================

/// One user-visible field and its candidate document paths.
///
/// # Invariants
/// - `candidates` is non-empty and ordered by extraction precedence.
#[derive(Debug, Clone)]
struct FieldEntry {
    /// Candidate document paths, highest precedence first.
    candidates: Vec<&'static str>,
    /// True when the field carries IP addresses.
    is_ip: bool,
}

// ============================================================================
// SECTION: Field Mapper
// ============================================================================

/// Static bidirectional field mapper configured at startup.
///
/// # Invariants
/// - Mappings are immutable after construction.
/// - Every IP field includes [`RELATED_IP_PATH`] as its final candidate.
#[derive(Clone)]
pub struct FieldMapper {
    /// Mapping from user-visible names to candidate paths.
    entries: BTreeMap<&'static str, FieldEntry>,
    /// Sink for unmapped-path records.
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for FieldMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldMapper").field("fields", &self.entries.len()).finish()
    }
}

impl FieldMapper {
    /// Creates the default mapper with the standard honeypot mappings.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        let mut entries = BTreeMap::new();
        let mut insert = |name: &'static str, candidates: Vec<&'static str>, is_ip: bool| {
            entries.insert(
                name,
                FieldEntry {
                    candidates,
                    is_ip,
                },
            );
        };
        insert("timestamp", vec!["@timestamp", "timestamp"], false);
        insert("event_id", vec!["event.id", "_id", "id"], false);
        insert("event_type", vec!["event.type", "event.action", "type"], false);
        insert("category", vec!["event.category", "category"], false);
        insert("severity", vec!["event.severity_label", "event.severity", "severity"], false);
        insert("source_ip", vec!["source.ip", "source.address", "src_ip"], true);
        insert("destination_ip", vec!["destination.ip", "destination.address", "dst_ip"], true);
        insert("source_port", vec!["source.port", "src_port"], false);
        insert("destination_port", vec!["destination.port", "dst_port"], false);
        insert("protocol", vec!["network.transport", "network.protocol", "protocol"], false);
        insert("country", vec!["source.geo.country_name", "geoip.country_name", "country"], false);
        insert("asn", vec!["source.as.number", "geoip.asn", "asn"], false);
        insert(
            "organization",
            vec!["source.as.organization.name", "geoip.asn_org", "organization"],
            false,
        );
        insert("reputation_score", vec!["threat.indicator.confidence", "reputation"], false);
        insert("user", vec!["user.name", "username", "user"], false);
        insert("session_id", vec!["session.id", "event.session_id", "session"], false);
        insert("url", vec!["url.original", "url.full", "http.request.url"], false);
        insert("user_agent", vec!["user_agent.original", "http.user_agent"], false);
        insert("domain", vec!["destination.domain", "dns.question.name", "tls.client.server_name"], false);
        insert("payload", vec!["event.original", "message", "payload"], false);
        let mut mapper = Self {
            entries,
            sink,
        };
        mapper.append_related_ip();
        mapper
    }

    /// Appends the related-ip fallback to every IP-bearing field.
    fn append_related_ip(&mut self) {
        for entry in self.entries.values_mut() {
            if entry.is_ip && !entry.candidates.contains(&RELATED_IP_PATH) {
                entry.candidates.push(RELATED_IP_PATH);
            }
        }
    }

    /// Returns the candidate document paths for a user-visible field.
    ///
    /// Filters built from the result must match any candidate, not only the
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`FieldMapError::InvalidFieldName`] with edit-distance
    /// suggestions when the name is unknown.
    pub fn map_for_query(&self, user_field: &str) -> Result<Vec<&'static str>, FieldMapError> {
        self.entries.get(user_field).map(|entry| entry.candidates.clone()).ok_or_else(|| {
            FieldMapError::InvalidFieldName {
                field: user_field.to_string(),
                suggestions: self.suggestions(user_field),
            }
        })
    }

    /// Returns true when the user-visible field is known.
    #[must_use]
    pub fn knows(&self, user_field: &str) -> bool {
        self.entries.contains_key(user_field)
    }

    /// Returns every known user-visible field name.
    #[must_use]
    pub fn known_fields(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Extracts the first non-null value for a user-visible field.
    ///
    /// Candidates are probed in precedence order; `None` means no candidate
    /// path resolved to a non-null value.
    #[must_use]
    pub fn extract<'doc>(&self, document: &'doc Value, user_field: &str) -> Option<&'doc Value> {
        let entry = self.entries.get(user_field)?;
        entry.candidates.iter().find_map(|path| lookup_path(document, path))
    }

    /// Returns known names within edit distance of the input.
    #[must_use]
    pub fn suggestions(&self, input: &str) -> Vec<String> {
        let mut matches: Vec<(usize, &str)> = self
            .entries
            .keys()
            .filter_map(|name| {
                let distance = edit_distance(input, name);
                (distance <= SUGGESTION_MAX_DISTANCE).then_some((distance, *name))
            })
            .collect();
        matches.sort_unstable();
        matches.into_iter().map(|(_, name)| name.to_string()).collect()
    }

    /// Records top-level document paths not covered by any mapping.
    ///
    /// This is operator visibility, not an error: honeypot pipelines grow
    /// fields faster than mappings do.
    pub fn log_unmapped(&self, document: &Value) {
        let Value::Object(map) = document else {
            return;
        };
        let covered: BTreeSet<&str> = self
            .entries
            .values()
            .flat_map(|entry| entry.candidates.iter())
            .map(|path| path.split('.').next().unwrap_or(path))
            .collect();
        let unmapped: Vec<&String> =
            map.keys().filter(|key| !covered.contains(key.as_str())).collect();
        if unmapped.is_empty() {
            return;
        }
        self.sink.record(&StructuredEvent::now(
            "field_mapper",
            "unmapped_paths",
            EventLevel::Info,
            json!({"paths": unmapped}),
        ));
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves a dotted path inside a document, treating null as absent.
///
/// A literal key containing dots (common in flattened indices) is probed
/// before descending segment by segment.
fn lookup_path<'doc>(document: &'doc Value, path: &str) -> Option<&'doc Value> {
    if let Value::Object(map) = document
        && let Some(value) = map.get(path)
        && !value.is_null()
    {
        return Some(value);
    }
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    (!current.is_null()).then_some(current)
}

/// Computes the Levenshtein distance between two names.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

// ============================================================================
// SECTION: Tests
// ============================================================================
