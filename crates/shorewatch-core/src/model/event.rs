// crates/shorewatch-core/src/model/event.rs
// ============================================================================
// Module: Security Event Model
// Description: Canonical normalized security-event record.
// Purpose: Provide the immutable event shape parsed from SIEM documents.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! A [`SecurityEvent`] is the normalized form of one SIEM document. Parsing
//! happens exactly once, through the field mapper; after construction the
//! record is immutable. Every event carries an `id` and a UTC `timestamp`;
//! all other attributes are optional and validated on entry (IP syntax,
//! port range, reputation bounds).
//! Security posture: documents come from honeypot indices and are untrusted;
//! parsing must not panic on malformed values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::AnalyticError;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Kind of security event observed in the SIEM.
///
/// # Invariants
/// - Variants are stable for correlation and reporting labels.
/// - Unrecognized source labels normalize to `Unknown`, never to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Network connection attempt.
    Connection,
    /// Authentication attempt (success or failure).
    Authentication,
    /// Port or service scan.
    Scan,
    /// Exploit attempt against a service.
    Exploit,
    /// Malware observation (download, detonation, signature hit).
    Malware,
    /// DNS query or response.
    Dns,
    /// HTTP request observation.
    Http,
    /// File access or transfer.
    FileAccess,
    /// Command execution on a honeypot.
    CommandExecution,
    /// Generic alert raised by the source sensor.
    Alert,
    /// Unrecognized source label.
    Unknown,
}

impl EventKind {
    /// Normalizes a source label into an event kind.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "connection" | "flow" | "network" => Self::Connection,
            "authentication" | "login" | "ssh_login" => Self::Authentication,
            "scan" | "portscan" | "recon" => Self::Scan,
            "exploit" | "exploit_attempt" => Self::Exploit,
            "malware" | "malware_download" => Self::Malware,
            "dns" | "dns_query" => Self::Dns,
            "http" | "http_request" | "web" => Self::Http,
            "file" | "file_access" | "file_transfer" => Self::FileAccess,
            "command" | "command_execution" | "shell" => Self::CommandExecution,
            "alert" => Self::Alert,
            _ => Self::Unknown,
        }
    }

    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::Scan => "scan",
            Self::Exploit => "exploit",
            Self::Malware => "malware",
            Self::Dns => "dns",
            Self::Http => "http",
            Self::FileAccess => "file_access",
            Self::CommandExecution => "command_execution",
            Self::Alert => "alert",
            Self::Unknown => "unknown",
        }
    }
}

/// Event severity.
///
/// # Invariants
/// - Ordering follows escalation: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational or low-impact event.
    Low,
    /// Event warranting review.
    Medium,
    /// Event indicating likely hostile activity.
    High,
    /// Event indicating confirmed or high-impact hostile activity.
    Critical,
}

impl Severity {
    /// Normalizes a source label into a severity, when recognized.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "low" | "info" | "informational" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Event category.
///
/// # Invariants
/// - Variants are stable for filtering and report grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Network-layer activity.
    Network,
    /// Authentication activity.
    Authentication,
    /// Malware activity.
    Malware,
    /// Intrusion or exploitation activity.
    Intrusion,
    /// Reconnaissance activity.
    Reconnaissance,
    /// Anything not covered by another category.
    Other,
}

impl EventCategory {
    /// Normalizes a source label into a category.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "network" | "flow" => Self::Network,
            "authentication" | "iam" => Self::Authentication,
            "malware" => Self::Malware,
            "intrusion" | "intrusion_detection" | "exploit" => Self::Intrusion,
            "reconnaissance" | "recon" | "scan" => Self::Reconnaissance,
            _ => Self::Other,
        }
    }
}

// ============================================================================
// SECTION: Security Event
// ============================================================================

/// Canonical normalized security event.
///
/// # Invariants
/// - `id` is non-empty and `timestamp` is always present.
/// - `source_ip`/`destination_ip` are syntactically valid when set.
/// - Ports fall in `1..=65535`; `reputation_score` falls in `0..=100`.
/// - The record is immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Source document identifier.
    pub id: String,
    /// Event time (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Event kind.
    pub event_kind: EventKind,
    /// Event severity, when the source reported one.
    pub severity: Option<Severity>,
    /// Event category.
    pub category: EventCategory,
    /// Source IP address.
    pub source_ip: Option<IpAddr>,
    /// Destination IP address.
    pub destination_ip: Option<IpAddr>,
    /// Source port.
    pub source_port: Option<u16>,
    /// Destination port.
    pub destination_port: Option<u16>,
    /// Transport or application protocol label.
    pub protocol: Option<String>,
    /// Source country name.
    pub country: Option<String>,
    /// Source autonomous system number.
    pub asn: Option<u32>,
    /// Source organization name.
    pub organization: Option<String>,
    /// Source reputation score (0 worst .. 100 best).
    pub reputation_score: Option<u8>,
    /// Opaque source document fields not captured above.
    pub raw: BTreeMap<String, Value>,
}

impl SecurityEvent {
    /// Validates construction invariants for a parsed event.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `Validation` when `id` is empty,
    /// a port is zero, or a reputation score exceeds 100.
    pub fn validate(&self) -> Result<(), AnalyticError> {
        if self.id.is_empty() {
            return Err(AnalyticError::validation("event id must be non-empty"));
        }
        for (label, port) in [("source_port", self.source_port), ("destination_port", self.destination_port)]
        {
            if port == Some(0) {
                return Err(AnalyticError::validation(format!("{label} must be in 1..=65535")));
            }
        }
        if let Some(score) = self.reputation_score
            && score > 100
        {
            return Err(AnalyticError::validation("reputation_score must be in 0..=100"));
        }
        Ok(())
    }

    /// Returns every IP carried by this event, source first.
    #[must_use]
    pub fn ips(&self) -> Vec<IpAddr> {
        let mut ips = Vec::with_capacity(2);
        if let Some(ip) = self.source_ip {
            ips.push(ip);
        }
        if let Some(ip) = self.destination_ip {
            ips.push(ip);
        }
        ips
    }
}

// ============================================================================
// SECTION: Parsing Helpers
// ============================================================================

/// Parses an IP address from a JSON value, tolerating malformed input.
#[must_use]
pub fn parse_ip(value: &Value) -> Option<IpAddr> {
    value.as_str().and_then(|raw| raw.parse().ok())
}

/// Parses a port from a JSON value, rejecting out-of-range numbers.
#[must_use]
pub fn parse_port(value: &Value) -> Option<u16> {
    let number = value.as_u64().or_else(|| value.as_str().and_then(|raw| raw.parse().ok()))?;
    u16::try_from(number).ok().filter(|port| *port > 0)
}

/// Parses an RFC 3339 or epoch-milliseconds timestamp from a JSON value.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<OffsetDateTime> {
    if let Some(raw) = value.as_str() {
        return OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339).ok();
    }
    let millis = value.as_i64()?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
