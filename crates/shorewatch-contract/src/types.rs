// crates/shorewatch-contract/src/types.rs
// ============================================================================
// Module: Contract Types
// Description: Tool name, descriptor, and feature identifier shapes.
// Purpose: Provide canonical typed shapes for the tool surface.
// Dependencies: serde, serde_json, shorewatch-core
// ============================================================================

//! ## Overview
//! Typed shapes for the tool surface: the closed [`ToolName`] enumeration,
//! the [`ToolContract`] descriptor consumed by the dispatcher and docs, and
//! the [`FeatureId`] capability identifiers the feature manager gates on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use shorewatch_core::TimeoutClass;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Canonical MCP tool names.
///
/// # Invariants
/// - Wire names are stable; clients depend on them byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Query honeypot events with filters and pagination.
    QueryDshieldEvents,
    /// Stream events with session-preserving chunking.
    StreamDshieldEventsWithSessionContext,
    /// Correlate events into a campaign from seed indicators.
    AnalyzeCampaign,
    /// Expand campaign indicators over the relationship graph.
    ExpandCampaignIndicators,
    /// Build a bucketed timeline for a campaign.
    GetCampaignTimeline,
    /// Detect statistical anomalies in recent events.
    DetectStatisticalAnomalies,
    /// Enrich an IP address with threat intelligence.
    EnrichIpWithDshield,
    /// Enrich a domain with threat intelligence.
    EnrichDomainWithDshield,
    /// Generate structured attack report data.
    GenerateAttackReport,
    /// Report dependency and breaker health.
    GetHealthStatus,
    /// Return the field data dictionary.
    GetDataDictionary,
}

impl ToolName {
    /// Returns the stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueryDshieldEvents => "query_dshield_events",
            Self::StreamDshieldEventsWithSessionContext => {
                "stream_dshield_events_with_session_context"
            }
            Self::AnalyzeCampaign => "analyze_campaign",
            Self::ExpandCampaignIndicators => "expand_campaign_indicators",
            Self::GetCampaignTimeline => "get_campaign_timeline",
            Self::DetectStatisticalAnomalies => "detect_statistical_anomalies",
            Self::EnrichIpWithDshield => "enrich_ip_with_dshield",
            Self::EnrichDomainWithDshield => "enrich_domain_with_dshield",
            Self::GenerateAttackReport => "generate_attack_report",
            Self::GetHealthStatus => "get_health_status",
            Self::GetDataDictionary => "get_data_dictionary",
        }
    }

    /// Parses a wire name into a tool name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "query_dshield_events" => Some(Self::QueryDshieldEvents),
            "stream_dshield_events_with_session_context" => {
                Some(Self::StreamDshieldEventsWithSessionContext)
            }
            "analyze_campaign" => Some(Self::AnalyzeCampaign),
            "expand_campaign_indicators" => Some(Self::ExpandCampaignIndicators),
            "get_campaign_timeline" => Some(Self::GetCampaignTimeline),
            "detect_statistical_anomalies" => Some(Self::DetectStatisticalAnomalies),
            "enrich_ip_with_dshield" => Some(Self::EnrichIpWithDshield),
            "enrich_domain_with_dshield" => Some(Self::EnrichDomainWithDshield),
            "generate_attack_report" => Some(Self::GenerateAttackReport),
            "get_health_status" => Some(Self::GetHealthStatus),
            "get_data_dictionary" => Some(Self::GetDataDictionary),
        _ => None,
        }
    }
}

// ============================================================================
// SECTION: Features
// ============================================================================

/// Capability identifiers gated by dependency health.
///
/// # Invariants
/// - Variants are stable for health reporting and gating messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureId {
    /// Backing SIEM reachable and healthy.
    Elasticsearch,
    /// At least one threat-intelligence source available.
    ThreatIntel,
    /// Persistent cache writable.
    PersistentCache,
}

impl FeatureId {
    /// Returns a stable label for the feature.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Elasticsearch => "elasticsearch",
            Self::ThreatIntel => "threat_intel",
            Self::PersistentCache => "persistent_cache",
        }
    }
}

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Tool definition used by MCP tool listing.
///
/// # Invariants
/// - `input_schema` is a JSON Schema payload for the tool input shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: ToolName,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    pub input_schema: Value,
}

/// Full tool contract consumed by the dispatcher and docs generation.
///
/// # Invariants
/// - `input_schema` and `output_schema` are JSON Schema payloads.
/// - `required_features` lists every dependency the handler touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContract {
    /// Tool name.
    pub name: ToolName,
    /// Tool description.
    pub description: String,
    /// JSON schema for tool input payload.
    pub input_schema: Value,
    /// JSON schema for tool response payload.
    pub output_schema: Value,
    /// Timeout class the handler runs under.
    pub timeout_class: TimeoutClass,
    /// Dependency features required for availability.
    pub required_features: Vec<FeatureId>,
    /// Notes describing tool usage and failure modes.
    pub notes: Vec<String>,
}

impl ToolContract {
    /// Returns the listing definition for this contract.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name,
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
