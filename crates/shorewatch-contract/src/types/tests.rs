// crates/shorewatch-contract/src/types/tests.rs
// ============================================================================
// Module: Contract Type Tests
// Description: Unit tests for tool name round-trips.
// Purpose: Validate wire-name stability.
// Dependencies: shorewatch-contract
// ============================================================================

//! ## Overview
//! Exercises wire-name round-trips for every tool.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use super::ToolName;

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Every tool name, used for exhaustive round-trips.
const ALL_TOOLS: [ToolName; 11] = [
    ToolName::QueryDshieldEvents,
    ToolName::StreamDshieldEventsWithSessionContext,
    ToolName::AnalyzeCampaign,
    ToolName::ExpandCampaignIndicators,
    ToolName::GetCampaignTimeline,
    ToolName::DetectStatisticalAnomalies,
    ToolName::EnrichIpWithDshield,
    ToolName::EnrichDomainWithDshield,
    ToolName::GenerateAttackReport,
    ToolName::GetHealthStatus,
    ToolName::GetDataDictionary,
];

#[test]
fn wire_names_round_trip() {
    for tool in ALL_TOOLS {
        assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
    }
    assert_eq!(ToolName::parse("no_such_tool"), None);
}

#[test]
fn wire_names_are_snake_case() {
    for tool in ALL_TOOLS {
        let name = tool.as_str();
        assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{name}");
    }
}
