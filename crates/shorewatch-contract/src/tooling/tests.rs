// crates/shorewatch-contract/src/tooling/tests.rs
// ============================================================================
// Module: Tool Contract Tests
// Description: Unit tests for contract completeness and schema validity.
// Purpose: Validate the frozen tool surface compiles as JSON Schema.
// Dependencies: jsonschema, shorewatch-contract
// ============================================================================

//! ## Overview
//! Asserts the contract list covers every tool exactly once, that every
//! schema compiles under draft 2020-12, and that required argument names
//! match the documented tool surface.

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

use std::collections::BTreeSet;

use serde_json::json;

use super::tool_contracts;
use crate::types::ToolName;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn every_tool_appears_exactly_once() {
    let contracts = tool_contracts();
    assert_eq!(contracts.len(), 11);
    let names: BTreeSet<ToolName> = contracts.iter().map(|contract| contract.name).collect();
    assert_eq!(names.len(), 11, "tool names must be unique");
}

#[test]
fn schemas_compile_under_draft_2020_12() {
    for contract in tool_contracts() {
        jsonschema::validator_for(&contract.input_schema)
            .unwrap_or_else(|_| panic!("{} input schema invalid", contract.name.as_str()));
        jsonschema::validator_for(&contract.output_schema)
            .unwrap_or_else(|_| panic!("{} output schema invalid", contract.name.as_str()));
    }
}

#[test]
fn query_events_schema_accepts_documented_arguments() {
    let contract = tool_contracts()
        .into_iter()
        .find(|contract| contract.name == ToolName::QueryDshieldEvents)
        .expect("query tool present");
    let validator = jsonschema::validator_for(&contract.input_schema).expect("compiles");
    let valid = json!({
        "time_range_hours": 24,
        "filters": {"source_ip": "141.98.80.121", "destination_port": [22, 2222]},
        "page": 1,
        "page_size": 100,
        "sort_order": "desc",
        "optimization": "auto",
        "fallback_strategy": "aggregate"
    });
    assert!(validator.is_valid(&valid));
    assert!(!validator.is_valid(&json!({})), "time_range_hours is required");
    assert!(
        !validator.is_valid(&json!({"time_range_hours": 24, "unknown_arg": 1})),
        "additional properties are rejected"
    );
}

#[test]
fn analyze_campaign_requires_seeds() {
    let contract = tool_contracts()
        .into_iter()
        .find(|contract| contract.name == ToolName::AnalyzeCampaign)
        .expect("campaign tool present");
    let validator = jsonschema::validator_for(&contract.input_schema).expect("compiles");
    assert!(validator.is_valid(&json!({"seed_indicators": ["141.98.80.121"]})));
    assert!(!validator.is_valid(&json!({"seed_indicators": []})), "empty seeds rejected");
}

#[test]
fn gated_tools_declare_their_dependencies() {
    for contract in tool_contracts() {
        match contract.name {
            ToolName::GetHealthStatus | ToolName::GetDataDictionary => {
                assert!(contract.required_features.is_empty(), "{}", contract.name.as_str());
            }
            _ => {
                assert!(
                    !contract.required_features.is_empty(),
                    "{} must gate on a dependency",
                    contract.name.as_str()
                );
            }
        }
    }
}
