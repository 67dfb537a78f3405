// crates/shorewatch-contract/src/lib.rs
// ============================================================================
// Module: Shorewatch Contract
// Description: Canonical tool names, descriptors, and JSON schemas.
// Purpose: Provide the frozen tool surface for dispatch and docs.
// Dependencies: serde, serde_json, shorewatch-core
// ============================================================================

//! ## Overview
//! The contract crate is the single source of truth for the MCP tool
//! surface: stable tool names, per-tool input/output JSON schemas, the
//! timeout class each tool runs under, and the dependency features each
//! tool requires. The dispatcher builds its frozen registry from
//! [`tooling::tool_contracts`]; nothing else defines tools.
//! Security posture: tool inputs are untrusted; schemas are the first
//! validation gate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod tooling;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use tooling::tool_contracts;
pub use types::FeatureId;
pub use types::ToolContract;
pub use types::ToolDefinition;
pub use types::ToolName;
