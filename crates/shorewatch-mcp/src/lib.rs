// crates/shorewatch-mcp/src/lib.rs
// ============================================================================
// Module: Shorewatch MCP Server
// Description: Tool dispatch, feature gating, and JSON-RPC error mapping.
// Purpose: Expose the analytic engine as MCP tools over framed JSON-RPC.
// Dependencies: jsonschema, serde, shorewatch-campaign, shorewatch-contract,
// shorewatch-core, shorewatch-intel, shorewatch-siem, tokio
// ============================================================================

//! ## Overview
//! The MCP crate is the single boundary where analytic errors become
//! JSON-RPC errors. A frozen tool registry built from the contract crate
//! drives dispatch: resolve, gate on dependency health, validate arguments
//! against the tool schema, then execute inside the tool's timeout
//! envelope. The server speaks newline-delimited JSON-RPC 2.0 over any
//! framed byte stream (stdio or TCP are assembled by the CLI).
//! Security posture: every request byte is untrusted until parsed and
//! schema-validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod features;
pub mod health;
pub mod report;
pub mod server;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use features::FeatureManager;
pub use features::FeatureSnapshot;
pub use server::McpServer;
pub use server::json_rpc_error;
pub use tools::ServiceContext;
pub use tools::ToolRouter;
