// crates/shorewatch-core/src/error.rs
// ============================================================================
// Module: Analytic Error Taxonomy
// Description: Closed error-kind taxonomy with JSON-RPC code mapping.
// Purpose: Carry one tagged error shape across every Shorewatch boundary.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every failure that can cross a subsystem boundary is an [`AnalyticError`]:
//! a closed [`ErrorKind`], a short human message, the service it originated
//! from when known, and an optional structured `data` payload (field-level
//! detail for parameter validation failures). Subsystems keep their own
//! `thiserror` enums internally and convert at the seam; only the MCP
//! dispatcher turns an [`AnalyticError`] into a JSON-RPC error object.
//! Security posture: error messages must not embed raw SIEM documents or
//! secrets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// Closed taxonomy of Shorewatch error kinds.
///
/// # Invariants
/// - Variants are stable for programmatic handling and telemetry labels.
/// - Each kind maps to exactly one JSON-RPC error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed framed message (unparseable JSON).
    Parse,
    /// Well-formed JSON with the wrong request shape.
    InvalidRequest,
    /// Unknown tool name.
    MethodNotFound,
    /// Tool argument schema validation failure.
    InvalidParams,
    /// Unexpected invariant violation.
    Internal,
    /// Deadline exceeded.
    Timeout,
    /// Caller-initiated cancellation.
    Cancelled,
    /// Collaborator resource does not exist.
    ResourceNotFound,
    /// Collaborator resource refused access.
    ResourceAccessDenied,
    /// Collaborator resource is unavailable.
    ResourceUnavailable,
    /// Domain-level invariant violation.
    Validation,
    /// Upstream service returned an error.
    ExternalService,
    /// Upstream or self-imposed rate limit.
    RateLimited,
    /// Circuit breaker rejected the call.
    CircuitOpen,
    /// MCP message schema validation failure.
    SchemaValidation,
}

impl ErrorKind {
    /// Returns the JSON-RPC error code for this kind.
    ///
    /// Cancellation shares the deadline code: both are terminal outcomes of
    /// the same envelope and are distinguished by the `kind` label carried in
    /// the error data.
    #[must_use]
    pub const fn json_rpc_code(self) -> i64 {
        match self {
            Self::Parse => -32_700,
            Self::InvalidRequest => -32_600,
            Self::MethodNotFound => -32_601,
            Self::InvalidParams => -32_602,
            Self::Internal => -32_603,
            Self::Timeout | Self::Cancelled => -32_000,
            Self::ResourceNotFound => -32_001,
            Self::ResourceAccessDenied => -32_002,
            Self::ResourceUnavailable => -32_003,
            Self::Validation => -32_004,
            Self::ExternalService => -32_007,
            Self::RateLimited => -32_008,
            Self::CircuitOpen => -32_009,
            Self::SchemaValidation => -32_010,
        }
    }

    /// Returns true when the kind is retryable inside the resilience budget.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::ExternalService | Self::Timeout | Self::RateLimited)
    }

    /// Returns a stable label for telemetry and aggregation.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Parse => "parse_error",
            Self::InvalidRequest => "invalid_request",
            Self::MethodNotFound => "method_not_found",
            Self::InvalidParams => "invalid_params",
            Self::Internal => "internal",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::ResourceNotFound => "resource_not_found",
            Self::ResourceAccessDenied => "resource_access_denied",
            Self::ResourceUnavailable => "resource_unavailable",
            Self::Validation => "validation_error",
            Self::ExternalService => "external_service_error",
            Self::RateLimited => "rate_limited",
            Self::CircuitOpen => "circuit_open",
            Self::SchemaValidation => "schema_validation",
        }
    }
}

// ============================================================================
// SECTION: Analytic Error
// ============================================================================

/// Tagged error carried across Shorewatch boundaries.
///
/// # Invariants
/// - `kind` is the single source of truth for retry and code mapping.
/// - `data`, when present, is safe to surface to the MCP client.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{}: {message}", kind.label())]
pub struct AnalyticError {
    /// Error kind.
    pub kind: ErrorKind,
    /// Short human-readable message.
    pub message: String,
    /// Originating service label when known.
    pub service: Option<String>,
    /// Optional structured payload surfaced to the client.
    pub data: Option<Value>,
}

impl AnalyticError {
    /// Creates an error of the given kind with a message.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            service: None,
            data: None,
        }
    }

    /// Attaches the originating service label.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a structured data payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Creates a domain validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates an internal invariant-violation error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Creates an upstream service error.
    #[must_use]
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message).with_service(service)
    }

    /// Creates a deadline-exceeded error for the named operation.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, format!("deadline exceeded: {}", operation.into()))
    }

    /// Creates a breaker-rejection error for the named service.
    #[must_use]
    pub fn circuit_open(service: impl Into<String>) -> Self {
        let service = service.into();
        Self::new(ErrorKind::CircuitOpen, format!("circuit open for {service}"))
            .with_service(service)
    }

    /// Returns true when the error is retryable.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Returns the JSON-RPC error code for this error.
    #[must_use]
    pub const fn json_rpc_code(&self) -> i64 {
        self.kind.json_rpc_code()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
