// crates/shorewatch-mcp/src/server.rs
// ============================================================================
// Module: MCP Server Loop
// Description: Newline-delimited JSON-RPC 2.0 framing over byte streams.
// Purpose: Serve tool listings and calls on stdio or TCP streams.
// Dependencies: serde, serde_json, shorewatch-core, tokio
// ============================================================================

//! ## Overview
//! The server reads one JSON-RPC request per line, dispatches through the
//! tool router, and writes one response per line. Framing failures map to
//! `ParseError`, shape failures to `InvalidRequest`, and a wrong
//! `jsonrpc` marker to `SchemaValidation`. Notifications (no id) receive
//! no response. This is the only place analytic errors become JSON-RPC
//! error objects.
//! Security posture: request bytes are untrusted; lines beyond the size
//! cap are rejected without parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use shorewatch_core::AnalyticError;
use shorewatch_core::ErrorKind;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;

use crate::telemetry::McpMethod;
use crate::telemetry::McpMetricEvent;
use crate::telemetry::McpMetrics;
use crate::telemetry::McpOutcome;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Server name reported during initialization.
const SERVER_NAME: &str = "shorewatch";
/// Server version reported during initialization.
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Protocol revision reported during initialization.
const PROTOCOL_VERSION: &str = "2024-11-05";

// ============================================================================
// SECTION: Request Shape
// ============================================================================

/// Decoded JSON-RPC request envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// Protocol marker; must be "2.0".
    jsonrpc: Option<String>,
    /// Request identifier; absent for notifications.
    id: Option<Value>,
    /// Method name.
    method: Option<String>,
    /// Method parameters.
    #[serde(default)]
    params: Value,
}

// ============================================================================
// SECTION: Error Translation
// ============================================================================

/// Builds a JSON-RPC error object from an analytic error.
#[must_use]
pub fn json_rpc_error(id: Option<&Value>, error: &AnalyticError) -> Value {
    let mut body = json!({
        "code": error.json_rpc_code(),
        "message": error.message,
    });
    let mut data = json!({"kind": error.kind.label()});
    if let Some(payload) = &error.data
        && let (Value::Object(data_map), Value::Object(payload_map)) = (&mut data, payload)
    {
        for (key, value) in payload_map {
            data_map.insert(key.clone(), value.clone());
        }
    }
    if let Value::Object(map) = &mut body {
        map.insert("data".to_string(), data);
    }
    json!({
        "jsonrpc": "2.0",
        "id": id.cloned().unwrap_or(Value::Null),
        "error": body,
    })
}

/// Builds a JSON-RPC success object.
fn json_rpc_result(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// MCP server over newline-delimited JSON-RPC.
///
/// # Invariants
/// - One request per line; one response per non-notification request.
pub struct McpServer {
    /// Tool router handling dispatch.
    router: Arc<ToolRouter>,
    /// Metrics sink.
    metrics: Arc<dyn McpMetrics>,
    /// Maximum accepted request line length in bytes.
    max_request_bytes: usize,
}

impl McpServer {
    /// Creates a server over a router and metrics sink.
    #[must_use]
    pub fn new(
        router: Arc<ToolRouter>,
        metrics: Arc<dyn McpMetrics>,
        max_request_bytes: usize,
    ) -> Self {
        Self {
            router,
            metrics,
            max_request_bytes,
        }
    }

    /// Serves requests until the reader reaches end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] only for unrecoverable transport I/O
    /// failures; per-request failures become JSON-RPC error responses.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), AnalyticError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = lines.next_line().await.map_err(|err| {
                AnalyticError::new(ErrorKind::Internal, format!("transport read failed: {err}"))
            })?;
            let Some(line) = line else {
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let rendered = response.to_string();
                writer.write_all(rendered.as_bytes()).await.map_err(|err| {
                    AnalyticError::new(
                        ErrorKind::Internal,
                        format!("transport write failed: {err}"),
                    )
                })?;
                writer.write_all(b"\n").await.map_err(|err| {
                    AnalyticError::new(
                        ErrorKind::Internal,
                        format!("transport write failed: {err}"),
                    )
                })?;
                writer.flush().await.map_err(|err| {
                    AnalyticError::new(
                        ErrorKind::Internal,
                        format!("transport flush failed: {err}"),
                    )
                })?;
            }
        }
    }

    /// Handles one framed line; `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let started = Instant::now();
        if line.len() > self.max_request_bytes {
            let error = AnalyticError::new(
                ErrorKind::InvalidRequest,
                format!("request exceeds {} bytes", self.max_request_bytes),
            );
            return Some(json_rpc_error(None, &error));
        }
        let Ok(request) = serde_json::from_str::<JsonRpcRequest>(line) else {
            let error = AnalyticError::new(ErrorKind::Parse, "malformed JSON-RPC message");
            self.record(McpMethod::Invalid, None, Some(&error), line.len(), started);
            return Some(json_rpc_error(None, &error));
        };
        let id = request.id.clone();
        let response = self.handle_request(request, line.len(), started).await;
        match response {
            Ok(result) => id.map(|id| json_rpc_result(&id, result)),
            Err(error) => Some(json_rpc_error(id.as_ref(), &error)),
        }
    }

    /// Dispatches a decoded request.
    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        request_bytes: usize,
        started: Instant,
    ) -> Result<Value, AnalyticError> {
        if request.jsonrpc.as_deref() != Some("2.0") {
            let error = AnalyticError::new(
                ErrorKind::SchemaValidation,
                "jsonrpc marker must be \"2.0\"",
            );
            self.record(McpMethod::Invalid, None, Some(&error), request_bytes, started);
            return Err(error);
        }
        let Some(method) = request.method.as_deref() else {
            let error = AnalyticError::new(ErrorKind::InvalidRequest, "method is required");
            self.record(McpMethod::Invalid, None, Some(&error), request_bytes, started);
            return Err(error);
        };
        match method {
            "initialize" => {
                self.record(McpMethod::Initialize, None, None, request_bytes, started);
                Ok(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
                    "capabilities": {"tools": {}},
                }))
            }
            "tools/list" => {
                self.record(McpMethod::ToolsList, None, None, request_bytes, started);
                let tools: Vec<Value> = self
                    .router
                    .definitions()
                    .into_iter()
                    .map(|definition| {
                        json!({
                            "name": definition.name.as_str(),
                            "description": definition.description,
                            "inputSchema": definition.input_schema,
                        })
                    })
                    .collect();
                Ok(json!({"tools": tools}))
            }
            "tools/call" => {
                let name = request
                    .params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AnalyticError::new(ErrorKind::InvalidRequest, "params.name is required")
                    })?;
                let arguments =
                    request.params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                let tool = shorewatch_contract::ToolName::parse(name);
                let outcome = self.router.handle_call(name, &arguments).await;
                self.record(
                    McpMethod::ToolsCall,
                    tool,
                    outcome.as_ref().err(),
                    request_bytes,
                    started,
                );
                let result = outcome?;
                Ok(json!({
                    "content": [{
                        "type": "text",
                        "text": result.to_string(),
                    }],
                    "structuredContent": result,
                }))
            }
            _ => {
                let error = AnalyticError::new(
                    ErrorKind::MethodNotFound,
                    format!("unsupported method: {method}"),
                );
                self.record(McpMethod::Other, None, Some(&error), request_bytes, started);
                Err(error)
            }
        }
    }

    /// Records request metrics.
    fn record(
        &self,
        method: McpMethod,
        tool: Option<shorewatch_contract::ToolName>,
        error: Option<&AnalyticError>,
        request_bytes: usize,
        started: Instant,
    ) {
        let event = McpMetricEvent {
            method,
            tool,
            outcome: if error.is_some() { McpOutcome::Error } else { McpOutcome::Ok },
            error_code: error.map(AnalyticError::json_rpc_code),
            request_bytes,
            response_bytes: 0,
        };
        self.metrics.record_request(event.clone());
        self.metrics.record_latency(event, started.elapsed());
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
