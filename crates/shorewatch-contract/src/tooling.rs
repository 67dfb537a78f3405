// crates/shorewatch-contract/src/tooling.rs
// ============================================================================
// Module: MCP Tool Contracts
// Description: Canonical MCP tool definitions and schemas for Shorewatch.
// Purpose: Provide tool contracts for dispatch, docs, and MCP listing.
// Dependencies: serde_json, shorewatch-core, shorewatch-contract::types
// ============================================================================

//! ## Overview
//! This module defines the canonical MCP tool surface. Tool contracts drive
//! both MCP tool listings and dispatcher registration with strict,
//! deterministic schemas.
//! Security posture: tool inputs are untrusted; these schemas are enforced
//! before any handler runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use shorewatch_core::TimeoutClass;

use crate::types::FeatureId;
use crate::types::ToolContract;
use crate::types::ToolName;

// ============================================================================
// SECTION: Tool Contracts
// ============================================================================

/// Returns the canonical MCP tool contracts.
///
/// The order is intentional: it is preserved in tool listings to keep
/// client diffs stable across releases. Append new tools at the end.
#[must_use]
pub fn tool_contracts() -> Vec<ToolContract> {
    vec![
        query_events_contract(),
        stream_session_contract(),
        analyze_campaign_contract(),
        expand_indicators_contract(),
        campaign_timeline_contract(),
        detect_anomalies_contract(),
        enrich_ip_contract(),
        enrich_domain_contract(),
        attack_report_contract(),
        health_status_contract(),
        data_dictionary_contract(),
    ]
}

/// Builds the tool contract for `query_dshield_events`.
fn query_events_contract() -> ToolContract {
    build_tool_contract(
        ToolName::QueryDshieldEvents,
        "Query honeypot events with field filters, pagination, and the result-size optimization \
         ladder.",
        query_events_input_schema(),
        events_response_schema(),
        TimeoutClass::ToolExecution,
        vec![FeatureId::Elasticsearch],
        vec![
            "Provide exactly one of page or cursor; deep offsets require cursors.".to_string(),
            "List filter values always translate to a terms match.".to_string(),
            "Every response carries pagination metadata and performance metrics.".to_string(),
            "fallback_strategy controls behavior when the result exceeds the size budget."
                .to_string(),
        ],
    )
}

/// Builds the tool contract for `stream_dshield_events_with_session_context`.
fn stream_session_contract() -> ToolContract {
    build_tool_contract(
        ToolName::StreamDshieldEventsWithSessionContext,
        "Stream events in bounded chunks that never split a session across chunk boundaries.",
        stream_session_input_schema(),
        stream_chunk_schema(),
        TimeoutClass::ToolExecution,
        vec![FeatureId::Elasticsearch],
        vec![
            "Sessions are keyed by session_fields with gaps over max_session_gap_minutes forcing \
             a boundary."
                .to_string(),
            "The chunk size may stretch up to 20 percent to avoid splitting a session."
                .to_string(),
            "Pass stream_id to resume an interrupted stream within its TTL.".to_string(),
        ],
    )
}

/// Builds the tool contract for `analyze_campaign`.
fn analyze_campaign_contract() -> ToolContract {
    build_tool_contract(
        ToolName::AnalyzeCampaign,
        "Correlate events into a campaign from seed indicators using staged IP, infrastructure, \
         behavioral, and temporal analysis.",
        analyze_campaign_input_schema(),
        campaign_schema(),
        TimeoutClass::ToolExecution,
        vec![FeatureId::Elasticsearch],
        vec![
            "Fails with NoSeedEvents when no seed indicator matches any event.".to_string(),
            "Individual correlation stages that fail are logged and skipped.".to_string(),
            "campaign_id is stable for the same seeds and rounded window.".to_string(),
        ],
    )
}

/// Builds the tool contract for `expand_campaign_indicators`.
fn expand_indicators_contract() -> ToolContract {
    build_tool_contract(
        ToolName::ExpandCampaignIndicators,
        "Breadth-first expansion of campaign indicators over the relationship graph.",
        expand_indicators_input_schema(),
        expand_indicators_output_schema(),
        TimeoutClass::ToolExecution,
        vec![FeatureId::Elasticsearch],
        vec![
            "Depth-limited with a per-level fan-out cap; cycles are handled.".to_string(),
            "expansion_strategy selects which relationship kinds are followed.".to_string(),
        ],
    )
}

/// Builds the tool contract for `get_campaign_timeline`.
fn campaign_timeline_contract() -> ToolContract {
    build_tool_contract(
        ToolName::GetCampaignTimeline,
        "Build a bucketed timeline for a previously analyzed campaign.",
        campaign_timeline_input_schema(),
        timeline_schema(),
        TimeoutClass::ToolExecution,
        vec![FeatureId::Elasticsearch],
        vec![
            "Buckets carry event counts, top event kinds, and sample event ids.".to_string(),
            "Unknown campaign_id fails with ResourceNotFound.".to_string(),
        ],
    )
}

/// Builds the tool contract for `detect_statistical_anomalies`.
fn detect_anomalies_contract() -> ToolContract {
    build_tool_contract(
        ToolName::DetectStatisticalAnomalies,
        "Detect statistical anomalies in recent events: rate spikes, rare categories, and new \
         source bursts.",
        detect_anomalies_input_schema(),
        anomalies_output_schema(),
        TimeoutClass::ToolExecution,
        vec![FeatureId::Elasticsearch],
        vec![
            "sensitivity scales the detection thresholds; higher means more findings."
                .to_string(),
        ],
    )
}

/// Builds the tool contract for `enrich_ip_with_dshield`.
fn enrich_ip_contract() -> ToolContract {
    build_tool_contract(
        ToolName::EnrichIpWithDshield,
        "Enrich an IP address across configured threat-intelligence sources with cached, merged \
         results.",
        enrich_ip_input_schema(),
        intel_result_schema(),
        TimeoutClass::ExternalService,
        vec![FeatureId::ThreatIntel],
        vec![
            "Partial results are returned when at least one source succeeds.".to_string(),
            "Fails with AllSourcesUnavailable only when every source fails.".to_string(),
        ],
    )
}

/// Builds the tool contract for `enrich_domain_with_dshield`.
fn enrich_domain_contract() -> ToolContract {
    build_tool_contract(
        ToolName::EnrichDomainWithDshield,
        "Enrich a domain across configured threat-intelligence sources with cached, merged \
         results.",
        enrich_domain_input_schema(),
        domain_intel_result_schema(),
        TimeoutClass::ExternalService,
        vec![FeatureId::ThreatIntel],
        vec!["Shares the cache tiers and merge rules of IP enrichment.".to_string()],
    )
}

/// Builds the tool contract for `generate_attack_report`.
fn attack_report_contract() -> ToolContract {
    build_tool_contract(
        ToolName::GenerateAttackReport,
        "Generate structured attack-report data from events or a prior campaign for downstream \
         rendering.",
        attack_report_input_schema(),
        attack_report_output_schema(),
        TimeoutClass::ToolExecution,
        vec![FeatureId::Elasticsearch],
        vec![
            "Template placeholders use {{name}} over a fixed vocabulary; unknown placeholders \
             fail validation."
                .to_string(),
            "Rendering to PDF is a downstream collaborator; this tool emits data.".to_string(),
        ],
    )
}

/// Builds the tool contract for `get_health_status`.
fn health_status_contract() -> ToolContract {
    build_tool_contract(
        ToolName::GetHealthStatus,
        "Report dependency health, breaker states, feature availability, and cache statistics.",
        empty_input_schema(),
        health_status_schema(),
        TimeoutClass::Validation,
        Vec::new(),
        vec!["Always available; health checks never consume backend credits.".to_string()],
    )
}

/// Builds the tool contract for `get_data_dictionary`.
fn data_dictionary_contract() -> ToolContract {
    build_tool_contract(
        ToolName::GetDataDictionary,
        "Return the field data dictionary: descriptions, document paths, and example values.",
        empty_input_schema(),
        data_dictionary_schema(),
        TimeoutClass::Validation,
        Vec::new(),
        vec!["Static catalog; mirrors the field mapper exactly.".to_string()],
    )
}

// ============================================================================
// SECTION: Input Schemas
// ============================================================================

/// Returns the input schema for `query_dshield_events`.
fn query_events_input_schema() -> Value {
    let properties = json!({
        "time_range_hours": schema_positive_integer("Relative window ending now, in hours."),
        "filters": {
            "type": "object",
            "description": "Map of user-visible field name to scalar, list, or range value.",
            "additionalProperties": true
        },
        "fields": schema_string_array("Projection of user-visible fields."),
        "page": schema_positive_integer("1-based page number."),
        "page_size": schema_positive_integer("Events per page."),
        "cursor": schema_string("Opaque cursor from a prior response."),
        "sort_by": schema_string("User-visible sort field (default timestamp)."),
        "sort_order": schema_enum("Sort direction.", &["asc", "desc"]),
        "optimization": schema_enum("Optimization posture.", &["none", "auto", "aggressive"]),
        "fallback_strategy": schema_enum(
            "Behavior when the result exceeds the size budget.",
            &["error", "aggregate", "sample"]
        ),
        "max_result_size_mb": schema_positive_integer("Per-call override of the size budget."),
        "query_timeout_seconds": schema_positive_integer("Per-call override of the query deadline.")
    });
    tool_input_schema(&properties, &["time_range_hours"])
}

/// Returns the input schema for the session-context stream tool.
fn stream_session_input_schema() -> Value {
    let properties = json!({
        "time_range_hours": schema_positive_integer("Relative window ending now, in hours."),
        "filters": {
            "type": "object",
            "description": "Map of user-visible field name to scalar, list, or range value.",
            "additionalProperties": true
        },
        "chunk_size": schema_positive_integer("Soft cap on events per chunk."),
        "session_fields": schema_string_array("Fields whose values form the session key."),
        "max_session_gap_minutes": schema_positive_integer(
            "Gap that forces a session boundary, in minutes."
        ),
        "stream_id": schema_string("Identifier of a stream to resume."),
        "cursor": schema_string("Opaque cursor from a prior chunk.")
    });
    tool_input_schema(&properties, &["time_range_hours"])
}

/// Returns the input schema for `analyze_campaign`.
fn analyze_campaign_input_schema() -> Value {
    let properties = json!({
        "seed_indicators": {
            "type": "array",
            "items": { "type": "string" },
            "minItems": 1,
            "description": "Seed observables (IP addresses) supplied by the analyst."
        },
        "time_range_hours": schema_positive_integer("Analysis window ending now, in hours."),
        "correlation_methods": {
            "type": "array",
            "items": schema_enum("Correlation method.", &[
                "ip_exact", "ip_subnet", "ip_asn", "shared_infrastructure",
                "behavioral_match", "temporal_cluster", "geospatial"
            ]),
            "description": "Methods to apply, in stage order."
        },
        "min_confidence": schema_unit_number("Per-event confidence floor."),
        "include_timeline": schema_boolean("Attach a bucketed timeline."),
        "include_relationships": schema_boolean("Attach indicator relationships.")
    });
    tool_input_schema(&properties, &["seed_indicators"])
}

/// Returns the input schema for `expand_campaign_indicators`.
fn expand_indicators_input_schema() -> Value {
    let properties = json!({
        "campaign_id": schema_string("Identifier of a previously analyzed campaign."),
        "expansion_depth": schema_positive_integer("Maximum BFS depth."),
        "expansion_strategy": schema_enum(
            "Edge filter for the expansion.",
            &["comprehensive", "infrastructure", "temporal"]
        )
    });
    tool_input_schema(&properties, &["campaign_id"])
}

/// Returns the input schema for `get_campaign_timeline`.
fn campaign_timeline_input_schema() -> Value {
    let properties = json!({
        "campaign_id": schema_string("Identifier of a previously analyzed campaign."),
        "timeline_granularity": schema_enum("Bucket width.", &["minute", "hourly", "daily"])
    });
    tool_input_schema(&properties, &["campaign_id"])
}

/// Returns the input schema for `detect_statistical_anomalies`.
fn detect_anomalies_input_schema() -> Value {
    let properties = json!({
        "time_range_hours": schema_positive_integer("Detection window ending now, in hours."),
        "anomaly_methods": {
            "type": "array",
            "items": schema_enum("Detection method.", &[
                "rate_spike", "rare_category", "new_source_burst"
            ]),
            "description": "Methods to run; all by default."
        },
        "sensitivity": schema_unit_number("Detection sensitivity in 0..=1.")
    });
    tool_input_schema(&properties, &["time_range_hours"])
}

/// Returns the input schema for `enrich_ip_with_dshield`.
fn enrich_ip_input_schema() -> Value {
    let properties = json!({
        "ip_address": {
            "type": "string",
            "description": "IPv4 or IPv6 address to enrich."
        }
    });
    tool_input_schema(&properties, &["ip_address"])
}

/// Returns the input schema for `enrich_domain_with_dshield`.
fn enrich_domain_input_schema() -> Value {
    let properties = json!({
        "domain": {
            "type": "string",
            "description": "Domain name to enrich."
        }
    });
    tool_input_schema(&properties, &["domain"])
}

/// Returns the input schema for `generate_attack_report`.
fn attack_report_input_schema() -> Value {
    let properties = json!({
        "campaign_id": schema_string("Report on a previously analyzed campaign."),
        "time_range_hours": schema_positive_integer(
            "Report on events in this window when no campaign_id is given."
        ),
        "template": schema_string("Report template body with {{name}} placeholders.")
    });
    tool_input_schema(&properties, &["template"])
}

/// Returns the empty input schema used by argument-free tools.
fn empty_input_schema() -> Value {
    tool_input_schema(&json!({}), &[])
}

// ============================================================================
// SECTION: Output Schemas
// ============================================================================

/// Returns the schema for an event-query response.
fn events_response_schema() -> Value {
    let properties = json!({
        "events": { "type": "array", "items": { "type": "object" } },
        "aggregations": { "type": "object" },
        "pagination": { "type": "object" },
        "perf_metrics": { "type": "object" }
    });
    tool_output_schema(&properties, &["events", "pagination", "perf_metrics"])
}

/// Returns the schema for one stream chunk.
fn stream_chunk_schema() -> Value {
    let properties = json!({
        "events": { "type": "array", "items": { "type": "object" } },
        "total_estimate": { "type": "integer", "minimum": 0 },
        "next_cursor": { "oneOf": [ { "type": "null" }, { "type": "string" } ] },
        "stream_id": schema_string("Identifier for resuming this stream."),
        "sessions": { "type": "array", "items": { "type": "object" } }
    });
    tool_output_schema(&properties, &["events", "total_estimate"])
}

/// Returns the schema for a campaign result.
fn campaign_schema() -> Value {
    let properties = json!({
        "campaign_id": schema_string("Stable campaign identifier."),
        "confidence": schema_enum("Confidence band.", &["low", "medium", "high", "critical"]),
        "confidence_score": schema_unit_number("Confidence score."),
        "start_time": schema_string("Window start (RFC 3339)."),
        "end_time": schema_string("Window end (RFC 3339)."),
        "seed_indicators": schema_string_array("Analyst-supplied seeds."),
        "related_indicators": schema_string_array("Correlated indicators."),
        "events": { "type": "array", "items": { "type": "object" } },
        "correlation_methods_used": schema_string_array("Methods that contributed events."),
        "attack_vectors": schema_string_array("Observed attack vectors."),
        "suspected_actor": { "oneOf": [ { "type": "null" }, { "type": "string" } ] },
        "sophistication_score": schema_unit_number("Sophistication heuristic."),
        "timeline": { "type": "array", "items": { "type": "object" } },
        "relationships": { "type": "array", "items": { "type": "object" } }
    });
    tool_output_schema(
        &properties,
        &["campaign_id", "confidence", "confidence_score", "seed_indicators", "events"],
    )
}

/// Returns the schema for an indicator-expansion response.
fn expand_indicators_output_schema() -> Value {
    let properties = json!({
        "campaign_id": schema_string("Expanded campaign identifier."),
        "indicators": schema_string_array("Indicators discovered by the expansion."),
        "relationships": { "type": "array", "items": { "type": "object" } },
        "depth_reached": { "type": "integer", "minimum": 0 }
    });
    tool_output_schema(&properties, &["campaign_id", "indicators", "relationships"])
}

/// Returns the schema for a timeline response.
fn timeline_schema() -> Value {
    let properties = json!({
        "campaign_id": schema_string("Campaign identifier."),
        "granularity": schema_enum("Bucket width.", &["minute", "hourly", "daily"]),
        "buckets": { "type": "array", "items": { "type": "object" } }
    });
    tool_output_schema(&properties, &["campaign_id", "granularity", "buckets"])
}

/// Returns the schema for an anomaly-detection response.
fn anomalies_output_schema() -> Value {
    let properties = json!({
        "anomalies": { "type": "array", "items": { "type": "object" } },
        "methods_run": schema_string_array("Methods that executed."),
        "baseline": { "type": "object" }
    });
    tool_output_schema(&properties, &["anomalies", "methods_run"])
}

/// Returns the schema for an IP enrichment response.
fn intel_result_schema() -> Value {
    let properties = json!({
        "indicator": schema_string("Enriched indicator."),
        "indicator_type": schema_enum("Indicator classification.", &[
            "ipv4", "ipv6", "domain", "url", "hash"
        ]),
        "overall_threat_score": { "oneOf": [ { "type": "null" }, { "type": "number" } ] },
        "confidence_score": schema_unit_number("Aggregation confidence."),
        "sources_queried": schema_string_array("Sources queried."),
        "sources_succeeded": schema_string_array("Sources that returned a payload."),
        "sources_failed": schema_string_array("Sources that failed.")
    });
    tool_output_schema(
        &properties,
        &["indicator", "indicator_type", "confidence_score", "sources_queried"],
    )
}

/// Returns the schema for a domain enrichment response.
fn domain_intel_result_schema() -> Value {
    let properties = json!({
        "domain": schema_string("Enriched domain."),
        "overall_threat_score": { "oneOf": [ { "type": "null" }, { "type": "number" } ] },
        "confidence_score": schema_unit_number("Aggregation confidence."),
        "resolved_ips": schema_string_array("Addresses reported by sources."),
        "sources_queried": schema_string_array("Sources queried."),
        "sources_succeeded": schema_string_array("Sources that returned a payload."),
        "sources_failed": schema_string_array("Sources that failed.")
    });
    tool_output_schema(&properties, &["domain", "confidence_score", "sources_queried"])
}

/// Returns the schema for an attack-report response.
fn attack_report_output_schema() -> Value {
    let properties = json!({
        "rendered": schema_string("Template with placeholders substituted."),
        "report": { "type": "object", "description": "Structured report data." }
    });
    tool_output_schema(&properties, &["rendered", "report"])
}

/// Returns the schema for a health-status response.
fn health_status_schema() -> Value {
    let properties = json!({
        "healthy": schema_boolean("Overall health flag."),
        "features": { "type": "object" },
        "breakers": { "type": "array", "items": { "type": "object" } },
        "cache": { "type": "object" }
    });
    tool_output_schema(&properties, &["healthy", "features", "breakers"])
}

/// Returns the schema for a data-dictionary response.
fn data_dictionary_schema() -> Value {
    let properties = json!({
        "fields": { "type": "array", "items": { "type": "object" } }
    });
    tool_output_schema(&properties, &["fields"])
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds a tool contract from its parts.
fn build_tool_contract(
    name: ToolName,
    description: &str,
    input_schema: Value,
    output_schema: Value,
    timeout_class: TimeoutClass,
    required_features: Vec<FeatureId>,
    notes: Vec<String>,
) -> ToolContract {
    ToolContract {
        name,
        description: description.to_string(),
        input_schema,
        output_schema,
        timeout_class,
        required_features,
        notes,
    }
}

/// Builds a standard tool input schema wrapper.
#[must_use]
fn tool_input_schema(properties: &Value, required: &[&str]) -> Value {
    with_schema(object_schema(properties, required))
}

/// Builds a standard tool output schema wrapper.
#[must_use]
fn tool_output_schema(properties: &Value, required: &[&str]) -> Value {
    with_schema(object_schema(properties, required))
}

/// Builds an object schema without the top-level `$schema` annotation.
#[must_use]
fn object_schema(properties: &Value, required: &[&str]) -> Value {
    let required_values: Vec<Value> =
        required.iter().map(|value| Value::String((*value).to_string())).collect();
    json!({
        "type": "object",
        "required": required_values,
        "properties": properties,
        "additionalProperties": false
    })
}

/// Adds a `$schema` header to a top-level JSON schema.
#[must_use]
fn with_schema(schema: Value) -> Value {
    let Value::Object(mut map) = schema else {
        return schema;
    };
    map.insert(
        String::from("$schema"),
        Value::String(String::from("https://json-schema.org/draft/2020-12/schema")),
    );
    Value::Object(map)
}

/// Returns a schema describing a string value.
#[must_use]
fn schema_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}

/// Returns a schema describing a positive integer.
#[must_use]
fn schema_positive_integer(description: &str) -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "description": description
    })
}

/// Returns a schema describing a number in the unit interval.
#[must_use]
fn schema_unit_number(description: &str) -> Value {
    json!({
        "type": "number",
        "minimum": 0.0,
        "maximum": 1.0,
        "description": description
    })
}

/// Returns a schema describing a boolean flag.
#[must_use]
fn schema_boolean(description: &str) -> Value {
    json!({
        "type": "boolean",
        "description": description
    })
}

/// Returns a schema describing a string array.
#[must_use]
fn schema_string_array(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": description
    })
}

/// Returns a schema describing a closed string enumeration.
#[must_use]
fn schema_enum(description: &str, values: &[&str]) -> Value {
    let options: Vec<Value> = values.iter().map(|value| Value::String((*value).to_string())).collect();
    json!({
        "type": "string",
        "enum": options,
        "description": description
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
