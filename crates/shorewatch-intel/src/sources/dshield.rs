// crates/shorewatch-intel/src/sources/dshield.rs
// ============================================================================
// Module: DShield Source Adapter
// Description: DShield-style HTTP endpoint adapter.
// Purpose: Translate DShield JSON payloads into partial intel.
// Dependencies: async-trait, reqwest, serde_json, shorewatch-config
// ============================================================================

//! ## Overview
//! The DShield-style API serves `/{ip}` and `/domain/{domain}` JSON
//! documents describing honeypot sightings: attack counts, first/last seen
//! dates, AS attribution, and threat-feed membership. The adapter issues
//! bounded GET requests, maps HTTP 429 to a rate-limit failure, and
//! normalizes the payload. A missing indicator is not an error; it yields
//! an empty partial with low confidence.
//! Security posture: payloads are untrusted; every field parses leniently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shorewatch_config::IntelSourceConfig;
use shorewatch_core::IndicatorType;
use time::OffsetDateTime;

use crate::source::IntelSource;
use crate::source::PartialIntel;
use crate::source::SourceFailure;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Confidence reported for a populated payload.
const POPULATED_CONFIDENCE: f64 = 0.8;
/// Confidence reported for an empty (unknown indicator) payload.
const EMPTY_CONFIDENCE: f64 = 0.2;
/// Attack count at which the derived threat score saturates.
const ATTACK_SATURATION: f64 = 1_000.0;

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// DShield-style HTTP source adapter.
///
/// # Invariants
/// - `base_url` carries no trailing slash.
pub struct DshieldHttpSource {
    /// Unique source name.
    name: String,
    /// Endpoint base URL.
    base_url: String,
    /// Optional API key sent as a bearer token.
    api_key: Option<String>,
    /// Declared trust weight.
    trust_weight: f64,
    /// HTTP client.
    client: reqwest::Client,
}

impl DshieldHttpSource {
    /// Builds an adapter from a source configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SourceFailure::BackendUnavailable`] when the HTTP client
    /// cannot be constructed.
    pub fn new(config: &IntelSourceConfig, request_timeout: Duration) -> Result<Self, SourceFailure> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| SourceFailure::BackendUnavailable(err.to_string()))?;
        Ok(Self {
            name: config.name.clone(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            trust_weight: config.trust_weight,
            client,
        })
    }

    /// Builds the lookup URL for an indicator.
    fn lookup_url(&self, indicator: &str, indicator_type: IndicatorType) -> String {
        match indicator_type {
            IndicatorType::Domain => format!("{}/domain/{indicator}", self.base_url),
            _ => format!("{}/ip/{indicator}", self.base_url),
        }
    }
}

#[async_trait]
impl IntelSource for DshieldHttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn trust_weight(&self) -> f64 {
        self.trust_weight
    }

    async fn lookup(
        &self,
        indicator: &str,
        indicator_type: IndicatorType,
    ) -> Result<PartialIntel, SourceFailure> {
        let url = self.lookup_url(indicator, indicator_type);
        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|err| SourceFailure::BackendUnavailable(err.to_string()))?;
        if response.status().as_u16() == 429 {
            return Err(SourceFailure::RateLimited);
        }
        if !response.status().is_success() {
            return Err(SourceFailure::BackendUnavailable(format!(
                "status {}",
                response.status()
            )));
        }
        let payload: Value = response
            .json()
            .await
            .map_err(|err| SourceFailure::BackendUnavailable(err.to_string()))?;
        Ok(parse_payload(&payload))
    }
}

// ============================================================================
// SECTION: Payload Parsing
// ============================================================================

/// Normalizes a DShield-style payload into a partial result.
#[must_use]
pub fn parse_payload(payload: &Value) -> PartialIntel {
    let body = payload.get("ip").or_else(|| payload.get("domain")).unwrap_or(payload);
    let attacks = body.get("attacks").and_then(Value::as_f64).unwrap_or(0.0);
    let count = body.get("count").and_then(Value::as_f64).unwrap_or(0.0);
    let populated = attacks > 0.0 || count > 0.0;
    let threat_score =
        populated.then(|| ((attacks.max(count) / ATTACK_SATURATION) * 100.0).min(100.0));
    let mut tags = Vec::new();
    if let Some(feeds) = body.get("threatfeeds").and_then(Value::as_object) {
        tags.extend(feeds.keys().cloned());
    }
    let resolved_ips = body
        .get("addresses")
        .and_then(Value::as_array)
        .map(|addresses| {
            addresses
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|raw| raw.parse().ok())
                .collect()
        })
        .unwrap_or_default();
    PartialIntel {
        threat_score,
        confidence: if populated { POPULATED_CONFIDENCE } else { EMPTY_CONFIDENCE },
        first_seen: parse_date(body.get("mindate")),
        last_seen: parse_date(body.get("maxdate")),
        country: body
            .get("ascountry")
            .or_else(|| body.get("country"))
            .and_then(Value::as_str)
            .map(ToString::to_string),
        asn: body
            .get("as")
            .or_else(|| body.get("asn"))
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok()),
        tags,
        resolved_ips,
        raw: payload.clone(),
    }
}

/// Parses a `YYYY-MM-DD` date into midnight UTC.
fn parse_date(value: Option<&Value>) -> Option<OffsetDateTime> {
    let raw = value?.as_str()?;
    let format = time::macros::format_description!("[year]-[month]-[day]");
    let date = time::Date::parse(raw, &format).ok()?;
    Some(date.midnight().assume_utc())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
