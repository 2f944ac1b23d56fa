//! Router decision parsing and normalization.
//!
//! The decision phase asks the language model, per knowledge source, whether
//! the source is needed for a query. The model responds with free-form text
//! that should contain JSON. That JSON is never trusted implicitly: it is
//! parsed into the strict [`RawRouterDecision`] shape, then normalized into a
//! [`RouterDecision`] with invariant violations degraded to safe defaults.

use crate::llm::extract_json_from_response;
use crate::taxonomy::Intent;
use serde::{Deserialize, Serialize};

/// Raw decision payload as deserialized from the model response.
///
/// All fields are optional or defaulted so that a partially malformed payload
/// still parses; normalization decides what survives.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRouterDecision {
    /// Whether the source is needed.
    #[serde(default)]
    pub is_needed: bool,
    /// Intent name, expected when `is_needed` is true.
    #[serde(default)]
    pub intent: Option<String>,
    /// Entity names mentioned in the query.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Context hints for retrieval.
    #[serde(default)]
    pub context_hints: Vec<String>,
}

/// Normalized per-source router decision.
///
/// Invariant: `is_needed` implies `intent.is_some()`. Payloads that violate
/// it (or fail to parse at all) normalize to "not needed" — logged, never
/// raised, so one bad decision can never abort sibling sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDecision {
    /// Whether this knowledge source should be queried.
    pub is_needed: bool,
    /// Query intent. Always present when `is_needed` is true.
    pub intent: Option<Intent>,
    /// Entity names to boost during retrieval.
    pub entities: Vec<String>,
    /// Context hints to blend during retrieval.
    pub context_hints: Vec<String>,
}

impl RouterDecision {
    /// The degraded decision: source not needed, nothing extracted.
    #[must_use]
    pub const fn not_needed() -> Self {
        Self {
            is_needed: false,
            intent: None,
            entities: Vec::new(),
            context_hints: Vec::new(),
        }
    }

    /// Parses and normalizes a decision from raw model output.
    ///
    /// Never fails: malformed JSON, unknown intent names, and
    /// `is_needed`-without-intent all degrade to [`Self::not_needed`] with a
    /// warning log.
    #[must_use]
    pub fn from_response(source: &str, response: &str) -> Self {
        let json = extract_json_from_response(response);
        let raw: RawRouterDecision = match serde_json::from_str(json) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(
                    source = source,
                    error = %err,
                    "malformed router decision payload, treating source as not needed"
                );
                metrics::counter!("router_decisions_total", "source" => source.to_string(), "status" => "malformed")
                    .increment(1);
                return Self::not_needed();
            },
        };
        Self::from_raw(source, raw)
    }

    /// Normalizes an already-parsed raw decision.
    #[must_use]
    pub fn from_raw(source: &str, raw: RawRouterDecision) -> Self {
        if !raw.is_needed {
            metrics::counter!("router_decisions_total", "source" => source.to_string(), "status" => "not_needed")
                .increment(1);
            return Self::not_needed();
        }

        let intent = raw.intent.as_deref().and_then(Intent::parse);
        let Some(intent) = intent else {
            // is_needed=true with a missing or unknown intent violates the
            // decision contract; degrade rather than guess.
            tracing::warn!(
                source = source,
                intent = raw.intent.as_deref().unwrap_or("<missing>"),
                "router decision needed source without a valid intent, degrading to not needed"
            );
            metrics::counter!("router_decisions_total", "source" => source.to_string(), "status" => "invalid_intent")
                .increment(1);
            return Self::not_needed();
        };

        metrics::counter!("router_decisions_total", "source" => source.to_string(), "status" => "needed")
            .increment(1);
        Self {
            is_needed: true,
            intent: Some(intent),
            entities: raw.entities,
            context_hints: raw.context_hints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_decision() {
        let response = r#"{
            "is_needed": true,
            "intent": "spell_details",
            "entities": ["Fireball"],
            "context_hints": ["wizard level 5"]
        }"#;

        let decision = RouterDecision::from_response("rulebook", response);
        assert!(decision.is_needed);
        assert_eq!(decision.intent, Some(Intent::SpellDetails));
        assert_eq!(decision.entities, vec!["Fireball"]);
        assert_eq!(decision.context_hints, vec!["wizard level 5"]);
    }

    #[test]
    fn test_not_needed_decision() {
        let response = r#"{"is_needed": false}"#;
        let decision = RouterDecision::from_response("sessions", response);
        assert!(!decision.is_needed);
        assert!(decision.intent.is_none());
    }

    #[test]
    fn test_needed_without_intent_degrades() {
        let response = r#"{"is_needed": true, "entities": ["Fireball"]}"#;
        let decision = RouterDecision::from_response("rulebook", response);
        assert_eq!(decision, RouterDecision::not_needed());
    }

    #[test]
    fn test_unknown_intent_degrades() {
        let response = r#"{"is_needed": true, "intent": "summon_bigger_fish"}"#;
        let decision = RouterDecision::from_response("rulebook", response);
        assert_eq!(decision, RouterDecision::not_needed());
    }

    #[test]
    fn test_malformed_json_degrades() {
        let decision = RouterDecision::from_response("rulebook", "I think you should roll dice");
        assert_eq!(decision, RouterDecision::not_needed());
    }

    #[test]
    fn test_json_in_markdown_block() {
        let response = "```json\n{\"is_needed\": true, \"intent\": \"hit_points\"}\n```";
        let decision = RouterDecision::from_response("sheet", response);
        assert!(decision.is_needed);
        assert_eq!(decision.intent, Some(Intent::HitPoints));
    }
}
