use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Decision Types
// =============================================================================

/// The outcome of governing one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceDecision {
    /// Whether the call may proceed.
    pub allow: bool,

    /// Human-readable explanation. Never empty.
    pub reason: String,

    /// Identifier of the rule that produced the decision, when one matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,

    /// Additional decision detail (approval ids, escalation levels, ...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl GovernanceDecision {
    /// Create an allow decision.
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allow: true,
            reason: reason.into(),
            rule_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a deny decision.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: reason.into(),
            rule_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach the matching rule's identifier.
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Which pipeline stage produced the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// The kill-switch gate denied before any other stage ran.
    KillSwitch,
    /// A validator in the intent pipeline rejected the request.
    Validation,
    /// The per-(agent, tool) token bucket was empty.
    RateLimit,
    /// The agent exhausted its rolling-window quota.
    Quota,
    /// The tool's circuit breaker was open.
    CircuitBreaker,
    /// The resolved policy decided.
    Policy,
    /// The approval gate intercepted a policy-allowed request.
    Approval,
    /// Confidence escalation downgraded an allow to a human gate.
    Escalation,
    /// A registry-level denial issued on the engine's behalf (expired tool).
    Registry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_source_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&DecisionSource::KillSwitch).unwrap();
        assert_eq!(json, "\"kill_switch\"");
    }

    #[test]
    fn metadata_is_omitted_when_empty() {
        let json = serde_json::to_string(&GovernanceDecision::allow("ok")).unwrap();
        assert!(!json.contains("metadata"));
        assert!(!json.contains("rule_id"));
    }
}
