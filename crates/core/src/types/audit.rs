use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::decision::{DecisionSource, GovernanceDecision};
use super::request::GovernanceRequest;

// =============================================================================
// Audit Types
// =============================================================================

/// A single audit entry: one governed request, one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Decision time, RFC 3339 with timezone on the wire.
    pub timestamp: DateTime<Utc>,

    /// Agent that issued the request.
    pub agent_id: String,

    /// Tool addressed by the request.
    pub tool: String,

    /// Function addressed by the request.
    pub function: String,

    /// Call arguments, possibly redacted by the engine.
    pub arguments: HashMap<String, serde_json::Value>,

    /// Whether the call was allowed.
    pub allow: bool,

    /// Decision reason.
    pub reason: String,

    /// Time the engine spent deciding, in milliseconds.
    pub duration_ms: f64,

    /// Trace identifier propagated from the request.
    pub correlation_id: String,

    /// Pipeline stage that produced the decision.
    pub decision_source: DecisionSource,
}

impl AuditRecord {
    /// Build a record from a request and its decision.
    pub fn new(
        request: &GovernanceRequest,
        decision: &GovernanceDecision,
        source: DecisionSource,
        duration_ms: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            agent_id: request.agent_id.clone(),
            tool: request.tool_name.clone(),
            function: request.function_name.clone(),
            arguments: request.arguments.clone(),
            allow: decision.allow,
            reason: decision.reason.clone(),
            duration_ms,
            correlation_id: request.correlation_id.clone(),
            decision_source: source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_timestamp_with_timezone() {
        let req = GovernanceRequest::new("a1", "db", "select_users");
        let record = AuditRecord::new(
            &req,
            &GovernanceDecision::allow("ok"),
            DecisionSource::Policy,
            1.25,
        );

        let json = serde_json::to_value(&record).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z') || ts.contains('+'));
        assert_eq!(json["decision_source"], "policy");
        assert_eq!(json["duration_ms"], 1.25);
    }
}
