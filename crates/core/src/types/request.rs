use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// =============================================================================
// Request Types
// =============================================================================

/// Context key carrying the agent's stated reason for a tool call.
pub const CONTEXT_JUSTIFICATION: &str = "justification";

/// Context key carrying the agent's self-reported confidence in [0, 1].
pub const CONTEXT_CONFIDENCE: &str = "confidence";

/// A request to invoke a tool, as seen by the governance layer.
///
/// Requests are immutable once built; one request corresponds to one
/// attempted tool call by one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceRequest {
    /// Stable identifier of the calling agent.
    pub agent_id: String,

    /// Logical tool identifier.
    pub tool_name: String,

    /// Operation on the tool.
    pub function_name: String,

    /// Named arguments for the call.
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,

    /// Free-form context. The keys `justification` and `confidence` are
    /// recognized by the engine; everything else passes through untouched.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,

    /// Trace identifier, generated when the caller does not supply one.
    pub correlation_id: String,

    /// Wall-clock capture time.
    pub timestamp: DateTime<Utc>,
}

impl GovernanceRequest {
    /// Create a new request with a fresh correlation id and timestamp.
    pub fn new(
        agent_id: impl Into<String>,
        tool_name: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            tool_name: tool_name.into(),
            function_name: function_name.into(),
            arguments: HashMap::new(),
            context: HashMap::new(),
            correlation_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Set the call arguments.
    pub fn with_arguments(mut self, arguments: HashMap<String, serde_json::Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Add a single argument.
    pub fn with_argument(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Merge a context map into the request.
    pub fn with_context(mut self, context: HashMap<String, serde_json::Value>) -> Self {
        self.context.extend(context);
        self
    }

    /// Set the justification context key.
    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.context.insert(
            CONTEXT_JUSTIFICATION.to_string(),
            serde_json::Value::String(justification.into()),
        );
        self
    }

    /// Set the confidence context key.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.context.insert(
            CONTEXT_CONFIDENCE.to_string(),
            serde_json::json!(confidence),
        );
        self
    }

    /// Override the generated correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// The justification supplied in the context, if any.
    pub fn justification(&self) -> Option<&str> {
        self.context.get(CONTEXT_JUSTIFICATION).and_then(|v| v.as_str())
    }

    /// The confidence supplied in the context, if any.
    pub fn confidence(&self) -> Option<f64> {
        self.context.get(CONTEXT_CONFIDENCE).and_then(|v| v.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_recognized_context_keys() {
        let req = GovernanceRequest::new("a1", "database", "select_users")
            .with_justification("migration audit")
            .with_confidence(0.85);

        assert_eq!(req.justification(), Some("migration audit"));
        assert_eq!(req.confidence(), Some(0.85));
        assert!(!req.correlation_id.is_empty());
    }

    #[test]
    fn unrecognized_context_keys_pass_through() {
        let mut extra = HashMap::new();
        extra.insert("ticket".to_string(), serde_json::json!("OPS-41"));

        let req = GovernanceRequest::new("a1", "database", "select_users").with_context(extra);
        assert_eq!(req.context["ticket"], serde_json::json!("OPS-41"));
        assert_eq!(req.confidence(), None);
    }
}
