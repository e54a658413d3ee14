use serde::{Deserialize, Serialize};

// =============================================================================
// Rule Types
// =============================================================================

/// Action taken when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
}

/// A single governance rule.
///
/// `tool`, `function`, and `agent_id` are regex patterns anchored to the
/// full value; a bare `"*"` is accepted as shorthand for `".*"`. Patterns
/// are compiled when the owning policy is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Pattern for the tool name (e.g. `"database"`, `"api_.*"`, `"*"`).
    pub tool: String,

    /// Pattern for the function name (e.g. `"delete_.*"`, `"*"`).
    pub function: String,

    /// Pattern for the agent id. Defaults to match every agent.
    #[serde(default = "Rule::any_pattern")]
    pub agent_id: String,

    /// Whether a match allows or denies the call.
    pub action: RuleAction,

    /// Explanation attached to the decision.
    pub reason: String,

    /// Optional stable identifier surfaced in decisions and audits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Rule {
    fn any_pattern() -> String {
        ".*".to_string()
    }

    /// Create a rule matching every agent.
    pub fn new(
        tool: impl Into<String>,
        function: impl Into<String>,
        action: RuleAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            function: function.into(),
            agent_id: Self::any_pattern(),
            action,
            reason: reason.into(),
            id: None,
        }
    }

    /// Restrict the rule to agents matching the given pattern.
    pub fn for_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    /// Attach a stable identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
