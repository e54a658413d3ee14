use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::request::GovernanceRequest;

// =============================================================================
// Intent Types
// =============================================================================

/// An agent's intent to execute a tool action.
///
/// Carries not just the what (tool/function/arguments) but also the why
/// (justification) and a confidence level, separating reasoning from
/// execution. Validators operate on intents rather than raw requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolIntent {
    /// Unique intent id.
    pub id: String,

    /// Agent declaring the intent.
    pub agent_id: String,

    /// Tool to be invoked.
    pub tool_name: String,

    /// Operation on the tool.
    pub function_name: String,

    /// Named arguments for the call.
    pub arguments: HashMap<String, serde_json::Value>,

    /// The agent's stated reason for the call, when provided.
    pub justification: Option<String>,

    /// Self-reported confidence in [0, 1]. Defaults to 1.0.
    pub confidence: f64,

    /// Capture time.
    pub timestamp: DateTime<Utc>,
}

impl ToolIntent {
    /// Project a governance request into the validator-facing intent.
    pub fn from_request(request: &GovernanceRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id: request.agent_id.clone(),
            tool_name: request.tool_name.clone(),
            function_name: request.function_name.clone(),
            arguments: request.arguments.clone(),
            justification: request.justification().map(str::to_string),
            confidence: request.confidence().unwrap_or(1.0),
            timestamp: request.timestamp,
        }
    }
}

/// Result of one intent validation check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the check passed.
    pub valid: bool,

    /// Reason for failure (if any).
    pub reason: Option<String>,

    /// Non-fatal observations accumulated along the pipeline.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a passing result.
    pub fn pass() -> Self {
        Self {
            valid: true,
            reason: None,
            warnings: Vec::new(),
        }
    }

    /// Create a passing result that carries a warning.
    pub fn pass_with_warning(warning: impl Into<String>) -> Self {
        Self {
            valid: true,
            reason: None,
            warnings: vec![warning.into()],
        }
    }

    /// Create a failing result.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            warnings: Vec::new(),
        }
    }
}
