//! Human approval workflow for high-risk operations.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use enact_core::{Error, Result};

/// Risk classification attached to approval tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Status of an approval ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A pending or decided request for human authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalTicket {
    pub id: String,
    pub agent_id: String,
    pub tool_name: String,
    pub function_name: String,
    pub arguments: HashMap<String, serde_json::Value>,
    pub justification: Option<String>,
    pub risk_level: RiskLevel,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub approver: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

type NotifyCallback = Box<dyn Fn(&ApprovalTicket) + Send + Sync>;

#[derive(Default)]
struct WorkflowState {
    pending: HashMap<String, ApprovalTicket>,
    history: Vec<ApprovalTicket>,
}

/// Manages human approval for high-risk operations.
///
/// High-risk tools are matched by name; high-risk functions by regex
/// anchored at the start of the function name. Tickets have no built-in
/// timeout: callers poll (or re-submit the request) until a human decides.
pub struct ApprovalWorkflow {
    high_risk_tools: HashSet<String>,
    high_risk_functions: Vec<Regex>,
    on_request: Option<NotifyCallback>,
    state: Mutex<WorkflowState>,
}

impl ApprovalWorkflow {
    /// Create a workflow over the given high-risk sets.
    ///
    /// Fails if a function pattern does not compile.
    pub fn new(
        high_risk_tools: impl IntoIterator<Item = String>,
        high_risk_functions: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        let high_risk_functions = high_risk_functions
            .into_iter()
            .map(|p| {
                Regex::new(&format!("^(?:{p})"))
                    .map_err(|e| Error::oversight(format!("invalid high-risk pattern '{p}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            high_risk_tools: high_risk_tools.into_iter().collect(),
            high_risk_functions,
            on_request: None,
            state: Mutex::new(WorkflowState::default()),
        })
    }

    /// Register a callback fired synchronously when a ticket is created.
    pub fn with_notification(
        mut self,
        callback: impl Fn(&ApprovalTicket) + Send + Sync + 'static,
    ) -> Self {
        self.on_request = Some(Box::new(callback));
        self
    }

    /// Whether the operation needs a human decision.
    pub fn requires_approval(&self, tool_name: &str, function_name: &str) -> bool {
        self.high_risk_tools.contains(tool_name)
            || self
                .high_risk_functions
                .iter()
                .any(|p| p.is_match(function_name))
    }

    /// Create a pending ticket and notify listeners.
    #[allow(clippy::too_many_arguments)]
    pub fn request_approval(
        &self,
        agent_id: impl Into<String>,
        tool_name: impl Into<String>,
        function_name: impl Into<String>,
        arguments: HashMap<String, serde_json::Value>,
        justification: Option<String>,
        risk_level: RiskLevel,
    ) -> ApprovalTicket {
        let ticket = ApprovalTicket {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            tool_name: tool_name.into(),
            function_name: function_name.into(),
            arguments,
            justification,
            risk_level,
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
            approver: None,
            decided_at: None,
            rejection_reason: None,
        };

        self.state
            .lock()
            .expect("approval lock poisoned")
            .pending
            .insert(ticket.id.clone(), ticket.clone());

        tracing::info!(
            ticket = %ticket.id,
            agent_id = %ticket.agent_id,
            tool = %ticket.tool_name,
            function = %ticket.function_name,
            risk = ?ticket.risk_level,
            "approval requested"
        );
        if let Some(callback) = &self.on_request {
            callback(&ticket);
        }

        ticket
    }

    /// Approve a pending ticket.
    pub fn approve(&self, ticket_id: &str, approver: impl Into<String>) -> Result<ApprovalTicket> {
        self.decide(ticket_id, approver.into(), ApprovalStatus::Approved, None)
    }

    /// Reject a pending ticket with a reason.
    pub fn reject(
        &self,
        ticket_id: &str,
        approver: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<ApprovalTicket> {
        self.decide(
            ticket_id,
            approver.into(),
            ApprovalStatus::Rejected,
            Some(reason.into()),
        )
    }

    fn decide(
        &self,
        ticket_id: &str,
        approver: String,
        status: ApprovalStatus,
        rejection_reason: Option<String>,
    ) -> Result<ApprovalTicket> {
        let mut state = self.state.lock().expect("approval lock poisoned");

        let Some(mut ticket) = state.pending.remove(ticket_id) else {
            return if state.history.iter().any(|t| t.id == ticket_id) {
                Err(Error::oversight(format!(
                    "approval ticket '{ticket_id}' already decided"
                )))
            } else {
                Err(Error::oversight(format!(
                    "unknown approval ticket '{ticket_id}'"
                )))
            };
        };

        ticket.status = status;
        ticket.approver = Some(approver);
        ticket.decided_at = Some(Utc::now());
        ticket.rejection_reason = rejection_reason;

        state.history.push(ticket.clone());
        tracing::info!(ticket = %ticket.id, status = ?ticket.status, "approval decided");
        Ok(ticket)
    }

    /// Status of a ticket, pending or decided.
    pub fn status(&self, ticket_id: &str) -> Option<ApprovalStatus> {
        let state = self.state.lock().expect("approval lock poisoned");
        state
            .pending
            .get(ticket_id)
            .map(|t| t.status)
            .or_else(|| {
                state
                    .history
                    .iter()
                    .find(|t| t.id == ticket_id)
                    .map(|t| t.status)
            })
    }

    /// All currently pending tickets.
    pub fn pending(&self) -> Vec<ApprovalTicket> {
        self.state
            .lock()
            .expect("approval lock poisoned")
            .pending
            .values()
            .cloned()
            .collect()
    }

    /// Whether a decided ticket approves this exact operation.
    ///
    /// Matching on (agent, tool, function, arguments) is what lets a
    /// re-submitted request pass the gate after a human approves.
    pub fn is_approved(
        &self,
        agent_id: &str,
        tool_name: &str,
        function_name: &str,
        arguments: &HashMap<String, serde_json::Value>,
    ) -> bool {
        self.state
            .lock()
            .expect("approval lock poisoned")
            .history
            .iter()
            .any(|t| {
                t.status == ApprovalStatus::Approved
                    && t.agent_id == agent_id
                    && t.tool_name == tool_name
                    && t.function_name == function_name
                    && t.arguments == *arguments
            })
    }
}
