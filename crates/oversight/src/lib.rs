#![deny(unused)]
//! Human oversight for Enact.
//!
//! This crate provides:
//! - A process-wide kill-switch gating every request
//! - An approval workflow holding tickets for high-risk operations
//! - Confidence-based escalation to human review

pub mod approval;
pub mod escalation;
pub mod kill_switch;

pub use approval::{ApprovalStatus, ApprovalTicket, ApprovalWorkflow, RiskLevel};
pub use escalation::{
    ConfidenceEscalation, ConfidenceThresholds, EscalationDecision, EscalationLevel,
};
pub use kill_switch::{KillSwitch, KillSwitchStatus};
