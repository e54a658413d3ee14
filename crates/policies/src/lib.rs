#![deny(unused)]
//! Built-in governance policies for Enact.
//!
//! This crate provides:
//! - Rule-based policies (ordered first-match over anchored regexes)
//! - Temporal policies (time-window gating)
//! - Remote policies (delegation to an external decision service)
//! - Constant allow-all / deny-all policies
//! - An open extension point for custom decision logic

pub mod loader;
pub mod remote;
pub mod rules;
pub mod temporal;

pub use loader::PolicyLoader;
pub use remote::RemotePolicy;
pub use rules::RuleBasedPolicy;
pub use temporal::{TemporalPolicy, TimeWindow};

use std::fmt;
use std::sync::Arc;

use enact_core::{GovernanceDecision, GovernanceRequest, PolicyEval, Result};

/// A governance policy: a pure function from request to decision.
///
/// Built-ins are tagged variants so callers (notably the registry's group
/// composition) can inspect the kind; arbitrary decision logic plugs in
/// through [`Policy::Custom`].
#[derive(Clone)]
pub enum Policy {
    /// Ordered first-match rule scan.
    RuleBased(Arc<RuleBasedPolicy>),

    /// Allow only inside configured time windows.
    Temporal(Arc<TemporalPolicy>),

    /// Delegate to an external decision service over HTTP.
    Remote(Arc<RemotePolicy>),

    /// Allow everything.
    AllowAll,

    /// Deny everything.
    DenyAll,

    /// Any object satisfying [`PolicyEval`].
    Custom(Arc<dyn PolicyEval>),
}

impl Policy {
    /// Wrap a rule-based policy.
    pub fn rule_based(policy: RuleBasedPolicy) -> Self {
        Self::RuleBased(Arc::new(policy))
    }

    /// Wrap a temporal policy.
    pub fn temporal(policy: TemporalPolicy) -> Self {
        Self::Temporal(Arc::new(policy))
    }

    /// Wrap a remote-delegating policy.
    pub fn remote(policy: RemotePolicy) -> Self {
        Self::Remote(Arc::new(policy))
    }

    /// Wrap a custom evaluator.
    pub fn custom(policy: impl PolicyEval + 'static) -> Self {
        Self::Custom(Arc::new(policy))
    }

    /// The rule-based payload, when this is a rule-based policy.
    pub fn as_rule_based(&self) -> Option<&RuleBasedPolicy> {
        match self {
            Self::RuleBased(p) => Some(p),
            _ => None,
        }
    }

    /// Evaluate a request.
    ///
    /// Only the remote and custom variants can fail; the engine converts
    /// errors into internal denials.
    pub async fn evaluate(&self, request: &GovernanceRequest) -> Result<GovernanceDecision> {
        match self {
            Self::RuleBased(p) => Ok(p.decide(request)),
            Self::Temporal(p) => Ok(p.decide_now()),
            Self::Remote(p) => Ok(p.decide(request).await),
            Self::AllowAll => Ok(GovernanceDecision::allow("allow-all policy")),
            Self::DenyAll => Ok(GovernanceDecision::deny("deny-all policy")),
            Self::Custom(p) => p.evaluate(request).await,
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuleBased(p) => f.debug_tuple("RuleBased").field(p).finish(),
            Self::Temporal(p) => f.debug_tuple("Temporal").field(p).finish(),
            Self::Remote(p) => f.debug_tuple("Remote").field(p).finish(),
            Self::AllowAll => f.write_str("AllowAll"),
            Self::DenyAll => f.write_str("DenyAll"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
