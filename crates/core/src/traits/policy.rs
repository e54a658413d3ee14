//! Policy capability.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GovernanceDecision, GovernanceRequest};

/// A pure decision function over governance requests.
///
/// Implementations must be side-effect free with respect to the request:
/// repeated evaluation of the same request against unchanged state yields
/// the same decision. Errors are caught by the engine and converted into
/// internal denials; they never reach the caller as errors.
#[async_trait]
pub trait PolicyEval: Send + Sync {
    /// Evaluate a request and produce a decision.
    async fn evaluate(&self, request: &GovernanceRequest) -> Result<GovernanceDecision>;
}
