//! Intent validation capability.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ToolIntent, ValidationResult};

/// A single check over a tool intent.
///
/// Validators run before any policy is consulted; the first invalid result
/// short-circuits the pipeline. The name is surfaced in denial reasons so
/// operators can tell which check rejected the intent.
#[async_trait]
pub trait IntentValidator: Send + Sync {
    /// Short identifier used in denial reasons.
    fn name(&self) -> &str;

    /// Validate the intent before execution.
    async fn validate(&self, intent: &ToolIntent) -> Result<ValidationResult>;
}
