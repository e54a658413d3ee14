//! Audit sink capability.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::AuditRecord;

/// A consumer that durably records governance decisions.
///
/// Sinks are best-effort: the engine isolates failures, logging them
/// out-of-band without letting one sink starve the others or alter the
/// decision. Implementations own their transport timeouts.
#[async_trait]
pub trait Auditor: Send + Sync {
    /// Record one audit entry.
    async fn log(&self, record: &AuditRecord) -> Result<()>;
}
