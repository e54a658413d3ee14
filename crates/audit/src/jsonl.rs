//! JSON-lines file sink.

use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use enact_core::{AuditRecord, Auditor, Error, Result};

/// Appends audit records to a file, one JSON object per line.
///
/// The file is opened per write so rotation by an external tool is safe.
pub struct JsonLineAuditor {
    path: PathBuf,
}

impl JsonLineAuditor {
    /// Create a sink appending to `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Auditor for JsonLineAuditor {
    async fn log(&self, record: &AuditRecord) -> Result<()> {
        let path = self.path.clone();
        let line = serde_json::to_string(record)?;

        tokio::task::spawn_blocking(move || {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| Error::audit(format!("failed to open {}: {e}", path.display())))?;
            writeln!(file, "{line}")
                .map_err(|e| Error::audit(format!("failed to append to {}: {e}", path.display())))
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enact_core::{DecisionSource, GovernanceDecision, GovernanceRequest};

    fn record(allow: bool) -> AuditRecord {
        let req = GovernanceRequest::new("a1", "database", "select_users")
            .with_argument("limit", serde_json::json!(10));
        let decision = if allow {
            GovernanceDecision::allow("Read-only")
        } else {
            GovernanceDecision::deny("no rule matched")
        };
        AuditRecord::new(&req, &decision, DecisionSource::Policy, 0.4)
    }

    #[tokio::test]
    async fn appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonLineAuditor::new(&path);

        sink.log(&record(true)).await.unwrap();
        sink.log(&record(false)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["agent_id"], "a1");
        assert_eq!(first["allow"], true);
        assert_eq!(first["arguments"]["limit"], 10);
        assert!(first["timestamp"].as_str().unwrap().contains('T'));

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["allow"], false);
        assert_eq!(second["reason"], "no rule matched");
    }

    #[tokio::test]
    async fn unwritable_path_is_a_sink_error() {
        let sink = JsonLineAuditor::new("/nonexistent-dir/audit.jsonl");
        assert!(sink.log(&record(true)).await.is_err());
    }
}
