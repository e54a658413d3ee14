//! Policy configuration loader.
//!
//! YAML and JSON share one schema:
//!
//! ```yaml
//! default_allow: false
//! rules:
//!   - tool: database
//!     function: "select_.*"
//!     action: allow
//!     reason: Read-only
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use enact_core::Rule;

use crate::{Policy, RuleBasedPolicy};

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    default_allow: bool,
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Loads rule-based policies from configuration files.
pub struct PolicyLoader;

impl PolicyLoader {
    /// Load a policy from a YAML or JSON file, dispatching on the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Policy> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read policy file {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let policy = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            "json" => Self::from_json_str(&content),
            other => bail!("unsupported policy format '.{other}'"),
        };

        policy.with_context(|| format!("in policy file {}", path.display()))
    }

    /// Parse a policy from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Policy> {
        let document: PolicyDocument =
            serde_yaml::from_str(content).context("failed to parse policy YAML")?;
        Self::compile(document)
    }

    /// Parse a policy from JSON text.
    pub fn from_json_str(content: &str) -> Result<Policy> {
        let document: PolicyDocument =
            serde_json::from_str(content).context("failed to parse policy JSON")?;
        Self::compile(document)
    }

    fn compile(document: PolicyDocument) -> Result<Policy> {
        let rule_count = document.rules.len();
        let policy = RuleBasedPolicy::new(document.rules, document.default_allow)
            .context("policy rules failed to compile")?;
        tracing::debug!(rules = rule_count, "loaded rule-based policy");
        Ok(Policy::rule_based(policy))
    }
}
