//! Intent validation pipeline and built-in validators.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use enact_core::{IntentValidator, Result, ToolIntent, ValidationResult};

/// Chain of validators that all must pass for an intent to be valid.
///
/// Runs validators in registration order and short-circuits on the first
/// invalid result, naming the failing validator in the reason. Warnings
/// accumulate across the whole chain.
#[derive(Default)]
pub struct ValidationPipeline {
    validators: Vec<Arc<dyn IntentValidator>>,
}

impl ValidationPipeline {
    /// Create an empty pipeline that accepts every intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator.
    pub fn with_validator(mut self, validator: impl IntentValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Append an already-shared validator.
    pub fn push(&mut self, validator: Arc<dyn IntentValidator>) {
        self.validators.push(validator);
    }

    /// Number of validators in the chain.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run all validators in sequence.
    pub async fn validate(&self, intent: &ToolIntent) -> Result<ValidationResult> {
        let mut warnings = Vec::new();

        for validator in &self.validators {
            let result = validator.validate(intent).await?;
            warnings.extend(result.warnings);

            if !result.valid {
                let reason = result.reason.unwrap_or_else(|| "intent rejected".to_string());
                return Ok(ValidationResult {
                    valid: false,
                    reason: Some(format!("{}: {reason}", validator.name())),
                    warnings,
                });
            }
        }

        Ok(ValidationResult {
            valid: true,
            reason: None,
            warnings,
        })
    }
}

// =============================================================================
// Built-in validators
// =============================================================================

/// Requires a meaningful justification for tool usage.
pub struct JustificationValidator {
    min_length: usize,
    required_keywords: HashMap<String, HashSet<String>>,
}

impl JustificationValidator {
    /// Require justifications of at least `min_length` characters.
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            required_keywords: HashMap::new(),
        }
    }

    /// Require at least one of `keywords` (case-insensitive substring) in
    /// justifications for `tool_name`.
    pub fn require_keywords(
        mut self,
        tool_name: impl Into<String>,
        keywords: impl IntoIterator<Item = String>,
    ) -> Self {
        self.required_keywords
            .insert(tool_name.into(), keywords.into_iter().collect());
        self
    }
}

#[async_trait]
impl IntentValidator for JustificationValidator {
    fn name(&self) -> &str {
        "justification"
    }

    async fn validate(&self, intent: &ToolIntent) -> Result<ValidationResult> {
        let Some(justification) = intent.justification.as_deref() else {
            return Ok(ValidationResult::fail("missing justification"));
        };

        if justification.trim().len() < self.min_length {
            return Ok(ValidationResult::fail(format!(
                "justification too short (min {} chars)",
                self.min_length
            )));
        }

        if let Some(keywords) = self.required_keywords.get(&intent.tool_name) {
            let justification = justification.to_lowercase();
            let any_present = keywords
                .iter()
                .any(|kw| justification.contains(&kw.to_lowercase()));
            if !any_present {
                let mut expected: Vec<_> = keywords.iter().cloned().collect();
                expected.sort();
                return Ok(ValidationResult::fail(format!(
                    "justification for '{}' must mention one of: {}",
                    intent.tool_name,
                    expected.join(", ")
                )));
            }
        }

        Ok(ValidationResult::pass())
    }
}

/// Checks declared argument schemas.
///
/// Only presence of the `required` names is enforced at the governance
/// layer; full JSON Schema validation belongs to the tool itself.
pub struct SchemaValidator {
    schemas: HashMap<String, serde_json::Value>,
}

impl SchemaValidator {
    /// Create a validator with no schemas. Tools without a schema pass with
    /// a warning.
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Declare a schema for a tool.
    pub fn with_schema(mut self, tool_name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.schemas.insert(tool_name.into(), schema);
        self
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentValidator for SchemaValidator {
    fn name(&self) -> &str {
        "schema"
    }

    async fn validate(&self, intent: &ToolIntent) -> Result<ValidationResult> {
        let Some(schema) = self.schemas.get(&intent.tool_name) else {
            return Ok(ValidationResult::pass_with_warning(format!(
                "no schema declared for tool '{}'",
                intent.tool_name
            )));
        };

        let required = schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str())
                    .filter(|n| !intent.arguments.contains_key(*n))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if required.is_empty() {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "missing required arguments: {}",
                required.join(", ")
            )))
        }
    }
}
