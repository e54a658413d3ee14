//! Rule-based policy: ordered first-match over anchored regexes.

use regex::Regex;

use enact_core::{Error, GovernanceDecision, GovernanceRequest, Result, Rule, RuleAction};

/// A rule with its patterns compiled.
///
/// Patterns are anchored to the full value; compilation happens once at
/// policy construction.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    tool: Regex,
    function: Regex,
    agent: Regex,
    action: RuleAction,
    reason: String,
    id: Option<String>,
}

impl CompiledRule {
    fn compile(rule: &Rule) -> Result<Self> {
        Ok(Self {
            tool: compile_anchored(&rule.tool)?,
            function: compile_anchored(&rule.function)?,
            agent: compile_anchored(&rule.agent_id)?,
            action: rule.action,
            reason: rule.reason.clone(),
            id: rule.id.clone(),
        })
    }

    fn matches(&self, request: &GovernanceRequest) -> bool {
        self.tool.is_match(&request.tool_name)
            && self.function.is_match(&request.function_name)
            && self.agent.is_match(&request.agent_id)
    }
}

/// Anchor a pattern to the full value. A bare `"*"` is accepted as a
/// shorthand for `".*"`.
fn compile_anchored(pattern: &str) -> Result<Regex> {
    let pattern = if pattern == "*" { ".*" } else { pattern };
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| Error::policy(format!("invalid rule pattern '{pattern}': {e}")))
}

/// A policy that evaluates a request against an ordered list of rules.
///
/// The first rule whose tool, function, and agent patterns all match
/// determines the outcome. If no rule matches, the policy falls back to
/// `default_allow`.
#[derive(Debug, Clone)]
pub struct RuleBasedPolicy {
    rules: Vec<CompiledRule>,
    default_allow: bool,
}

impl RuleBasedPolicy {
    /// Compile a rule list into a policy.
    ///
    /// Fails if any pattern does not compile; the error names the offending
    /// rule by position and id.
    pub fn new(rules: Vec<Rule>, default_allow: bool) -> Result<Self> {
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                CompiledRule::compile(rule).map_err(|e| {
                    let label = rule.id.clone().unwrap_or_else(|| format!("#{index}"));
                    match e {
                        Error::Policy(msg) => Error::policy(format!("rule {label}: {msg}")),
                        other => other,
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules: compiled,
            default_allow,
        })
    }

    /// Concatenate several policies into one, preserving rule order.
    ///
    /// `default_allow` is taken from the first policy; an empty input yields
    /// an empty default-deny policy.
    pub fn merged<'a>(policies: impl IntoIterator<Item = &'a RuleBasedPolicy>) -> RuleBasedPolicy {
        let mut iter = policies.into_iter();
        let mut merged = match iter.next() {
            Some(first) => first.clone(),
            None => RuleBasedPolicy {
                rules: Vec::new(),
                default_allow: false,
            },
        };
        for policy in iter {
            merged.rules.extend(policy.rules.iter().cloned());
        }
        merged
    }

    /// The fallback when no rule matches.
    pub fn default_allow(&self) -> bool {
        self.default_allow
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the rule list is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First-match scan.
    pub fn decide(&self, request: &GovernanceRequest) -> GovernanceDecision {
        for rule in &self.rules {
            if rule.matches(request) {
                let mut decision = match rule.action {
                    RuleAction::Allow => GovernanceDecision::allow(rule.reason.clone()),
                    RuleAction::Deny => GovernanceDecision::deny(rule.reason.clone()),
                };
                if let Some(id) = &rule.id {
                    decision = decision.with_rule_id(id.clone());
                }
                return decision;
            }
        }

        if self.default_allow {
            GovernanceDecision::allow("no rule matched")
        } else {
            GovernanceDecision::deny("no rule matched")
        }
    }
}
