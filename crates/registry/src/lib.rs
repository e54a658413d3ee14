#![deny(unused)]
//! Tool registry for Enact.
//!
//! Centralized tool and policy management:
//! - Register tools with specific policies, access lists, and expirations
//! - Define agent groups with inherited policies
//! - Resolve the effective policy for a (tool, agent) pair

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use enact_core::{Error, Result};
use enact_policies::{Policy, RuleBasedPolicy};

/// A tool registration: the handle plus its governance metadata.
///
/// The handle type is opaque to the registry; callers pick whatever they
/// dispatch on (a trait object, a channel, a descriptor).
#[derive(Debug, Clone)]
pub struct ToolRegistration<H> {
    name: String,
    handle: H,
    policy: Option<Policy>,
    allowed_agents: HashSet<String>,
    allowed_groups: HashSet<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl<H> ToolRegistration<H> {
    /// Register `handle` under `name`, public and non-expiring.
    pub fn new(name: impl Into<String>, handle: H) -> Self {
        Self {
            name: name.into(),
            handle,
            policy: None,
            allowed_agents: HashSet::new(),
            allowed_groups: HashSet::new(),
            expires_at: None,
        }
    }

    /// Attach a tool-specific policy (highest resolution priority).
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Restrict access to a named agent. Restricting to any agent or group
    /// makes the tool non-public.
    pub fn allow_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.allowed_agents.insert(agent_id.into());
        self
    }

    /// Restrict access to members of a named group.
    pub fn allow_group(mut self, group: impl Into<String>) -> Self {
        self.allowed_groups.insert(group.into());
        self
    }

    /// Expire the registration at the given instant.
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    fn is_public(&self) -> bool {
        self.allowed_agents.is_empty() && self.allowed_groups.is_empty()
    }
}

/// A group of agents with an optional shared policy.
#[derive(Debug, Clone)]
struct AgentGroup {
    name: String,
    policy: Option<Policy>,
    members: HashSet<String>,
}

/// Outcome of an access check.
#[derive(Debug, Clone)]
pub enum ToolAccess<H> {
    /// The agent may use the tool.
    Granted(H),
    /// The registration exists but has expired. Adapters turn this into
    /// the standard audited "tool expired" denial.
    Expired,
    /// The agent is neither listed nor in an allowed group.
    Forbidden,
    /// No registration under that name.
    Unknown,
}

#[derive(Debug)]
struct RegistryState<H> {
    tools: HashMap<String, ToolRegistration<H>>,
    // Creation order matters: group policy resolution walks this in order.
    groups: Vec<AgentGroup>,
    agent_policies: HashMap<String, Policy>,
}

/// In-memory tool registry.
///
/// Mutation happens at configuration time through these APIs only; lookups
/// take the read lock. Expired registrations are treated as absent for
/// every lookup.
pub struct ToolRegistry<H> {
    state: RwLock<RegistryState<H>>,
}

impl<H: Clone> ToolRegistry<H> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                tools: HashMap::new(),
                groups: Vec::new(),
                agent_policies: HashMap::new(),
            }),
        }
    }

    /// Register a tool. Names are unique; re-registering is an error.
    pub fn register_tool(&self, registration: ToolRegistration<H>) -> Result<()> {
        let mut state = self.state.write().expect("registry lock poisoned");
        if state.tools.contains_key(&registration.name) {
            return Err(Error::DuplicateTool(registration.name));
        }
        tracing::info!(tool = %registration.name, "registering tool");
        state
            .tools
            .insert(registration.name.clone(), registration);
        Ok(())
    }

    /// Remove a tool. Unknown names are ignored.
    pub fn unregister_tool(&self, name: &str) {
        let mut state = self.state.write().expect("registry lock poisoned");
        if state.tools.remove(name).is_some() {
            tracing::info!(tool = %name, "unregistered tool");
        }
    }

    /// Create an agent group with an optional shared policy.
    pub fn create_group(&self, name: impl Into<String>, policy: Option<Policy>) -> Result<()> {
        let name = name.into();
        let mut state = self.state.write().expect("registry lock poisoned");
        if state.groups.iter().any(|g| g.name == name) {
            return Err(Error::DuplicateGroup(name));
        }
        state.groups.push(AgentGroup {
            name,
            policy,
            members: HashSet::new(),
        });
        Ok(())
    }

    /// Add an agent to an existing group.
    pub fn add_agent_to_group(&self, agent_id: impl Into<String>, group: &str) -> Result<()> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;
        group.members.insert(agent_id.into());
        Ok(())
    }

    /// Set an agent-specific policy override.
    pub fn set_agent_policy(&self, agent_id: impl Into<String>, policy: Policy) {
        let mut state = self.state.write().expect("registry lock poisoned");
        state.agent_policies.insert(agent_id.into(), policy);
    }

    /// Check whether the agent may use the tool.
    pub fn access(&self, name: &str, agent_id: &str) -> ToolAccess<H> {
        let state = self.state.read().expect("registry lock poisoned");

        let Some(registration) = state.tools.get(name) else {
            return ToolAccess::Unknown;
        };
        if registration.is_expired() {
            return ToolAccess::Expired;
        }
        if registration.is_public() || registration.allowed_agents.contains(agent_id) {
            return ToolAccess::Granted(registration.handle.clone());
        }

        let in_allowed_group = state
            .groups
            .iter()
            .any(|g| registration.allowed_groups.contains(&g.name) && g.members.contains(agent_id));
        if in_allowed_group {
            ToolAccess::Granted(registration.handle.clone())
        } else {
            ToolAccess::Forbidden
        }
    }

    /// The tool handle, if the agent has access. Expired, forbidden, and
    /// unknown all flatten to `None`.
    pub fn get_tool(&self, name: &str, agent_id: &str) -> Option<H> {
        match self.access(name, agent_id) {
            ToolAccess::Granted(handle) => Some(handle),
            _ => None,
        }
    }

    /// Names of every tool the agent may use.
    pub fn list_tools_for_agent(&self, agent_id: &str) -> Vec<String> {
        let state = self.state.read().expect("registry lock poisoned");
        let agent_groups: HashSet<&str> = state
            .groups
            .iter()
            .filter(|g| g.members.contains(agent_id))
            .map(|g| g.name.as_str())
            .collect();

        let mut names: Vec<String> = state
            .tools
            .values()
            .filter(|t| !t.is_expired())
            .filter(|t| {
                t.is_public()
                    || t.allowed_agents.contains(agent_id)
                    || t.allowed_groups.iter().any(|g| agent_groups.contains(g.as_str()))
            })
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names
    }

    /// The effective policy for a (tool, agent) pair.
    ///
    /// Precedence, highest first:
    /// 1. the tool's own policy;
    /// 2. the agent-specific policy;
    /// 3. the policies of the agent's groups, in group-creation order:
    ///    concatenated into one rule list when all of them are rule-based,
    ///    otherwise the first present one;
    /// 4. none.
    pub fn get_policy_for_tool(&self, tool_name: &str, agent_id: &str) -> Option<Policy> {
        let state = self.state.read().expect("registry lock poisoned");

        let registration = state.tools.get(tool_name)?;
        if registration.is_expired() {
            return None;
        }

        if let Some(policy) = &registration.policy {
            return Some(policy.clone());
        }

        if let Some(policy) = state.agent_policies.get(agent_id) {
            return Some(policy.clone());
        }

        let group_policies: Vec<&Policy> = state
            .groups
            .iter()
            .filter(|g| g.members.contains(agent_id))
            .filter_map(|g| g.policy.as_ref())
            .collect();

        if group_policies.is_empty() {
            return None;
        }

        let rule_based: Vec<&RuleBasedPolicy> = group_policies
            .iter()
            .filter_map(|p| p.as_rule_based())
            .collect();
        if rule_based.len() == group_policies.len() {
            if rule_based.len() == 1 {
                return Some(group_policies[0].clone());
            }
            return Some(Policy::rule_based(RuleBasedPolicy::merged(
                rule_based.into_iter(),
            )));
        }

        Some(group_policies[0].clone())
    }
}

impl<H: Clone> Default for ToolRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
