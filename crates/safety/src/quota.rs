//! Per-agent action quotas over a rolling window.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Quota settings for one agent.
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Actions admitted inside one window.
    pub max_actions: usize,

    /// Window length.
    pub window: Duration,
}

impl QuotaConfig {
    /// Create a quota over an hour-denominated window.
    pub fn per_hours(max_actions: usize, window_hours: u64) -> Self {
        Self {
            max_actions,
            window: Duration::from_secs(window_hours * 3600),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self::per_hours(1000, 24)
    }
}

/// Manages action quotas per agent.
///
/// Tracks the timestamps of admitted actions inside a rolling window and
/// rejects once the window is full. Memory per active agent is bounded by
/// `max_actions`: pruning happens on every touch.
pub struct QuotaManager {
    default_quota: QuotaConfig,
    overrides: DashMap<String, QuotaConfig>,
    usage: DashMap<String, Vec<Instant>>,
}

impl QuotaManager {
    /// Create a manager with the given default quota.
    pub fn new(default_quota: QuotaConfig) -> Self {
        Self {
            default_quota,
            overrides: DashMap::new(),
            usage: DashMap::new(),
        }
    }

    /// Set a custom quota for one agent.
    pub fn set_quota(&self, agent_id: impl Into<String>, quota: QuotaConfig) {
        self.overrides.insert(agent_id.into(), quota);
    }

    fn quota_for(&self, agent_id: &str) -> QuotaConfig {
        self.overrides
            .get(agent_id)
            .map(|q| q.clone())
            .unwrap_or_else(|| self.default_quota.clone())
    }

    /// Consume one action from the agent's quota.
    ///
    /// Prunes entries older than the window, then admits if the remaining
    /// count is below `max_actions`. Returns false without recording when
    /// the quota is exhausted.
    pub fn consume(&self, agent_id: &str) -> bool {
        let quota = self.quota_for(agent_id);
        let now = Instant::now();

        let mut entries = self.usage.entry(agent_id.to_string()).or_default();
        entries.retain(|t| now.duration_since(*t) < quota.window);

        if entries.len() < quota.max_actions {
            entries.push(now);
            true
        } else {
            tracing::debug!(agent_id, max_actions = quota.max_actions, "quota exhausted");
            false
        }
    }

    /// Actions the agent may still take inside the current window.
    pub fn remaining(&self, agent_id: &str) -> usize {
        let quota = self.quota_for(agent_id);
        let now = Instant::now();

        let mut entries = self.usage.entry(agent_id.to_string()).or_default();
        entries.retain(|t| now.duration_since(*t) < quota.window);
        quota.max_actions.saturating_sub(entries.len())
    }

    /// Forget the agent's usage history.
    pub fn reset(&self, agent_id: &str) {
        self.usage.remove(agent_id);
    }
}

impl Default for QuotaManager {
    fn default() -> Self {
        Self::new(QuotaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_until_the_window_is_full() {
        let manager = QuotaManager::new(QuotaConfig {
            max_actions: 2,
            window: Duration::from_secs(60),
        });

        assert!(manager.consume("a1"));
        assert!(manager.consume("a1"));
        assert!(!manager.consume("a1"));
        assert_eq!(manager.remaining("a1"), 0);
    }

    #[test]
    fn window_expiry_frees_capacity() {
        let manager = QuotaManager::new(QuotaConfig {
            max_actions: 1,
            window: Duration::from_millis(50),
        });

        assert!(manager.consume("a1"));
        assert!(!manager.consume("a1"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(manager.consume("a1"));
    }

    #[test]
    fn overrides_beat_the_default() {
        let manager = QuotaManager::new(QuotaConfig {
            max_actions: 100,
            window: Duration::from_secs(60),
        });
        manager.set_quota(
            "restricted",
            QuotaConfig {
                max_actions: 1,
                window: Duration::from_secs(60),
            },
        );

        assert!(manager.consume("restricted"));
        assert!(!manager.consume("restricted"));
        assert!(manager.consume("anyone-else"));
    }

    #[test]
    fn reset_clears_history() {
        let manager = QuotaManager::new(QuotaConfig {
            max_actions: 1,
            window: Duration::from_secs(60),
        });

        assert!(manager.consume("a1"));
        manager.reset("a1");
        assert!(manager.consume("a1"));
    }
}
