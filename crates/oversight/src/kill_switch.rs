//! Emergency stop for agent operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Snapshot of the kill-switch state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KillSwitchStatus {
    pub active: bool,
    pub activated_by: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

type ChangeCallback = Box<dyn Fn(&KillSwitchStatus) + Send + Sync>;

/// Process-wide emergency halt.
///
/// Supplied by the composition root and shared by reference; tests inject
/// fresh instances instead of relying on a global. Activation wins over
/// every policy: while active, the engine denies every request with the
/// recorded reason.
pub struct KillSwitch {
    state: Mutex<KillSwitchStatus>,
    on_change: Option<ChangeCallback>,
}

impl KillSwitch {
    /// Create an inactive kill-switch.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(KillSwitchStatus::default()),
            on_change: None,
        }
    }

    /// Register a callback fired synchronously on every state transition.
    pub fn with_callback(mut self, callback: impl Fn(&KillSwitchStatus) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Halt all operations. Idempotent: re-activating an active switch
    /// changes nothing and fires no callback.
    pub fn activate(&self, activated_by: impl Into<String>, reason: impl Into<String>) {
        let snapshot = {
            let mut state = self.state.lock().expect("kill-switch lock poisoned");
            if state.active {
                return;
            }
            state.active = true;
            state.activated_by = Some(activated_by.into());
            state.activated_at = Some(Utc::now());
            state.reason = Some(reason.into());
            state.clone()
        };

        tracing::error!(
            activated_by = snapshot.activated_by.as_deref().unwrap_or(""),
            reason = snapshot.reason.as_deref().unwrap_or(""),
            "kill-switch ACTIVATED"
        );
        if let Some(callback) = &self.on_change {
            callback(&snapshot);
        }
    }

    /// Resume operations. Idempotent. Activation metadata is kept for audit
    /// until the next activation.
    pub fn deactivate(&self, deactivated_by: impl Into<String>) {
        let deactivated_by = deactivated_by.into();
        let snapshot = {
            let mut state = self.state.lock().expect("kill-switch lock poisoned");
            if !state.active {
                return;
            }
            state.active = false;
            state.clone()
        };

        tracing::warn!(deactivated_by = %deactivated_by, "kill-switch deactivated");
        if let Some(callback) = &self.on_change {
            callback(&snapshot);
        }
    }

    /// Whether the switch is currently active.
    pub fn is_active(&self) -> bool {
        self.state.lock().expect("kill-switch lock poisoned").active
    }

    /// Current state snapshot.
    pub fn status(&self) -> KillSwitchStatus {
        self.state.lock().expect("kill-switch lock poisoned").clone()
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn activation_records_who_and_why() {
        let switch = KillSwitch::new();
        assert!(!switch.is_active());

        switch.activate("oncall", "runaway deletes");
        assert!(switch.is_active());

        let status = switch.status();
        assert_eq!(status.activated_by.as_deref(), Some("oncall"));
        assert_eq!(status.reason.as_deref(), Some("runaway deletes"));
        assert!(status.activated_at.is_some());
    }

    #[test]
    fn activate_and_deactivate_are_idempotent() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let switch =
            KillSwitch::new().with_callback(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        switch.activate("oncall", "incident");
        switch.activate("someone-else", "duplicate");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        // The first activation's metadata is preserved.
        assert_eq!(switch.status().activated_by.as_deref(), Some("oncall"));

        switch.deactivate("oncall");
        switch.deactivate("oncall");
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(!switch.is_active());
    }
}
