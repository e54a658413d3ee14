//! Temporal policy: allow only inside configured time windows.

use chrono::{DateTime, Datelike, Local, NaiveTime, Weekday};
use std::collections::HashSet;

use enact_core::GovernanceDecision;

/// A window of wall-clock time during which access is allowed.
#[derive(Debug, Clone)]
pub struct TimeWindow {
    /// Inclusive start of the window.
    pub start: NaiveTime,

    /// Exclusive end of the window.
    pub end: NaiveTime,

    /// Days the window applies to. Empty means every day.
    pub days_of_week: HashSet<Weekday>,
}

impl TimeWindow {
    /// A window applying every day.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            days_of_week: HashSet::new(),
        }
    }

    /// Restrict the window to the given days.
    pub fn on_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days_of_week = days.into_iter().collect();
        self
    }

    fn contains(&self, time: NaiveTime, day: Weekday) -> bool {
        if !self.days_of_week.is_empty() && !self.days_of_week.contains(&day) {
            return false;
        }
        self.start <= time && time < self.end
    }
}

/// A policy that restricts access based on local time.
///
/// The decision depends on the clock alone, never on the request. Outside
/// every window the policy falls back to `default_allow`.
#[derive(Debug, Clone)]
pub struct TemporalPolicy {
    windows: Vec<TimeWindow>,
    default_allow: bool,
}

impl TemporalPolicy {
    /// Create a policy over the given windows.
    pub fn new(windows: Vec<TimeWindow>, default_allow: bool) -> Self {
        Self {
            windows,
            default_allow,
        }
    }

    /// Decide against the current local time.
    pub fn decide_now(&self) -> GovernanceDecision {
        self.decide_at(&Local::now())
    }

    /// Decide against an explicit timestamp.
    pub fn decide_at(&self, now: &DateTime<Local>) -> GovernanceDecision {
        let time = now.time();
        let day = now.weekday();

        if self.windows.iter().any(|w| w.contains(time, day)) {
            return GovernanceDecision::allow("within allowed time window");
        }

        if self.default_allow {
            GovernanceDecision::allow("outside allowed time windows")
        } else {
            GovernanceDecision::deny("outside allowed time windows")
        }
    }
}
