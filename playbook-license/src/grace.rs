//! Offline grace policy.
//!
//! When the license authority is unreachable, the license stays usable for a
//! bounded window after the last successful confirmation, so a transient
//! outage does not lock out a paying customer. Entitlement expiry is checked
//! elsewhere and is never excused here.

use chrono::{DateTime, TimeDelta, Utc};

/// Default grace window: 7 days.
pub const DEFAULT_GRACE_WINDOW_SECS: u64 = 604_800;

/// Decides whether an unreachable authority leaves the license usable.
#[derive(Debug, Clone, Copy)]
pub struct GracePolicy {
    window: TimeDelta,
}

impl GracePolicy {
    /// A policy with the given window.
    #[must_use]
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window)
                .unwrap_or_else(|_| TimeDelta::seconds(DEFAULT_GRACE_WINDOW_SECS as i64)),
        }
    }

    /// True while `now - last_check` is inside the window.
    #[must_use]
    pub fn usable(&self, last_check: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last_check) < self.window
    }
}

impl Default for GracePolicy {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(DEFAULT_GRACE_WINDOW_SECS))
    }
}
