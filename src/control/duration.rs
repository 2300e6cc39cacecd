//! Maximum continuous run-time guard.
//!
//! One-sided: it can only veto a tentative "keep running" decision once the
//! pump has been on for `max_duration_minutes` since `last_on`.  It never
//! turns a stop into a run and never blocks a fresh start.

use crate::clock::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationGuard {
    /// Maximum continuous run in minutes.  `0` disables the guard.
    pub max_duration_minutes: u32,
}

impl DurationGuard {
    pub const fn new(max_duration_minutes: u32) -> Self {
        Self {
            max_duration_minutes,
        }
    }

    pub const fn limit_secs(&self) -> u64 {
        self.max_duration_minutes as u64 * 60
    }

    /// Whether the current run must be cut off.
    ///
    /// `last_on == None` while running means the session start is unknown;
    /// the guard cannot measure it and does not cut off.
    pub fn is_exceeded(&self, running: bool, last_on: Option<Timestamp>, now: Timestamp) -> bool {
        if self.max_duration_minutes == 0 || !running {
            return false;
        }
        last_on.is_some_and(|on| now.saturating_since(on) >= self.limit_secs())
    }

    /// Apply the guard to a tentative decision.
    pub fn apply(
        &self,
        tentative: bool,
        running: bool,
        last_on: Option<Timestamp>,
        now: Timestamp,
    ) -> bool {
        tentative && !self.is_exceeded(running, last_on, now)
    }
}
