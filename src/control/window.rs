//! Daily schedule window.
//!
//! Watering is only allowed inside a configured `[start, end)` interval of
//! the local day.  Intervals may wrap past midnight:
//!
//! ```text
//!   start < end:   ──────[start══════end)──────     start ≤ t < end
//!   start > end:   ═══end)──────────[start═════     t ≥ start || t < end
//! ```
//!
//! `start == end` is an empty window.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::clock::TimeOfDay;

/// Half-open daily interval `[start, end)` in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl ScheduleWindow {
    pub const fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Parse the packed `HHMMHHMM` form used by the parameter UI,
    /// e.g. `18002100` for 18:00–21:00 or `21000600` for 21:00–06:00.
    pub fn from_packed(packed: u32) -> Result<Self, ConfigError> {
        if packed > 2359_2359 {
            return Err(ConfigError::ValidationFailed("timespan must be HHMMHHMM"));
        }
        let start_hhmm = packed / 10_000;
        let end_hhmm = packed % 10_000;
        let start = hhmm(start_hhmm)
            .ok_or(ConfigError::ValidationFailed("timespan start is not a valid HHMM"))?;
        let end = hhmm(end_hhmm)
            .ok_or(ConfigError::ValidationFailed("timespan end is not a valid HHMM"))?;
        Ok(Self { start, end })
    }

    /// Inverse of [`from_packed`](Self::from_packed).
    pub fn to_packed(&self) -> u32 {
        let encode = |t: TimeOfDay| u32::from(t.hour()) * 100 + u32::from(t.minute());
        encode(self.start) * 10_000 + encode(self.end)
    }

    /// Whether `t` falls inside the window.
    pub fn contains(&self, t: TimeOfDay) -> bool {
        if self.start <= self.end {
            t >= self.start && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

fn hhmm(value: u32) -> Option<TimeOfDay> {
    TimeOfDay::from_hm((value / 100) as u8, (value % 100) as u8)
}

impl fmt::Display for ScheduleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.end)
    }
}

/// Window gate used by the decision engine.
///
/// `None` means no restriction.  An unknown time of day (clock not yet
/// synchronised) is treated as inside the window.
pub fn window_allows(window: Option<&ScheduleWindow>, now: Option<TimeOfDay>) -> bool {
    match (window, now) {
        (None, _) | (Some(_), None) => true,
        (Some(w), Some(t)) => w.contains(t),
    }
}
