//! Cumulative pump run-time per calendar period.
//!
//! Seconds the pump session was active, summed per local day, Monday-based
//! week, calendar month and year, plus a running total.  Periods roll over
//! at the first cycle of a new period, the same way the sensor statistics
//! do.  The counters round-trip through `postcard` and are written at the
//! end of each session and on rollover, so a steady running pump does not
//! wear the flash every cycle.

use log::info;
use serde::{Deserialize, Serialize};

use crate::clock::{LocalTime, Timestamp};

use super::PumpRuntimeState;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTimeCounters {
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: u32,
    pub total: u64,
    last_day: Option<u32>,
    last_week: Option<u32>,
    last_month: Option<u32>,
    last_year: Option<i32>,
    /// Point up to which the current session has been counted.
    #[serde(skip)]
    mark: Option<Timestamp>,
    #[serde(skip)]
    dirty: bool,
}

impl RunTimeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the pump session state into the counters.
    ///
    /// Called at least once per cycle.  A running session is counted up to
    /// `now`; a session that ended since the last call is counted up to
    /// its `last_off` and marks the counters for saving.
    pub fn accrue(&mut self, pump: &PumpRuntimeState, now: Timestamp) {
        match (pump.running, self.mark) {
            (true, Some(mark)) => {
                self.add(now.saturating_since(mark));
                self.mark = Some(now);
            }
            (true, None) => {
                let start = pump.last_on.filter(|on| *on <= now).unwrap_or(now);
                self.add(now.saturating_since(start));
                self.mark = Some(now);
            }
            (false, Some(mark)) => {
                let end = pump.last_off.filter(|off| *off >= mark).unwrap_or(mark);
                self.add(end.saturating_since(mark));
                self.mark = None;
                self.dirty = true;
            }
            (false, None) => {}
        }
    }

    /// Reset the counters whose period changed.  Returns `true` if any
    /// counter was reset.
    pub fn roll_over(&mut self, local: &LocalTime) -> bool {
        let day = local.day_number;
        let week = local.week_number();
        let month = local.month_number();
        let (year, _) = local.year_month();
        let mut rolled = false;

        if self.last_day.is_some_and(|d| d != day) {
            self.day = 0;
            rolled = true;
        }
        if self.last_week.is_some_and(|w| w != week) {
            self.week = 0;
            rolled = true;
        }
        if self.last_month.is_some_and(|m| m != month) {
            self.month = 0;
            rolled = true;
        }
        if self.last_year.is_some_and(|y| y != year) {
            self.year = 0;
            rolled = true;
        }
        if rolled {
            info!("Run-time counters rolled over");
        }
        let anchors = (Some(day), Some(week), Some(month), Some(year));
        if (self.last_day, self.last_week, self.last_month, self.last_year) != anchors {
            self.last_day = Some(day);
            self.last_week = Some(week);
            self.last_month = Some(month);
            self.last_year = Some(year);
            self.dirty = true;
        }
        rolled
    }

    fn add(&mut self, secs: u64) {
        if secs == 0 {
            return;
        }
        let s = u32::try_from(secs).unwrap_or(u32::MAX);
        self.day = self.day.saturating_add(s);
        self.week = self.week.saturating_add(s);
        self.month = self.month.saturating_add(s);
        self.year = self.year.saturating_add(s);
        self.total = self.total.saturating_add(secs);
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn to_bytes(&self) -> Result<std::vec::Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
