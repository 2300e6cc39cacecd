//! Time value types shared by the decision core and its adapters.
//!
//! Two independent timelines are in play:
//!
//! - [`Timestamp`]: monotonic seconds since boot.  Drives run-time limits,
//!   re-notification periods and the pump session record.  Never jumps.
//! - [`LocalTime`]: wall-clock local time, only available once the clock
//!   has been synchronised.  Drives the schedule window and the
//!   daily/weekly statistics rollover.

use core::fmt;

use serde::{Deserialize, Serialize};

// ── Timestamp ─────────────────────────────────────────────────

/// Monotonic point in time, in whole seconds since boot.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms / 1000)
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`, clamped at zero.
    pub const fn saturating_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub const fn add_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

// ── Time of day ───────────────────────────────────────────────

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Minutes since local midnight, `0..1440`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);

    /// Build from hour and minute.  `None` when either is out of range.
    pub const fn from_hm(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour as u16 * 60 + minute as u16))
        } else {
            None
        }
    }

    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes < MINUTES_PER_DAY {
            Some(Self(minutes))
        } else {
            None
        }
    }

    pub const fn minutes(self) -> u16 {
        self.0
    }

    pub const fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    pub const fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

// ── Local wall-clock time ─────────────────────────────────────

/// Synchronised local time, as reported by the clock adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub time_of_day: TimeOfDay,
    /// Days since 1970-01-01 in local time.  Changes at local midnight.
    pub day_number: u32,
    /// 0 = Monday … 6 = Sunday.
    pub weekday: u8,
}

impl LocalTime {
    /// Derive local time from Unix seconds plus a fixed UTC offset.
    pub fn from_unix(unix_secs: i64, utc_offset_secs: i32) -> Self {
        let local = unix_secs + i64::from(utc_offset_secs);
        let days = local.div_euclid(86_400);
        let secs_of_day = local.rem_euclid(86_400);
        Self {
            time_of_day: TimeOfDay((secs_of_day / 60) as u16),
            day_number: days.max(0) as u32,
            // 1970-01-01 was a Thursday.
            weekday: ((days + 3).rem_euclid(7)) as u8,
        }
    }
}

impl LocalTime {
    /// Build from a broken-down local calendar date (`month` 1–12).
    /// `None` when any field is out of range or the date precedes 1970.
    pub fn from_civil(year: i32, month: u8, day: u8, hour: u8, minute: u8) -> Option<Self> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        let time_of_day = TimeOfDay::from_hm(hour, minute)?;
        let days = days_from_civil(i64::from(year), u32::from(month), u32::from(day));
        let day_number = u32::try_from(days).ok()?;
        Some(Self {
            time_of_day,
            day_number,
            weekday: ((days + 3).rem_euclid(7)) as u8,
        })
    }
}

impl LocalTime {
    /// Monday-based week counter since the epoch.
    pub const fn week_number(&self) -> u32 {
        // Day 0 (1970-01-01) was a Thursday; shift so weeks start Monday.
        (self.day_number + 3) / 7
    }

    /// Calendar `(year, month)` with `month` 1–12.
    pub fn year_month(&self) -> (i32, u8) {
        let (year, month, _) = civil_from_days(i64::from(self.day_number));
        (year, month)
    }

    /// Months since year 0, for month-boundary detection.
    pub fn month_number(&self) -> u32 {
        let (year, month) = self.year_month();
        year.max(0) as u32 * 12 + u32::from(month) - 1
    }
}

/// Days since 1970-01-01 of a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = i64::from((month + 9) % 12);
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`]: `(year, month 1–12, day 1–31)`.
fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year as i32, month, day)
}

// ── Formatting helpers ────────────────────────────────────────

/// Render a duration as `HH:MM:SS` (hours are not wrapped at 24).
pub fn format_hms(secs: u64) -> heapless::String<16> {
    use core::fmt::Write;

    let mut out = heapless::String::new();
    // Capacity overflow only truncates message text.
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );
    out
}
