//! Min/max statistics per sensor value over three scopes.
//!
//! Daily statistics reset at the first cycle of a new local day, weekly
//! ones at the first cycle of a new (Monday-based) week.  The all-time
//! scope only resets on explicit command.  The whole table round-trips
//! through `postcard` so it survives reboots.

use log::info;
use serde::{Deserialize, Serialize};

use crate::clock::LocalTime;

use super::{SensorGroup, SensorId, SensorReading};

/// Observed minimum and maximum; `None` until the first valid sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl Extremum {
    /// Returns `true` if either bound moved.
    fn update(&mut self, value: f32) -> bool {
        let before = *self;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        *self != before
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtremumSet {
    pub daily: Extremum,
    pub weekly: Extremum,
    pub all_time: Extremum,
}

/// Which statistics a reset command clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumScope {
    /// Daily, weekly and all-time.
    All,
    Daily,
    Weekly,
    AllTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extremums {
    sensors: [ExtremumSet; SensorId::COUNT],
    last_day: Option<u32>,
    last_week: Option<u32>,
    #[serde(skip)]
    dirty: bool,
}

impl Extremums {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a reading into every scope.  Invalid readings are ignored.
    /// Only a moved bound marks the statistics dirty, so a steady sensor
    /// causes no flash writes.
    pub fn record(&mut self, id: SensorId, reading: SensorReading) {
        if let Some(v) = reading.get() {
            let set = &mut self.sensors[id.index()];
            let daily = set.daily.update(v);
            let weekly = set.weekly.update(v);
            let all_time = set.all_time.update(v);
            if daily || weekly || all_time {
                self.dirty = true;
            }
        }
    }

    /// Reset daily/weekly scopes when the local day/week changed.
    /// Returns `true` if anything was reset.
    pub fn roll_over(&mut self, local: &LocalTime) -> bool {
        let day = local.day_number;
        let week = local.week_number();
        let mut rolled = false;

        if self.last_day.is_some_and(|d| d != day) {
            for set in &mut self.sensors {
                set.daily.reset();
            }
            info!("Extremums: new day, daily statistics reset");
            rolled = true;
        }
        if self.last_week.is_some_and(|w| w != week) {
            for set in &mut self.sensors {
                set.weekly.reset();
            }
            info!("Extremums: new week, weekly statistics reset");
            rolled = true;
        }
        if self.last_day != Some(day) || self.last_week != Some(week) {
            self.last_day = Some(day);
            self.last_week = Some(week);
            self.dirty = true;
        }
        rolled
    }

    /// Operator reset.  `group == None` addresses every sensor.
    pub fn reset(&mut self, group: Option<SensorGroup>, scope: ExtremumScope) {
        for id in SensorId::ALL {
            if group.is_some_and(|g| g != id.group()) {
                continue;
            }
            let set = &mut self.sensors[id.index()];
            match scope {
                ExtremumScope::All => *set = ExtremumSet::default(),
                ExtremumScope::Daily => set.daily.reset(),
                ExtremumScope::Weekly => set.weekly.reset(),
                ExtremumScope::AllTime => set.all_time.reset(),
            }
        }
        self.dirty = true;
    }

    pub fn get(&self, id: SensorId) -> &ExtremumSet {
        &self.sensors[id.index()]
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
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
