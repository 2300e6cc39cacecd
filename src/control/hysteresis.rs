//! Two-threshold moisture controller with a soil temperature start gate.
//!
//! ```text
//!   moisture %
//!     max ┤· · · · · · · · · ·╭──  stop here when running
//!         │                 ╱
//!         │   hold previous ╱
//!         │      state     ╱
//!     min ┤· · ·╲· · · · ╱· · · ·  start here when idle
//!         │      ╰──────╯
//! ```
//!
//! A running pump keeps going while `moisture < max`; an idle pump starts
//! only when `moisture ≤ min`.  Between the two thresholds the previous
//! state is held, which is what prevents cycle-to-cycle oscillation.

use serde::{Deserialize, Serialize};

/// Outcome of one band evaluation relative to the previous output state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandAction {
    TurnOn,
    StayOn,
    TurnOff,
    StayOff,
}

impl BandAction {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::TurnOn | Self::StayOn)
    }
}

/// Moisture band `[min, max]` in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoistureBand {
    pub min: f32,
    pub max: f32,
}

impl MoistureBand {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Evaluate the band.  An absent reading always yields an "off" action.
    ///
    /// Well-defined for any `min`/`max`, including `min > max`.
    pub fn evaluate(&self, running: bool, moisture: Option<f32>) -> BandAction {
        let want_on = match moisture {
            None => false,
            Some(m) if running => m < self.max,
            Some(m) => m <= self.min,
        };
        match (running, want_on) {
            (false, false) => BandAction::StayOff,
            (false, true) => BandAction::TurnOn,
            (true, true) => BandAction::StayOn,
            (true, false) => BandAction::TurnOff,
        }
    }
}

/// Soil temperature range `[min, max]` in °C that permits starting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureGate {
    pub min: f32,
    pub max: f32,
}

impl TemperatureGate {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Advisory only: an unknown temperature never blocks a start.
    pub fn allows_start(&self, temperature: Option<f32>) -> bool {
        temperature.is_none_or(|t| t >= self.min && t <= self.max)
    }
}
