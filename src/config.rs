//! Watering configuration parameters.
//!
//! All operator-tunable parameters for the watering controller.  Values
//! are persisted in NVS by the parameter store and re-read by the control
//! loop every cycle; a change takes effect on the next cycle.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::clock::TimeOfDay;
use crate::control::window::ScheduleWindow;

/// Number of leak probe channels on the board.
pub const LEAK_CHANNELS: usize = 3;

/// Operating mode of the watering controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WateringMode {
    /// Never water.
    Off,
    /// Water whenever safety interlocks and the schedule window allow,
    /// ignoring the soil sensors.
    Forced,
    /// Water according to soil moisture and temperature.
    Sensors,
}

impl WateringMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Forced => "forced",
            Self::Sensors => "sensors",
        }
    }
}

impl fmt::Display for WateringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery policy for one notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    Off,
    Silent,
    Sound,
}

/// Watering controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WateringConfig {
    // --- Mode & schedule ---
    pub mode: WateringMode,
    /// Daily window in which watering is allowed; `None` = no restriction.
    pub schedule_window: Option<ScheduleWindow>,

    // --- Soil thresholds ---
    /// Start watering at or below this moisture (%)
    pub moisture_min: f32,
    /// Stop watering at or above this moisture (%)
    pub moisture_max: f32,
    /// Lowest soil temperature (°C) at which a start is allowed
    pub soil_temp_min: f32,
    /// Highest soil temperature (°C) at which a start is allowed
    pub soil_temp_max: f32,

    // --- Pump ---
    /// Maximum continuous run (minutes); 0 disables the limit
    pub max_duration_minutes: u32,
    /// Relay on-time within each duty cycle (seconds)
    pub cycle_on_seconds: u32,
    /// Duty cycle length (seconds)
    pub cycle_interval_seconds: u32,

    // --- Inputs ---
    /// Consecutive clean samples needed to clear a leak
    pub leak_debounce_count: u32,
    pub level_sensor_enabled: bool,
    pub leak_sensor_enabled: [bool; LEAK_CHANNELS],

    // --- Notifications ---
    pub notify_watering: NotifyMode,
    pub notify_leak: NotifyMode,
    pub notify_level: NotifyMode,
    /// Re-notify a persistent low level after this many seconds
    pub level_notify_period_secs: u32,
    /// Quiet hours: status LED dark, notifications delivered without sound.
    /// `None` disables silent mode.
    pub silent_window: Option<ScheduleWindow>,

    // --- Timing ---
    /// Control cycle period (milliseconds)
    pub cycle_period_ms: u32,
    /// Telemetry publish interval (seconds)
    pub telemetry_interval_secs: u32,
}

impl Default for WateringConfig {
    fn default() -> Self {
        Self {
            mode: WateringMode::Sensors,
            schedule_window: TimeOfDay::from_hm(18, 0)
                .zip(TimeOfDay::from_hm(21, 0))
                .map(|(start, end)| ScheduleWindow::new(start, end)),

            // Soil
            moisture_min: 30.0,
            moisture_max: 50.0,
            soil_temp_min: 10.0,
            soil_temp_max: 30.0,

            // Pump
            max_duration_minutes: 120,
            cycle_on_seconds: 15,
            cycle_interval_seconds: 300,

            // Inputs
            leak_debounce_count: 100,
            level_sensor_enabled: true,
            leak_sensor_enabled: [true; LEAK_CHANNELS],

            // Notifications
            notify_watering: NotifyMode::Off,
            notify_leak: NotifyMode::Silent,
            notify_level: NotifyMode::Silent,
            level_notify_period_secs: 12 * 3600,
            silent_window: None,

            // Timing
            cycle_period_ms: 30_000,
            telemetry_interval_secs: 60,
        }
    }
}

impl WateringConfig {
    /// Whether `now` falls in the silent window.  An unsynchronised clock
    /// is never silent.
    pub fn is_silent(&self, now: Option<TimeOfDay>) -> bool {
        self.silent_window
            .zip(now)
            .is_some_and(|(window, t)| window.contains(t))
    }

    /// Range-check every field.
    ///
    /// Run by the parameter store before persisting.  The decision engine
    /// never calls this and stays well-defined on unvalidated values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.moisture_min) || !(0.0..=100.0).contains(&self.moisture_max)
        {
            return Err(ConfigError::ValidationFailed("moisture thresholds must be 0–100"));
        }
        if self.moisture_min > self.moisture_max {
            return Err(ConfigError::ValidationFailed(
                "moisture_min must be <= moisture_max",
            ));
        }
        if !(-40.0..=85.0).contains(&self.soil_temp_min)
            || !(-40.0..=85.0).contains(&self.soil_temp_max)
        {
            return Err(ConfigError::ValidationFailed(
                "soil temperature thresholds must be -40–85",
            ));
        }
        if self.soil_temp_min > self.soil_temp_max {
            return Err(ConfigError::ValidationFailed(
                "soil_temp_min must be <= soil_temp_max",
            ));
        }
        if self.max_duration_minutes > 24 * 60 {
            return Err(ConfigError::ValidationFailed(
                "max_duration_minutes must be 0–1440",
            ));
        }
        if self.cycle_interval_seconds > 0 && self.cycle_on_seconds == 0 {
            return Err(ConfigError::ValidationFailed(
                "cycle_on_seconds must be > 0 when cycling",
            ));
        }
        if self.leak_debounce_count == 0 {
            return Err(ConfigError::ValidationFailed("leak_debounce_count must be > 0"));
        }
        if !(1_000..=3_600_000).contains(&self.cycle_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "cycle_period_ms must be 1000–3600000",
            ));
        }
        if !(5..=86_400).contains(&self.telemetry_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_secs must be 5–86400",
            ));
        }
        if self.level_notify_period_secs < 60 {
            return Err(ConfigError::ValidationFailed(
                "level_notify_period_secs must be >= 60",
            ));
        }
        Ok(())
    }
}
