//! Outbound notifications and telemetry payloads.
//!
//! The [`WateringService`](super::service::WateringService) builds these;
//! the [`NotifyPort`](super::ports::NotifyPort) and
//! [`TelemetryPort`](super::ports::TelemetryPort) adapters decide where
//! they go (serial log, MQTT, messenger bot, …).

use core::fmt::Write;

use serde::Serialize;

use crate::config::{NotifyMode, WateringMode};
use crate::control::DecisionReason;

/// Maximum notification text length.
pub const MESSAGE_CAPACITY: usize = 128;

/// Notification category; each has its own [`NotifyMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyCategory {
    Watering,
    Leak,
    Level,
}

/// An operator-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub category: NotifyCategory,
    /// `true` = deliver with sound.
    pub sound: bool,
    pub message: heapless::String<MESSAGE_CAPACITY>,
}

/// Message body before the notify policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub category: NotifyCategory,
    pub text: heapless::String<MESSAGE_CAPACITY>,
}

impl Message {
    fn new(category: NotifyCategory, args: core::fmt::Arguments<'_>) -> Self {
        let mut text = heapless::String::new();
        // Overlong text is truncated.
        let _ = text.write_fmt(args);
        Self { category, text }
    }

    pub fn leak_detected(channel: u8) -> Self {
        Self::new(
            NotifyCategory::Leak,
            format_args!("Overflow detected on input #{}", channel),
        )
    }

    pub fn leak_cleared(channel: u8) -> Self {
        Self::new(
            NotifyCategory::Leak,
            format_args!("Overflow on input #{} cleared", channel),
        )
    }

    pub fn level_low() -> Self {
        Self::new(NotifyCategory::Level, format_args!("Water level is low"))
    }

    pub fn level_restored() -> Self {
        Self::new(NotifyCategory::Level, format_args!("Water level restored"))
    }

    pub fn watering_started(moisture: Option<f32>, soil_temp: Option<f32>) -> Self {
        let mut text = heapless::String::<MESSAGE_CAPACITY>::new();
        let _ = write!(text, "Watering started (moisture ");
        let _ = match moisture {
            Some(m) => write!(text, "{:.1}%", m),
            None => write!(text, "--"),
        };
        let _ = match soil_temp {
            Some(t) => write!(text, ", soil {:.1}\u{00b0}C)", t),
            None => write!(text, ", soil --)"),
        };
        Self {
            category: NotifyCategory::Watering,
            text,
        }
    }

    pub fn watering_finished(ran_secs: u64) -> Self {
        Self::new(
            NotifyCategory::Watering,
            format_args!("Watering finished, ran {}", crate::clock::format_hms(ran_secs)),
        )
    }

    /// Apply the category's notify mode; `Off` suppresses the message.
    pub fn with_mode(self, mode: NotifyMode) -> Option<Notification> {
        match mode {
            NotifyMode::Off => None,
            NotifyMode::Silent | NotifyMode::Sound => Some(Notification {
                category: self.category,
                sound: mode == NotifyMode::Sound,
                message: self.text,
            }),
        }
    }
}

// ── Telemetry ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoilPayload {
    pub moisture: Option<f32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndoorPayload {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatingPayload {
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeakPayload {
    pub channel1: u8,
    pub channel2: u8,
    pub channel3: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelPayload {
    /// 1 = level OK, 0 = low.
    pub status: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WateringPayload {
    pub mode: WateringMode,
    pub pump: u8,
    pub reason: DecisionReason,
    /// Seconds since boot.
    pub last_on: Option<u64>,
    pub last_off: Option<u64>,
    pub run_time: RunTimePayload,
}

/// Cumulative pump run-time in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTimePayload {
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: u32,
    pub total: u64,
}

/// A point-in-time snapshot of everything published on telemetry topics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub soil: SoilPayload,
    pub indoor: IndoorPayload,
    pub heating: HeatingPayload,
    pub water_leak: LeakPayload,
    pub water_level: LevelPayload,
    pub watering: WateringPayload,
}

impl TelemetryData {
    /// Serialise every topic to JSON, in publish order.
    pub fn encode(&self) -> Result<[(&'static str, String); 6], serde_json::Error> {
        Ok([
            ("soil", serde_json::to_string(&self.soil)?),
            ("indoor", serde_json::to_string(&self.indoor)?),
            ("heating", serde_json::to_string(&self.heating)?),
            ("water_leak", serde_json::to_string(&self.water_leak)?),
            ("water_level", serde_json::to_string(&self.water_level)?),
            ("watering", serde_json::to_string(&self.watering)?),
        ])
    }
}
