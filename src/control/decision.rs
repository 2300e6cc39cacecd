//! Pump decision engine.
//!
//! Composes the safety interlocks, operating mode, schedule window,
//! moisture hysteresis and duration guard into one "allowed to run"
//! boolean per control cycle.  Rules are evaluated in strict order and
//! the first one that fixes the outcome is reported as the
//! [`DecisionReason`]:
//!
//! ```text
//!  leak ──▶ level ──▶ mode Off ──▶ window ──▶ Forced ──▶ Sensors
//!   │        │          │           │          │     (hysteresis + temp gate)
//!   ▼        ▼          ▼           ▼          ▼          │
//!  off      off        off         off        run ──┐     │
//!                                                   ▼     ▼
//!                                            duration guard (run → off)
//! ```
//!
//! Pure function of its inputs: no state is mutated here.  The duty-cycle
//! mechanics (on/interval dwell) belong to the pump driver.

use serde::Serialize;

use crate::clock::{TimeOfDay, Timestamp};
use crate::config::{WateringConfig, WateringMode};
use crate::sensors::SensorReading;

use super::duration::DurationGuard;
use super::hysteresis::{BandAction, MoistureBand, TemperatureGate};
use super::window::window_allows;

/// Logical pump session state, owned by the duty-cycle driver.
///
/// The engine reads it and never writes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpRuntimeState {
    pub running: bool,
    pub last_on: Option<Timestamp>,
    pub last_off: Option<Timestamp>,
}

/// Everything one decision needs, sampled by the scheduler beforehand.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs {
    pub now: Timestamp,
    /// Local time of day; `None` until the wall clock is synchronised.
    pub time_of_day: Option<TimeOfDay>,
    pub pump: PumpRuntimeState,
    pub leak_present: bool,
    pub level_ok: bool,
    pub moisture: SensorReading,
    pub soil_temperature: SensorReading,
}

/// The rule that fixed the outcome of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Leak,
    LevelLow,
    ModeOff,
    OutsideWindow,
    Forced,
    MoistureInvalid,
    MoistureSatisfied,
    TemperatureOutOfBand,
    Watering,
    DurationExceeded,
}

impl DecisionReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leak => "leak",
            Self::LevelLow => "level_low",
            Self::ModeOff => "mode_off",
            Self::OutsideWindow => "outside_window",
            Self::Forced => "forced",
            Self::MoistureInvalid => "moisture_invalid",
            Self::MoistureSatisfied => "moisture_satisfied",
            Self::TemperatureOutOfBand => "temperature_out_of_band",
            Self::Watering => "watering",
            Self::DurationExceeded => "duration_exceeded",
        }
    }
}

/// Result of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpDecision {
    /// Desired pump state handed to the duty-cycle driver.
    pub run: bool,
    pub reason: DecisionReason,
    pub leak_present: bool,
    pub level_ok: bool,
}

/// Decide whether the pump should run this cycle.
pub fn decide(inputs: &DecisionInputs, config: &WateringConfig) -> PumpDecision {
    let (tentative, reason) = arbitrate(inputs, config);

    let guard = DurationGuard::new(config.max_duration_minutes);
    let run = guard.apply(tentative, inputs.pump.running, inputs.pump.last_on, inputs.now);
    let reason = if tentative && !run {
        DecisionReason::DurationExceeded
    } else {
        reason
    };

    PumpDecision {
        run,
        reason,
        leak_present: inputs.leak_present,
        level_ok: inputs.level_ok,
    }
}

fn arbitrate(inputs: &DecisionInputs, config: &WateringConfig) -> (bool, DecisionReason) {
    if inputs.leak_present {
        return (false, DecisionReason::Leak);
    }
    if !inputs.level_ok {
        return (false, DecisionReason::LevelLow);
    }
    if config.mode == WateringMode::Off {
        return (false, DecisionReason::ModeOff);
    }
    if !window_allows(config.schedule_window.as_ref(), inputs.time_of_day) {
        return (false, DecisionReason::OutsideWindow);
    }
    if config.mode == WateringMode::Forced {
        return (true, DecisionReason::Forced);
    }

    let Some(moisture) = inputs.moisture.get() else {
        return (false, DecisionReason::MoistureInvalid);
    };
    let band = MoistureBand::new(config.moisture_min, config.moisture_max);
    match band.evaluate(inputs.pump.running, Some(moisture)) {
        BandAction::TurnOn => {
            let gate = TemperatureGate::new(config.soil_temp_min, config.soil_temp_max);
            if gate.allows_start(inputs.soil_temperature.get()) {
                (true, DecisionReason::Watering)
            } else {
                (false, DecisionReason::TemperatureOutOfBand)
            }
        }
        BandAction::StayOn => (true, DecisionReason::Watering),
        BandAction::TurnOff | BandAction::StayOff => (false, DecisionReason::MoistureSatisfied),
    }
}
