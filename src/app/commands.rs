//! Inbound commands to the watering service.
//!
//! An external dispatcher (MQTT, messenger bot, serial console) parses
//! operator input into these typed commands and queues them through
//! [`ControlSignals::send_command`](crate::events::ControlSignals::send_command).
//! The control loop drains the queue at the start of each cycle, so every
//! command flows through the same decision path as normal operation.
//!
//! Suspend/resume are not commands: they are flags on
//! [`ControlSignals`](crate::events::ControlSignals) so they also reach a
//! parked loop.

use crate::config::{WateringConfig, WateringMode};
use crate::sensors::SensorGroup;
use crate::sensors::extremums::ExtremumScope;

/// Commands that external adapters can send into the watering core.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Switch operating mode (Off / Forced / Sensors); persisted.
    SetMode(WateringMode),

    /// Replace the whole parameter set; validated and persisted.
    UpdateConfig(WateringConfig),

    /// Clear min/max statistics.  `sensor == None` addresses every sensor.
    ResetExtremums {
        sensor: Option<SensorGroup>,
        scope: ExtremumScope,
    },

    /// Publish telemetry in the next cycle regardless of the timer.
    PublishNow,
}
