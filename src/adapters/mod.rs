//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                  |
//! |------------|---------------------|------------------------------|
//! | `hardware` | SensorPort          | ESP32 ADC1 (soil probe)      |
//! |            | DigitalInputPort    | Level switch, leak probes    |
//! | `log_sink` | NotifyPort          | Serial log output            |
//! |            | TelemetryPort       |                              |
//! | `nvs`      | ConfigPort          | NVS / in-memory store        |
//! |            | StoragePort         |                              |
//! | `time`     | ClockPort           | esp_timer + SNTP wall clock  |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
