//! GPIO / peripheral pin assignments for the watering controller board
//! (ESP32-WROOM).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.
#![allow(dead_code)]

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// Relay output driving the pump (active HIGH).
pub const PUMP_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Leak probes
// ---------------------------------------------------------------------------

/// Output powering the leak probe pull-ups during a sample (active HIGH).
pub const WATER_LEAK_ACT_GPIO: i32 = 19;
/// Leak probe inputs, active LOW (water bridges the probe to ground).
pub const WATER_LEAK1_GPIO: i32 = 33;
pub const WATER_LEAK2_GPIO: i32 = 25;
pub const WATER_LEAK3_GPIO: i32 = 26;

/// Probe settle time after powering the activator.
pub const LEAK_SETTLE_US: u32 = 1_000;

// ---------------------------------------------------------------------------
// Reservoir level switch
// ---------------------------------------------------------------------------

/// Float switch, active LOW (0 = level low).  Hardware-debounced; both
/// edges raise an interrupt.
pub const WATER_LEVEL_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Soil probe (ADC1)
// ---------------------------------------------------------------------------

/// Capacitive moisture probe, ADC1 channel 0 (GPIO 36 / SENSOR_VP).
pub const SOIL_MOISTURE_ADC_GPIO: i32 = 36;
/// Soil NTC divider, ADC1 channel 3 (GPIO 39 / SENSOR_VN).
pub const SOIL_TEMP_ADC_GPIO: i32 = 39;

// ---------------------------------------------------------------------------
// External sensors
// ---------------------------------------------------------------------------

/// 1-Wire bus for the DS18B20 heating-loop probe.
pub const DS18B20_GPIO: i32 = 32;
/// RS-485 link to the indoor climate sensor.
pub const RS485_RX_GPIO: i32 = 17;
pub const RS485_TX_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

pub const SYSTEM_LED_GPIO: i32 = 23;
/// Lit while a watering session is active.
pub const WATERING_LED_GPIO: i32 = 4;
