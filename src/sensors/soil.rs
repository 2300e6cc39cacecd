//! Soil probe: capacitive moisture sensor and NTC thermistor.
//!
//! Both are read through ADC1.  The moisture probe outputs a lower voltage
//! in wetter soil; the raw count is mapped linearly between the dry and wet
//! calibration points.  The thermistor (10 kOhm @ 25 C, B = 3950) sits in a
//! divider with a fixed 10 kOhm resistor and is converted with the Beta
//! equation.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 via the oneshot API (initialised by hw_init).
//! On host/test: reads from static atomics for injection.

use core::sync::atomic::AtomicU16;
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

use super::SensorReading;

static SIM_MOISTURE_ADC: AtomicU16 = AtomicU16::new(2400);
static SIM_TEMP_ADC: AtomicU16 = AtomicU16::new(2048);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_moisture_adc(raw: u16) {
    SIM_MOISTURE_ADC.store(raw, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_temp_adc(raw: u16) {
    SIM_TEMP_ADC.store(raw, Ordering::Relaxed);
}

const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
const ADC_MAX: u16 = 4095;
const V_REF: f32 = 3.3;

/// Raw count in air (0 % moisture).
pub const MOISTURE_DRY_RAW: u16 = 3000;
/// Raw count in water (100 % moisture).
pub const MOISTURE_WET_RAW: u16 = 1300;

/// Convert a moisture probe count to percent.
///
/// Counts pinned at either ADC rail mean a disconnected or shorted probe
/// and yield an invalid reading.
pub fn moisture_percent(raw: u16, dry_raw: u16, wet_raw: u16) -> SensorReading {
    if raw == 0 || raw >= ADC_MAX || dry_raw == wet_raw {
        return SensorReading::INVALID;
    }
    let span = f32::from(dry_raw) - f32::from(wet_raw);
    let pct = (f32::from(dry_raw) - f32::from(raw)) / span * 100.0;
    SensorReading::valid(pct.clamp(0.0, 100.0))
}

/// Convert a thermistor divider count to °C.
pub fn ntc_celsius(raw: u16) -> SensorReading {
    let voltage = (f32::from(raw) / f32::from(ADC_MAX)) * V_REF;
    if voltage <= 0.01 || voltage >= (V_REF - 0.01) {
        return SensorReading::INVALID;
    }
    let r_ntc = R_DIVIDER * voltage / (V_REF - voltage);
    let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
    if inv_t <= 0.0 {
        return SensorReading::INVALID;
    }
    let celsius = 1.0 / inv_t - 273.15;
    if (-40.0..=125.0).contains(&celsius) {
        SensorReading::valid(celsius)
    } else {
        SensorReading::INVALID
    }
}

/// Soil probe bound to its two ADC channels.
pub struct SoilProbe {
    dry_raw: u16,
    wet_raw: u16,
}

impl Default for SoilProbe {
    fn default() -> Self {
        Self::new(MOISTURE_DRY_RAW, MOISTURE_WET_RAW)
    }
}

impl SoilProbe {
    pub fn new(dry_raw: u16, wet_raw: u16) -> Self {
        Self { dry_raw, wet_raw }
    }

    pub fn moisture(&self) -> SensorReading {
        moisture_percent(self.read_moisture_adc(), self.dry_raw, self.wet_raw)
    }

    pub fn temperature(&self) -> SensorReading {
        ntc_celsius(self.read_temp_adc())
    }

    #[cfg(target_os = "espidf")]
    fn read_moisture_adc(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_SOIL_MOISTURE)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_moisture_adc(&self) -> u16 {
        SIM_MOISTURE_ADC.load(Ordering::Relaxed)
    }

    #[cfg(target_os = "espidf")]
    fn read_temp_adc(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_SOIL_TEMP)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_temp_adc(&self) -> u16 {
        SIM_TEMP_ADC.load(Ordering::Relaxed)
    }
}
