//! Sensor-side state: reading values, leak debouncing, level monitoring,
//! min/max statistics and soil probe conversions.

pub mod extremums;
pub mod leak;
pub mod soil;
pub mod water_level;

use core::fmt;

use serde::{Deserialize, Serialize};

/// One filtered sensor value plus its validity flag.
///
/// An invalid reading means "unknown".  It is never to be read as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub value: f32,
    pub valid: bool,
}

impl SensorReading {
    pub const INVALID: Self = Self {
        value: f32::NAN,
        valid: false,
    };

    pub const fn valid(value: f32) -> Self {
        Self { value, valid: true }
    }

    /// The value, if it may be used for decisions.
    pub fn get(&self) -> Option<f32> {
        (self.valid && self.value.is_finite()).then_some(self.value)
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Logical sensor values consumed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    SoilMoisture,
    SoilTemperature,
    IndoorTemperature,
    IndoorHumidity,
    HeatingTemperature,
}

impl SensorId {
    pub const COUNT: usize = 5;

    pub const ALL: [Self; Self::COUNT] = [
        Self::SoilMoisture,
        Self::SoilTemperature,
        Self::IndoorTemperature,
        Self::IndoorHumidity,
        Self::HeatingTemperature,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn group(self) -> SensorGroup {
        match self {
            Self::SoilMoisture | Self::SoilTemperature => SensorGroup::Soil,
            Self::IndoorTemperature | Self::IndoorHumidity => SensorGroup::Indoor,
            Self::HeatingTemperature => SensorGroup::Heating,
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SoilMoisture => "soil moisture",
            Self::SoilTemperature => "soil temperature",
            Self::IndoorTemperature => "indoor temperature",
            Self::IndoorHumidity => "indoor humidity",
            Self::HeatingTemperature => "heating temperature",
        };
        f.write_str(name)
    }
}

/// Physical sensor devices; commands address statistics per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorGroup {
    Soil,
    Indoor,
    Heating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_reading_has_no_value() {
        assert_eq!(SensorReading::INVALID.get(), None);
        assert_eq!(SensorReading::default().get(), None);
        assert_eq!(
            SensorReading {
                value: 0.0,
                valid: false
            }
            .get(),
            None
        );
    }

    #[test]
    fn non_finite_values_are_unusable() {
        assert_eq!(SensorReading::valid(f32::NAN).get(), None);
        assert_eq!(SensorReading::valid(f32::INFINITY).get(), None);
        assert_eq!(SensorReading::valid(0.0).get(), Some(0.0));
    }

    #[test]
    fn ids_index_densely() {
        for (i, id) in SensorId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }
}
