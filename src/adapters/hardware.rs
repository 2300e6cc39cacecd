//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! - [`GpioInputs`]: level switch and leak probes over `embedded-hal` pins
//!   ([`DigitalInputPort`]).
//! - [`BoardSensors`]: soil probe on ADC1 ([`SensorPort`]).  Indoor and
//!   heating sensors are external and report invalid until wired up.
//! - [`Board`]: bundles sensors, inputs, the pump handle and the status
//!   LED so the control loop sees one hardware object.
//!
//! Pin drivers are created in `main` with esp-idf-hal; on host the same
//! types are fed mock pins.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{DigitalInputPort, IndicatorPort, PumpPort, SensorPort};
use crate::config::LEAK_CHANNELS;
use crate::control::PumpRuntimeState;
use crate::drivers::led_patterns::Indicator;
use crate::drivers::pump::DutyCycle;
use crate::error::InputError;
use crate::pins::LEAK_SETTLE_US;
use crate::sensors::soil::SoilProbe;
use crate::sensors::{SensorId, SensorReading};

// ── Digital inputs ────────────────────────────────────────────

/// Level switch plus the three powered leak probes.
///
/// All inputs are active low.  The probes share one activator output that
/// is only driven while a channel is being sampled, which keeps the probe
/// electrodes from corroding.
pub struct GpioInputs<L, K, A, D> {
    level: L,
    leaks: [K; LEAK_CHANNELS],
    activator: A,
    delay: D,
    settle_us: u32,
}

impl<L, K, A, D> GpioInputs<L, K, A, D>
where
    L: InputPin,
    K: InputPin,
    A: OutputPin,
    D: DelayNs,
{
    pub fn new(level: L, leaks: [K; LEAK_CHANNELS], activator: A, delay: D) -> Self {
        Self {
            level,
            leaks,
            activator,
            delay,
            settle_us: LEAK_SETTLE_US,
        }
    }

    /// Override the probe settle delay.
    pub fn with_settle_us(mut self, settle_us: u32) -> Self {
        self.settle_us = settle_us;
        self
    }
}

impl<L, K, A, D> DigitalInputPort for GpioInputs<L, K, A, D>
where
    L: InputPin,
    K: InputPin,
    A: OutputPin,
    D: DelayNs,
{
    fn level_low(&mut self) -> Result<bool, InputError> {
        self.level.is_low().map_err(|_| InputError::GpioReadFailed)
    }

    fn leak(&mut self, channel: usize) -> Result<bool, InputError> {
        let Some(pin) = self.leaks.get_mut(channel) else {
            return Err(InputError::GpioReadFailed);
        };
        self.activator
            .set_high()
            .map_err(|_| InputError::ActivatorFailed)?;
        self.delay.delay_us(self.settle_us);
        let sample = pin.is_low().map_err(|_| InputError::GpioReadFailed);
        if self.activator.set_low().is_err() {
            warn!("hardware: leak activator release failed");
            return Err(InputError::ActivatorFailed);
        }
        sample
    }
}

// ── Analog sensors ────────────────────────────────────────────

/// Analog sensor bank.
#[derive(Default)]
pub struct BoardSensors {
    probe: SoilProbe,
}

impl BoardSensors {
    pub fn new(probe: SoilProbe) -> Self {
        Self { probe }
    }
}

impl SensorPort for BoardSensors {
    fn read(&mut self, id: SensorId) -> SensorReading {
        match id {
            SensorId::SoilMoisture => self.probe.moisture(),
            SensorId::SoilTemperature => self.probe.temperature(),
            SensorId::IndoorTemperature
            | SensorId::IndoorHumidity
            | SensorId::HeatingTemperature => SensorReading::INVALID,
        }
    }
}

// ── Combined board ────────────────────────────────────────────

/// Everything the control loop drives, behind one value.
pub struct Board<S, I, P, L> {
    pub sensors: S,
    pub inputs: I,
    pub pump: P,
    pub led: L,
}

impl<S, I, P, L> Board<S, I, P, L> {
    pub fn new(sensors: S, inputs: I, pump: P, led: L) -> Self {
        Self {
            sensors,
            inputs,
            pump,
            led,
        }
    }
}

impl<S: SensorPort, I, P, L> SensorPort for Board<S, I, P, L> {
    fn read(&mut self, id: SensorId) -> SensorReading {
        self.sensors.read(id)
    }
}

impl<S, I: DigitalInputPort, P, L> DigitalInputPort for Board<S, I, P, L> {
    fn level_low(&mut self) -> Result<bool, InputError> {
        self.inputs.level_low()
    }

    fn leak(&mut self, channel: usize) -> Result<bool, InputError> {
        self.inputs.leak(channel)
    }
}

impl<S, I, P: PumpPort, L> PumpPort for Board<S, I, P, L> {
    fn configure(&mut self, cycle: DutyCycle) {
        self.pump.configure(cycle);
    }

    fn set_desired(&mut self, run: bool) {
        self.pump.set_desired(run);
    }

    fn runtime_state(&self) -> PumpRuntimeState {
        self.pump.runtime_state()
    }
}

impl<S, I, P, L: IndicatorPort> IndicatorPort for Board<S, I, P, L> {
    fn indicate(&mut self, indicator: Indicator, enabled: bool) {
        self.led.indicate(indicator, enabled);
    }
}
