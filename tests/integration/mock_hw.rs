//! Mock hardware for integration tests.
//!
//! Every port the control loop needs, backed by plain state the test can
//! script and inspect.  Clock and pump state are shared handles so the
//! test keeps control after the loop takes ownership of the adapters.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use watering::adapters::hardware::Board;
use watering::adapters::nvs::NvsAdapter;
use watering::app::events::{Notification, NotifyCategory};
use watering::app::ports::{
    ClockPort, ConfigPort, DigitalInputPort, IndicatorPort, NotifyError, NotifyPort, PumpPort,
    SensorPort, TelemetryError, TelemetryPort,
};
use watering::clock::{LocalTime, Timestamp};
use watering::config::WateringConfig;
use watering::control::PumpRuntimeState;
use watering::drivers::led_patterns::Indicator;
use watering::drivers::pump::{PumpControl, PumpShared};
use watering::error::InputError;
use watering::events::ControlSignals;
use watering::scheduler::ControlLoop;
use watering::sensors::{SensorId, SensorReading};

// ── Clock ─────────────────────────────────────────────────────

/// Manually advanced clock.  Clones share the same time.
#[derive(Clone, Default)]
pub struct MockClock {
    secs: Arc<AtomicU64>,
    local: Arc<Mutex<Option<LocalTime>>>,
}

impl MockClock {
    pub fn at(secs: u64) -> Self {
        let clock = Self::default();
        clock.set(secs);
        clock
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set_local(&self, local: Option<LocalTime>) {
        *self.local.lock().unwrap() = local;
    }
}

impl ClockPort for MockClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.secs.load(Ordering::SeqCst))
    }

    fn uptime_ms(&self) -> u64 {
        self.secs.load(Ordering::SeqCst) * 1000
    }

    fn local_time(&self) -> Option<LocalTime> {
        *self.local.lock().unwrap()
    }
}

// ── Sensors ───────────────────────────────────────────────────

pub struct MockSensors {
    pub readings: [SensorReading; SensorId::COUNT],
    /// Simulated bus time: every read advances this clock.
    pub read_cost: Option<(MockClock, u64)>,
}

impl MockSensors {
    pub fn soil(moisture: f32, temperature: f32) -> Self {
        let mut readings = [SensorReading::INVALID; SensorId::COUNT];
        readings[SensorId::SoilMoisture.index()] = SensorReading::valid(moisture);
        readings[SensorId::SoilTemperature.index()] = SensorReading::valid(temperature);
        Self {
            readings,
            read_cost: None,
        }
    }

    pub fn set(&mut self, id: SensorId, value: f32) {
        self.readings[id.index()] = SensorReading::valid(value);
    }

    pub fn invalidate(&mut self, id: SensorId) {
        self.readings[id.index()] = SensorReading::INVALID;
    }
}

impl SensorPort for MockSensors {
    fn read(&mut self, id: SensorId) -> SensorReading {
        if let Some((clock, secs)) = &self.read_cost {
            clock.advance(*secs);
        }
        self.readings[id.index()]
    }
}

// ── Digital inputs ────────────────────────────────────────────

#[derive(Default)]
pub struct MockInputs {
    pub level_low: bool,
    pub leaks: [bool; 3],
    /// Channels whose read fails.
    pub failing: [bool; 3],
    pub level_reads: u32,
    pub leak_reads: [u32; 3],
}

impl DigitalInputPort for MockInputs {
    fn level_low(&mut self) -> Result<bool, InputError> {
        self.level_reads += 1;
        Ok(self.level_low)
    }

    fn leak(&mut self, channel: usize) -> Result<bool, InputError> {
        self.leak_reads[channel] += 1;
        if self.failing[channel] {
            return Err(InputError::GpioReadFailed);
        }
        Ok(self.leaks[channel])
    }
}

// ── Status LED ────────────────────────────────────────────────

/// Records the latest indicator request.
#[derive(Default)]
pub struct MockLed {
    pub shown: Indicator,
    pub enabled: bool,
    pub updates: u32,
}

impl IndicatorPort for MockLed {
    fn indicate(&mut self, indicator: Indicator, enabled: bool) {
        self.shown = indicator;
        self.enabled = enabled;
        self.updates += 1;
    }
}

// ── Notification / telemetry recorder ─────────────────────────

#[derive(Default)]
pub struct Recorder {
    pub notifications: Vec<Notification>,
    pub telemetry: Vec<(String, String)>,
    pub telemetry_down: bool,
}

impl Recorder {
    pub fn messages(&self, category: NotifyCategory) -> Vec<&str> {
        self.notifications
            .iter()
            .filter(|n| n.category == category)
            .map(|n| n.message.as_str())
            .collect()
    }

    /// Most recent payload on `topic`.
    pub fn last_payload(&self, topic: &str) -> Option<&str> {
        self.telemetry
            .iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
    }

    pub fn publish_count(&self, topic: &str) -> usize {
        self.telemetry.iter().filter(|(t, _)| t == topic).count()
    }
}

impl NotifyPort for Recorder {
    fn notify(&mut self, n: &Notification) -> Result<(), NotifyError> {
        self.notifications.push(n.clone());
        Ok(())
    }
}

impl TelemetryPort for Recorder {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TelemetryError> {
        if self.telemetry_down {
            return Err(TelemetryError::NotConnected);
        }
        self.telemetry.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }
}

// ── Assembled rig ─────────────────────────────────────────────

pub type MockBoard = Board<MockSensors, MockInputs, PumpControl<'static, MockClock>, MockLed>;
pub type MockLoop = ControlLoop<'static, MockBoard, MockClock, Recorder, NvsAdapter>;

/// Control loop over mocks, plus the handles a test needs.
pub struct Rig {
    pub ctl: MockLoop,
    pub clock: MockClock,
    pub signals: &'static ControlSignals,
    pub pump: &'static PumpShared,
}

/// Config with no schedule window and every notification enabled.
pub fn open_config() -> WateringConfig {
    use watering::config::NotifyMode;
    WateringConfig {
        schedule_window: None,
        notify_watering: NotifyMode::Silent,
        notify_leak: NotifyMode::Silent,
        notify_level: NotifyMode::Sound,
        ..WateringConfig::default()
    }
}

pub fn rig(config: &WateringConfig, sensors: MockSensors, inputs: MockInputs) -> Rig {
    rig_with_store(config, sensors, inputs, NvsAdapter::new().unwrap())
}

pub fn rig_with_store(
    config: &WateringConfig,
    sensors: MockSensors,
    inputs: MockInputs,
    store: NvsAdapter,
) -> Rig {
    store.save(config).unwrap();
    let signals: &'static ControlSignals = Box::leak(Box::new(ControlSignals::new()));
    let pump: &'static PumpShared = Box::leak(Box::new(PumpShared::new()));
    let clock = MockClock::at(1_000);
    let board = Board::new(
        sensors,
        inputs,
        PumpControl::new(pump, clock.clone()),
        MockLed::default(),
    );
    let ctl = ControlLoop::new(signals, board, clock.clone(), Recorder::default(), store);
    Rig {
        ctl,
        clock,
        signals,
        pump,
    }
}

impl Rig {
    pub fn sensors(&mut self) -> &mut MockSensors {
        &mut self.ctl.hw_mut().sensors
    }

    pub fn inputs(&mut self) -> &mut MockInputs {
        &mut self.ctl.hw_mut().inputs
    }

    pub fn led(&self) -> &MockLed {
        &self.ctl.hw().led
    }

    pub fn out(&self) -> &Recorder {
        self.ctl.out()
    }

    pub fn pump_state(&self) -> PumpRuntimeState {
        self.ctl.hw().pump.runtime_state()
    }

    pub fn running(&self) -> bool {
        self.pump_state().running
    }

    /// Advance the clock by `secs`, then run one cycle.
    pub fn cycle_after(&mut self, secs: u64) {
        self.clock.advance(secs);
        self.ctl.run_cycle();
    }

    pub fn save_config(&self, config: &WateringConfig) {
        self.ctl.store().save(config).unwrap();
    }
}
