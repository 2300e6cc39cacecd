//! Watering service: the decision core's owned context.
//!
//! [`WateringService`] owns every piece of per-cycle state: leak debounce
//! counters, the level monitor, sensor statistics, pump run-time counters
//! and the last decision.
//! All I/O flows through port traits passed in at call sites, so the whole
//! service runs against mock adapters in tests.
//!
//! ```text
//!   SensorPort ─────────▶ ┌──────────────────────────┐ ──▶ NotifyPort
//!   DigitalInputPort ───▶ │     WateringService       │ ──▶ TelemetryPort
//!   PumpPort ◀──────────▶ │ leaks · level · extremums │ ◀─▶ ConfigPort / StoragePort
//!                         └──────────────────────────┘
//! ```
//!
//! Per-cycle order is fixed: level, leaks, period rollover, analog sensors,
//! decision, pump, session notifications.  Input faults never escape a
//! cycle; they leave the affected state unchanged and the next cycle
//! samples again.  A confirmed leak or level change requests an immediate
//! telemetry publish.

use log::{debug, info, warn};

use crate::clock::{LocalTime, TimeOfDay, Timestamp};
use crate::config::{NotifyMode, WateringConfig};
use crate::control::{DecisionInputs, PumpDecision, PumpRuntimeState, RunTimeCounters, decide};
use crate::drivers::led_patterns::Indicator;
use crate::drivers::pump::DutyCycle;
use crate::error::Result;
use crate::sensors::extremums::Extremums;
use crate::sensors::leak::{LeakMonitor, Transition};
use crate::sensors::water_level::{LevelMonitor, LevelNotice};
use crate::sensors::{SensorId, SensorReading};

use super::commands::Command;
use super::events::{
    HeatingPayload, IndoorPayload, LeakPayload, LevelPayload, Message, RunTimePayload,
    SoilPayload, TelemetryData, WateringPayload,
};
use super::ports::{
    ConfigPort, DigitalInputPort, NotifyPort, PumpPort, SensorPort, StorageError, StoragePort,
    TelemetryError, TelemetryPort,
};

/// NVS namespace of the watering subsystem.
pub const STORAGE_NAMESPACE: &str = "watering";
/// Key of the persisted statistics blob.
pub const EXTREMUMS_KEY: &str = "extremums";
/// Key of the persisted run-time counters.
pub const RUN_TIME_KEY: &str = "run_time";

const EXTREMUMS_BUF_LEN: usize = 256;
const RUN_TIME_BUF_LEN: usize = 64;

/// Time and edge information for one cycle, gathered by the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct CycleInput {
    pub now: Timestamp,
    /// `None` until the wall clock is synchronised.
    pub local: Option<LocalTime>,
    /// Level switch edge since the previous cycle; `Some(true)` = went low.
    pub level_edge: Option<bool>,
}

// ───────────────────────────────────────────────────────────────
// WateringService
// ───────────────────────────────────────────────────────────────

pub struct WateringService {
    leaks: LeakMonitor,
    level: LevelMonitor,
    extremums: Extremums,
    run_time: RunTimeCounters,
    readings: [SensorReading; SensorId::COUNT],
    /// Driver `running` flag seen at the end of the previous cycle.
    prev_running: bool,
    last_decision: Option<PumpDecision>,
    publish_requested: bool,
    cycle_count: u64,
}

impl Default for WateringService {
    fn default() -> Self {
        Self::new()
    }
}

impl WateringService {
    pub fn new() -> Self {
        Self {
            leaks: LeakMonitor::new(),
            level: LevelMonitor::new(),
            extremums: Extremums::new(),
            run_time: RunTimeCounters::new(),
            readings: [SensorReading::INVALID; SensorId::COUNT],
            prev_running: false,
            last_decision: None,
            publish_requested: false,
            cycle_count: 0,
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one decision cycle: sample inputs, decide, drive the pump.
    ///
    /// The `hw` parameter satisfies the sensor, input and pump ports at
    /// once, which avoids a double mutable borrow.
    pub fn decide_cycle(
        &mut self,
        input: CycleInput,
        config: &WateringConfig,
        hw: &mut (impl SensorPort + DigitalInputPort + PumpPort),
        notify: &mut impl NotifyPort,
    ) -> PumpDecision {
        self.cycle_count += 1;
        let now = input.now;
        let silent = config.is_silent(input.local.map(|l| l.time_of_day));

        // 1. Level switch
        let newly_enabled = config.level_sensor_enabled && !self.level.is_enabled();
        self.level.set_enabled(config.level_sensor_enabled);
        let notice = match input.level_edge {
            Some(low) => self.level.on_edge(low, now),
            None if newly_enabled => match hw.level_low() {
                Ok(low) => self.level.resync(low, now),
                Err(e) => {
                    warn!("Level: read failed ({}), assuming unchanged", e);
                    None
                }
            },
            None => self.level.poll(now, config.level_notify_period_secs),
        };
        if let Some(notice) = notice {
            self.publish_requested = true;
            send(notify, level_message(notice), quiet(config.notify_level, silent));
        }

        // 2. Leak probes
        let events = self.leaks.sample(
            config.leak_sensor_enabled,
            config.leak_debounce_count,
            |ch| hw.leak(ch),
        );
        for ev in events {
            self.publish_requested = true;
            let msg = match ev.transition {
                Transition::BecameTrue => {
                    warn!("Leak #{}: overflow detected", ev.channel);
                    Message::leak_detected(ev.channel)
                }
                Transition::BecameFalse => {
                    info!("Leak #{}: cleared", ev.channel);
                    Message::leak_cleared(ev.channel)
                }
            };
            send(notify, msg, quiet(config.notify_leak, silent));
        }

        // 3. Period rollover first, so this cycle's samples open the new
        // period.
        if let Some(local) = input.local {
            self.extremums.roll_over(&local);
            self.run_time.roll_over(&local);
        }

        // 4. Analog sensors and statistics
        for id in SensorId::ALL {
            let reading = hw.read(id);
            self.readings[id.index()] = reading;
            self.extremums.record(id, reading);
        }

        // 5. Decision.  A session ended outside the loop (suspend) is
        // announced before the new decision.
        let pump = hw.runtime_state();
        self.run_time.accrue(&pump, now);
        let notify_watering = quiet(config.notify_watering, silent);
        self.notify_session(&pump, notify_watering, notify);
        let decision = decide(
            &DecisionInputs {
                now,
                time_of_day: input.local.map(|l| l.time_of_day),
                pump,
                leak_present: self.leaks.any_leak(),
                level_ok: self.level.level_ok(),
                moisture: self.reading(SensorId::SoilMoisture),
                soil_temperature: self.reading(SensorId::SoilTemperature),
            },
            config,
        );
        self.log_decision(&decision);

        // 6. Hand off to the duty-cycle driver
        hw.configure(DutyCycle::new(
            config.cycle_on_seconds,
            config.cycle_interval_seconds,
        ));
        hw.set_desired(decision.run);

        // 7. Session notifications
        let state = hw.runtime_state();
        self.run_time.accrue(&state, now);
        self.notify_session(&state, notify_watering, notify);

        self.last_decision = Some(decision);
        decision
    }

    /// Re-seed the level monitor from a fresh hardware read (startup and
    /// resume).  Only a real change is announced.
    pub fn resync_level(
        &mut self,
        level_low: bool,
        now: Timestamp,
        time_of_day: Option<TimeOfDay>,
        config: &WateringConfig,
        notify: &mut impl NotifyPort,
    ) {
        self.level.set_enabled(config.level_sensor_enabled);
        if let Some(notice) = self.level.resync(level_low, now) {
            self.publish_requested = true;
            let mode = quiet(config.notify_level, config.is_silent(time_of_day));
            send(notify, level_message(notice), mode);
        }
    }

    /// Count a session the pump ran outside a decision cycle (suspend).
    pub fn account_run_time(&mut self, pump: &PumpRuntimeState, now: Timestamp) {
        self.run_time.accrue(pump, now);
    }

    /// Status LED indicator for the current state.
    pub fn indicator(&self, pump: &PumpRuntimeState) -> Indicator {
        Indicator::select(self.leaks.any_leak(), !self.level.level_ok(), pump.running)
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an operator command.  Mode and parameter changes go through
    /// the config port, so they are validated and persisted before they
    /// take effect.
    pub fn handle_command(&mut self, cmd: Command, store: &impl ConfigPort) -> Result<()> {
        match cmd {
            Command::SetMode(mode) => {
                let mut config = store.load()?;
                if config.mode != mode {
                    config.mode = mode;
                    store.save(&config)?;
                }
                info!("Mode set to {}", mode);
            }
            Command::UpdateConfig(config) => {
                store.save(&config)?;
                info!("Configuration updated");
            }
            Command::ResetExtremums { sensor, scope } => {
                self.extremums.reset(sensor, scope);
                info!("Extremums reset ({:?}, {:?})", sensor, scope);
            }
            Command::PublishNow => {
                self.publish_requested = true;
            }
        }
        Ok(())
    }

    /// Consume a pending `PublishNow` request.
    pub fn take_publish_request(&mut self) -> bool {
        core::mem::take(&mut self.publish_requested)
    }

    // ── Telemetry ─────────────────────────────────────────────

    /// Snapshot of everything published on the telemetry topics.
    pub fn telemetry(&self, config: &WateringConfig, pump: &PumpRuntimeState) -> TelemetryData {
        let [ch1, ch2, ch3] = self.leaks.states();
        TelemetryData {
            soil: SoilPayload {
                moisture: self.reading(SensorId::SoilMoisture).get(),
                temperature: self.reading(SensorId::SoilTemperature).get(),
            },
            indoor: IndoorPayload {
                temperature: self.reading(SensorId::IndoorTemperature).get(),
                humidity: self.reading(SensorId::IndoorHumidity).get(),
            },
            heating: HeatingPayload {
                temperature: self.reading(SensorId::HeatingTemperature).get(),
            },
            water_leak: LeakPayload {
                channel1: u8::from(ch1),
                channel2: u8::from(ch2),
                channel3: u8::from(ch3),
            },
            water_level: LevelPayload {
                status: u8::from(self.level.level_ok()),
            },
            watering: WateringPayload {
                mode: config.mode,
                pump: u8::from(pump.running),
                reason: self
                    .last_decision
                    .map_or(crate::control::DecisionReason::ModeOff, |d| d.reason),
                last_on: pump.last_on.map(Timestamp::as_secs),
                last_off: pump.last_off.map(Timestamp::as_secs),
                run_time: RunTimePayload {
                    day: self.run_time.day,
                    week: self.run_time.week,
                    month: self.run_time.month,
                    year: self.run_time.year,
                    total: self.run_time.total,
                },
            },
        }
    }

    /// Publish every telemetry topic.  Stops at the first failure.
    pub fn publish(
        &self,
        config: &WateringConfig,
        pump: &PumpRuntimeState,
        sink: &mut impl TelemetryPort,
    ) -> core::result::Result<(), TelemetryError> {
        let topics = self
            .telemetry(config, pump)
            .encode()
            .map_err(|_| TelemetryError::Encode)?;
        for (topic, payload) in &topics {
            sink.publish(topic, payload)?;
        }
        debug!("Telemetry published ({} topics)", topics.len());
        Ok(())
    }

    // ── Statistics persistence ────────────────────────────────

    /// Load persisted statistics.  A missing or unreadable blob leaves
    /// the statistics empty.
    pub fn restore_extremums(&mut self, storage: &impl StoragePort) {
        let mut buf = [0u8; EXTREMUMS_BUF_LEN];
        match storage.read(STORAGE_NAMESPACE, EXTREMUMS_KEY, &mut buf) {
            Ok(len) => match Extremums::from_bytes(&buf[..len]) {
                Ok(stats) => {
                    self.extremums = stats;
                    info!("Extremums restored ({} bytes)", len);
                }
                Err(e) => warn!("Extremums blob unreadable ({}), starting empty", e),
            },
            Err(StorageError::NotFound) => info!("No stored extremums, starting empty"),
            Err(e) => warn!("Extremums load failed ({}), starting empty", e),
        }
    }

    /// Write statistics if they changed since the last save.  A failed
    /// write keeps them dirty so the next cycle retries.
    pub fn persist_extremums(&mut self, storage: &mut impl StoragePort) {
        if !self.extremums.is_dirty() {
            return;
        }
        let bytes = match self.extremums.to_bytes() {
            Ok(b) => b,
            Err(e) => {
                warn!("Extremums encode failed: {}", e);
                return;
            }
        };
        match storage.write(STORAGE_NAMESPACE, EXTREMUMS_KEY, &bytes) {
            Ok(()) => {
                self.extremums.mark_clean();
                debug!("Extremums saved ({} bytes)", bytes.len());
            }
            Err(e) => warn!("Extremums save failed: {}", e),
        }
    }

    /// Load persisted run-time counters.  A missing or unreadable blob
    /// starts them at zero.
    pub fn restore_run_time(&mut self, storage: &impl StoragePort) {
        let mut buf = [0u8; RUN_TIME_BUF_LEN];
        match storage.read(STORAGE_NAMESPACE, RUN_TIME_KEY, &mut buf) {
            Ok(len) => match RunTimeCounters::from_bytes(&buf[..len]) {
                Ok(counters) => {
                    info!("Run-time counters restored (total {}s)", counters.total);
                    self.run_time = counters;
                }
                Err(e) => warn!("Run-time blob unreadable ({}), starting at zero", e),
            },
            Err(StorageError::NotFound) => info!("No stored run-time counters, starting at zero"),
            Err(e) => warn!("Run-time load failed ({}), starting at zero", e),
        }
    }

    /// Write run-time counters after a session ended or a period rolled
    /// over.  A failed write is retried next cycle.
    pub fn persist_run_time(&mut self, storage: &mut impl StoragePort) {
        if !self.run_time.is_dirty() {
            return;
        }
        let bytes = match self.run_time.to_bytes() {
            Ok(b) => b,
            Err(e) => {
                warn!("Run-time encode failed: {}", e);
                return;
            }
        };
        match storage.write(STORAGE_NAMESPACE, RUN_TIME_KEY, &bytes) {
            Ok(()) => {
                self.run_time.mark_clean();
                debug!("Run-time counters saved ({} bytes)", bytes.len());
            }
            Err(e) => warn!("Run-time save failed: {}", e),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn reading(&self, id: SensorId) -> SensorReading {
        self.readings[id.index()]
    }

    pub fn extremums(&self) -> &Extremums {
        &self.extremums
    }

    pub fn run_time(&self) -> &RunTimeCounters {
        &self.run_time
    }

    pub fn leaks(&self) -> &LeakMonitor {
        &self.leaks
    }

    pub fn level(&self) -> &LevelMonitor {
        &self.level
    }

    pub fn last_decision(&self) -> Option<PumpDecision> {
        self.last_decision
    }

    /// Decision cycles run since startup.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn notify_session(
        &mut self,
        state: &PumpRuntimeState,
        mode: NotifyMode,
        notify: &mut impl NotifyPort,
    ) {
        if state.running == self.prev_running {
            return;
        }
        self.prev_running = state.running;
        let msg = if state.running {
            Message::watering_started(
                self.reading(SensorId::SoilMoisture).get(),
                self.reading(SensorId::SoilTemperature).get(),
            )
        } else {
            let ran = match (state.last_on, state.last_off) {
                (Some(on), Some(off)) => off.saturating_since(on),
                _ => 0,
            };
            Message::watering_finished(ran)
        };
        send(notify, msg, mode);
    }

    fn log_decision(&self, decision: &PumpDecision) {
        let changed = self
            .last_decision
            .is_none_or(|d| d.run != decision.run || d.reason != decision.reason);
        if changed {
            info!(
                "Pump decision: {} ({})",
                if decision.run { "RUN" } else { "STOP" },
                decision.reason.as_str()
            );
        } else {
            debug!("Pump decision unchanged ({})", decision.reason.as_str());
        }
    }
}

fn level_message(notice: LevelNotice) -> Message {
    match notice {
        LevelNotice::Low => Message::level_low(),
        LevelNotice::Restored => Message::level_restored(),
    }
}

/// Silent hours deliver sound notifications without sound.
fn quiet(mode: NotifyMode, silent: bool) -> NotifyMode {
    if silent && mode == NotifyMode::Sound {
        NotifyMode::Silent
    } else {
        mode
    }
}

/// Fire-and-forget delivery: failures are logged and dropped.
fn send(notify: &mut impl NotifyPort, msg: Message, mode: NotifyMode) {
    if let Some(n) = msg.with_mode(mode) {
        if let Err(e) = notify.notify(&n) {
            warn!("Notification dropped ({}): {}", e, n.message);
        }
    }
}
