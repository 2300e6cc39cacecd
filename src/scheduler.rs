//! Control cycle scheduler.
//!
//! One dedicated thread owns the [`WateringService`] and every adapter it
//! talks to.  Other contexts reach it only through [`ControlSignals`].
//!
//! ```text
//!          ┌──────────────────────────────────────────────────────┐
//!          ▼                                                      │
//!  ┌──────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌─────────┐
//!  │ Idle │──▶│ Sampling │──▶│ Deciding │──▶│ Publishing │──▶│ Waiting │
//!  └──────┘   └──────────┘   └──────────┘   └────────────┘   └─────────┘
//!     │        commands,       decide,        telemetry,      period − busy,
//!     │        config,         pump, LED,     statistics,     or first event
//!     │        level edge      notifications  run-time
//!     ▼
//!  SUSPEND set ──▶ pump off, persist, park until RESUME ──▶ resync, cycle
//! ```
//!
//! The wait after each cycle is `period − processing time`, so the long-run
//! sampling period stays constant however long a cycle took.  A level
//! edge, the minute tick, a queued command or a suspend request ends the
//! wait early.

use core::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::{
    ClockPort, ConfigPort, DigitalInputPort, IndicatorPort, NotifyPort, PumpPort, SensorPort,
    StoragePort, TelemetryPort,
};
use crate::app::service::{CycleInput, WateringService};
use crate::clock::{TimeOfDay, Timestamp};
use crate::config::WateringConfig;
use crate::drivers::task_pin::CONTROL_TASK;
use crate::events::{
    ControlSignals, LEVEL_CHANGED, LEVEL_LOW, MINUTE_TICK, RESUME, SUSPEND, WAKE_MASK,
};

/// Phase of the control cycle, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Sampling,
    Deciding,
    Publishing,
    Waiting,
    Suspended,
}

// ═══════════════════════════════════════════════════════════════
//  Publish timer
// ═══════════════════════════════════════════════════════════════

/// Telemetry cadence, independent of the decision cadence.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishTimer {
    last: Option<Timestamp>,
    forced: bool,
}

impl PublishTimer {
    pub const fn new() -> Self {
        Self {
            last: None,
            forced: false,
        }
    }

    /// Publish on the next check regardless of the interval.
    pub fn force(&mut self) {
        self.forced = true;
    }

    pub fn is_due(&self, now: Timestamp, interval_secs: u32) -> bool {
        self.forced
            || self
                .last
                .is_none_or(|at| now.saturating_since(at) >= u64::from(interval_secs))
    }

    pub fn mark(&mut self, now: Timestamp) {
        self.last = Some(now);
        self.forced = false;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Control loop
// ═══════════════════════════════════════════════════════════════

/// The single-threaded control loop.
///
/// - `H`: sensors, digital inputs, the pump driver handle and the status LED
/// - `K`: clock
/// - `O`: notification and telemetry sink
/// - `P`: parameter store and blob storage
pub struct ControlLoop<'s, H, K, O, P> {
    signals: &'s ControlSignals,
    service: WateringService,
    hw: H,
    clock: K,
    out: O,
    store: P,
    phase: CyclePhase,
    publish: PublishTimer,
    last_busy: Duration,
}

impl<'s, H, K, O, P> ControlLoop<'s, H, K, O, P>
where
    H: SensorPort + DigitalInputPort + PumpPort + IndicatorPort,
    K: ClockPort,
    O: NotifyPort + TelemetryPort,
    P: ConfigPort + StoragePort,
{
    /// Build the loop, restore persisted statistics and run-time counters
    /// and seed the level monitor from the hardware.
    pub fn new(signals: &'s ControlSignals, hw: H, clock: K, out: O, store: P) -> Self {
        let mut this = Self {
            signals,
            service: WateringService::new(),
            hw,
            clock,
            out,
            store,
            phase: CyclePhase::Idle,
            publish: PublishTimer::new(),
            last_busy: Duration::ZERO,
        };
        this.service.restore_extremums(&this.store);
        this.service.restore_run_time(&this.store);
        this.resync_inputs();
        this
    }

    // ── Cycle ─────────────────────────────────────────────────

    /// Run one full cycle and return how long to wait before the next.
    pub fn run_cycle(&mut self) -> Duration {
        let started_ms = self.clock.uptime_ms();

        // Sampling
        self.phase = CyclePhase::Sampling;
        self.drain_commands();
        let config = self.load_config();
        let now = self.clock.now();
        let input = CycleInput {
            now,
            local: self.clock.local_time(),
            level_edge: self.take_level_edge(),
        };

        // Deciding
        self.phase = CyclePhase::Deciding;
        let decision = self
            .service
            .decide_cycle(input, &config, &mut self.hw, &mut self.out);
        debug!(
            "Cycle {}: run={} leak={} level_ok={}",
            self.service.cycle_count(),
            decision.run,
            decision.leak_present,
            decision.level_ok
        );
        self.show_status(&config, input.local.map(|l| l.time_of_day));

        // Publishing
        self.phase = CyclePhase::Publishing;
        self.publish_if_due(now, &config);
        self.service.persist_extremums(&mut self.store);
        self.service.persist_run_time(&mut self.store);

        let busy_ms = self.clock.uptime_ms().saturating_sub(started_ms);
        self.last_busy = Duration::from_millis(busy_ms);
        let period = Duration::from_millis(u64::from(config.cycle_period_ms));
        if self.last_busy > period {
            warn!(
                "Cycle overran: {}ms busy, {}ms period",
                busy_ms, config.cycle_period_ms
            );
        }
        self.phase = CyclePhase::Idle;
        period.saturating_sub(self.last_busy)
    }

    /// One iteration of the loop: honour a pending suspend, run a cycle,
    /// then wait for the period or the first wake event.
    pub fn step(&mut self) {
        if self.signals.get() & SUSPEND != 0 {
            self.suspend();
        }
        let wait = self.run_cycle();

        self.phase = CyclePhase::Waiting;
        let woke = self.signals.wait_any(WAKE_MASK, wait);
        if woke != 0 {
            debug!("Woken early (flags=0x{:03x})", woke);
        }
        // Level edges stay set until the next Sampling phase consumes them.
        self.signals.clear(MINUTE_TICK);
        self.signals.discard_stale_resume();
        self.phase = CyclePhase::Idle;
    }

    /// Run forever.
    pub fn run(&mut self) -> ! {
        info!("Control loop running");
        loop {
            self.step();
        }
    }

    // ── Suspend / resume ──────────────────────────────────────

    fn suspend(&mut self) {
        self.phase = CyclePhase::Suspended;
        self.hw.set_desired(false);
        let state = self.hw.runtime_state();
        self.service.account_run_time(&state, self.clock.now());
        self.service.persist_extremums(&mut self.store);
        self.service.persist_run_time(&mut self.store);
        let config = self.load_config();
        self.show_status(&config, self.clock.local_time().map(|l| l.time_of_day));
        info!("Control loop suspended, pump off");

        loop {
            let period = Duration::from_millis(u64::from(self.load_config().cycle_period_ms));
            if self.signals.wait_any(RESUME, period) != 0 {
                break;
            }
            debug!("Control loop still suspended");
        }

        self.signals.clear(SUSPEND | RESUME);
        self.resync_inputs();
        self.publish.force();
        info!("Control loop resumed");
    }

    /// Drop any stale level edge and re-read the level straight from the
    /// hardware.
    fn resync_inputs(&mut self) {
        self.signals.clear(LEVEL_CHANGED);
        let config = self.load_config();
        match self.hw.level_low() {
            Ok(low) => {
                let now = self.clock.now();
                let time_of_day = self.clock.local_time().map(|l| l.time_of_day);
                self.service
                    .resync_level(low, now, time_of_day, &config, &mut self.out);
            }
            Err(e) => warn!("Level resync failed ({}), keeping previous state", e),
        }
    }

    // ── Sampling helpers ──────────────────────────────────────

    fn drain_commands(&mut self) {
        while let Some(cmd) = self.signals.try_take_command() {
            debug!("Command: {:?}", cmd);
            if let Err(e) = self.service.handle_command(cmd, &self.store) {
                warn!("Command rejected: {}", e);
            }
        }
    }

    /// Re-read parameters every cycle; fall back to defaults on failure.
    fn load_config(&self) -> WateringConfig {
        self.store.load().unwrap_or_else(|e| {
            warn!("Config load failed ({}), using defaults", e);
            WateringConfig::default()
        })
    }

    /// Consume a pending level edge.
    ///
    /// The flag is cleared before the level mirror is read: an edge racing
    /// with us is reported again next cycle rather than lost.
    fn take_level_edge(&self) -> Option<bool> {
        if self.signals.get() & LEVEL_CHANGED == 0 {
            return None;
        }
        self.signals.clear(LEVEL_CHANGED);
        Some(self.signals.get() & LEVEL_LOW != 0)
    }

    /// Push the current indicator to the status LED; dark in silent hours.
    fn show_status(&mut self, config: &WateringConfig, time_of_day: Option<TimeOfDay>) {
        let indicator = self.service.indicator(&self.hw.runtime_state());
        self.hw.indicate(indicator, !config.is_silent(time_of_day));
    }

    fn publish_if_due(&mut self, now: Timestamp, config: &WateringConfig) {
        if self.service.take_publish_request() {
            self.publish.force();
        }
        if !self.publish.is_due(now, config.telemetry_interval_secs) {
            return;
        }
        let pump = self.hw.runtime_state();
        if let Err(e) = self.service.publish(config, &pump, &mut self.out) {
            warn!("Telemetry publish failed: {}", e);
        }
        // A failed publish waits for the next interval.
        self.publish.mark(now);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn service(&self) -> &WateringService {
        &self.service
    }

    /// Processing time of the last cycle.
    pub fn last_busy(&self) -> Duration {
        self.last_busy
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn out(&self) -> &O {
        &self.out
    }

    pub fn out_mut(&mut self) -> &mut O {
        &mut self.out
    }

    pub fn store(&self) -> &P {
        &self.store
    }
}

impl<H, K, O, P> ControlLoop<'static, H, K, O, P>
where
    H: SensorPort + DigitalInputPort + PumpPort + IndicatorPort + Send + 'static,
    K: ClockPort + Send + 'static,
    O: NotifyPort + TelemetryPort + Send + 'static,
    P: ConfigPort + StoragePort + Send + 'static,
{
    /// Start the loop on its own task pinned to the application core.
    pub fn spawn(mut self) -> crate::Result<std::thread::JoinHandle<()>> {
        CONTROL_TASK.spawn(move || {
            self.run();
        })
    }
}
