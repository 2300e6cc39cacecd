//! Duty-cycle pump relay driver.
//!
//! Splits the pump into a logical session and a physical relay:
//!
//! ```text
//!   ControlLoop ──set_desired──▶ PumpControl ──┐
//!                                              ▼
//!                                    PumpShared (session record)
//!                                              ▲
//!   relay thread ──poll every 250 ms── RelayDriver ──▶ relay OutputPin
//! ```
//!
//! While a session is active the relay is on for the first `on_secs` of
//! every `interval_secs` window measured from `last_on`, letting water
//! soak in between bursts.  A zero interval, or an on-time that covers the
//! whole interval, keeps the relay on for the entire session.
//!
//! ## Dual-target design
//!
//! The relay is any `embedded-hal` output pin: an esp-idf-hal `PinDriver`
//! on target, a recording mock on host.

use core::cell::Cell;
use core::time::Duration;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::{ClockPort, PumpPort};
use crate::control::PumpRuntimeState;
use crate::drivers::task_pin::RELAY_TASK;

/// Relay poll period of the driver thread.
pub const RELAY_POLL: Duration = Duration::from_millis(250);

/// Relay on/interval timing within a watering session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DutyCycle {
    pub on_secs: u32,
    pub interval_secs: u32,
}

impl DutyCycle {
    pub const CONTINUOUS: Self = Self {
        on_secs: 0,
        interval_secs: 0,
    };

    pub const fn new(on_secs: u32, interval_secs: u32) -> Self {
        Self {
            on_secs,
            interval_secs,
        }
    }

    pub const fn is_continuous(&self) -> bool {
        self.interval_secs == 0 || self.on_secs >= self.interval_secs
    }

    /// Relay state `elapsed_secs` into a session.
    pub const fn output_at(&self, elapsed_secs: u64) -> bool {
        self.is_continuous() || elapsed_secs % (self.interval_secs as u64) < (self.on_secs as u64)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Session {
    state: PumpRuntimeState,
    cycle: DutyCycle,
}

/// Session record shared between [`PumpControl`] and [`RelayDriver`].
pub struct PumpShared {
    session: Mutex<CriticalSectionRawMutex, Cell<Session>>,
}

impl Default for PumpShared {
    fn default() -> Self {
        Self::new()
    }
}

impl PumpShared {
    pub const fn new() -> Self {
        Self {
            session: Mutex::new(Cell::new(Session {
                state: PumpRuntimeState {
                    running: false,
                    last_on: None,
                    last_off: None,
                },
                cycle: DutyCycle::CONTINUOUS,
            })),
        }
    }

    fn snapshot(&self) -> Session {
        self.session.lock(Cell::get)
    }

    fn update(&self, f: impl FnOnce(&mut Session)) {
        self.session.lock(|cell| {
            let mut s = cell.get();
            f(&mut s);
            cell.set(s);
        });
    }
}

// ── Logical side ──────────────────────────────────────────────

/// [`PumpPort`] handle used by the control loop.
pub struct PumpControl<'a, K> {
    shared: &'a PumpShared,
    clock: K,
}

impl<'a, K: ClockPort> PumpControl<'a, K> {
    pub fn new(shared: &'a PumpShared, clock: K) -> Self {
        Self { shared, clock }
    }
}

impl<K: ClockPort> PumpPort for PumpControl<'_, K> {
    fn configure(&mut self, cycle: DutyCycle) {
        self.shared.update(|s| s.cycle = cycle);
    }

    fn set_desired(&mut self, run: bool) {
        let now = self.clock.now();
        self.shared.update(|s| {
            if run && !s.state.running {
                s.state.running = true;
                s.state.last_on = Some(now);
                info!("Pump: session started at {}s", now.as_secs());
            } else if !run && s.state.running {
                s.state.running = false;
                s.state.last_off = Some(now);
                info!("Pump: session stopped at {}s", now.as_secs());
            }
        });
    }

    fn runtime_state(&self) -> PumpRuntimeState {
        self.shared.snapshot().state
    }
}

// ── Physical side ─────────────────────────────────────────────

/// Applies the duty cycle of the current session to the relay pin.
pub struct RelayDriver<'a, P, K> {
    shared: &'a PumpShared,
    relay: P,
    clock: K,
    output: Option<bool>,
}

impl<'a, P: OutputPin, K: ClockPort> RelayDriver<'a, P, K> {
    pub fn new(shared: &'a PumpShared, relay: P, clock: K) -> Self {
        Self {
            shared,
            relay,
            clock,
            output: None,
        }
    }

    /// Evaluate the duty cycle once and drive the relay if it changed.
    /// Returns the relay state.
    pub fn step(&mut self) -> Result<bool, P::Error> {
        let session = self.shared.snapshot();
        let on = match (session.state.running, session.state.last_on) {
            (true, Some(start)) => session
                .cycle
                .output_at(self.clock.now().saturating_since(start)),
            (true, None) => true,
            (false, _) => false,
        };
        if self.output != Some(on) {
            if on {
                self.relay.set_high()?;
            } else {
                self.relay.set_low()?;
            }
            self.output = Some(on);
        }
        Ok(on)
    }

    /// Drive the relay low regardless of the session.
    pub fn force_off(&mut self) -> Result<(), P::Error> {
        self.relay.set_low()?;
        self.output = Some(false);
        Ok(())
    }
}

/// Run the relay driver on its own thread, polling every [`RELAY_POLL`].
pub fn spawn_relay_driver<P, K>(
    shared: &'static PumpShared,
    relay: P,
    clock: K,
) -> crate::Result<std::thread::JoinHandle<()>>
where
    P: OutputPin + Send + 'static,
    K: ClockPort + Send + 'static,
{
    RELAY_TASK.spawn(move || {
        let mut driver = RelayDriver::new(shared, relay, clock);
        if driver.force_off().is_err() {
            warn!("Pump: relay init write failed");
        }
        loop {
            if let Err(e) = driver.step() {
                warn!("Pump: relay write failed: {:?}", e);
            }
            std::thread::sleep(RELAY_POLL);
        }
    })
}
