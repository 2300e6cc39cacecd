//! Watering status LED driver.
//!
//! ```text
//!   ControlLoop ──indicate──▶ StatusLed ──▶ LedShared ◀── LedDriver ──▶ LED OutputPin
//!                                                       (tick every 50 ms)
//! ```
//!
//! The control loop only publishes the wanted [`Indicator`]; the blink
//! timing runs on its own low-priority thread so a long sensor cycle never
//! stretches a flash.
//!
//! ## Dual-target design
//!
//! The LED is any `embedded-hal` output pin: an esp-idf-hal `PinDriver`
//! on target, a recording mock on host.

use core::cell::Cell;
use core::time::Duration;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::IndicatorPort;
use crate::drivers::led_patterns::{Indicator, LedPatternEngine};
use crate::drivers::task_pin::LED_TASK;

/// Pattern tick of the LED thread.
pub const LED_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LedRequest {
    indicator: Indicator,
    enabled: bool,
}

/// Latest indicator request, shared between [`StatusLed`] and [`LedDriver`].
pub struct LedShared {
    request: Mutex<CriticalSectionRawMutex, Cell<LedRequest>>,
}

impl Default for LedShared {
    fn default() -> Self {
        Self::new()
    }
}

impl LedShared {
    pub const fn new() -> Self {
        Self {
            request: Mutex::new(Cell::new(LedRequest {
                indicator: Indicator::Idle,
                enabled: true,
            })),
        }
    }

    fn snapshot(&self) -> LedRequest {
        self.request.lock(Cell::get)
    }

    fn set(&self, request: LedRequest) {
        self.request.lock(|cell| cell.set(request));
    }
}

/// [`IndicatorPort`] handle used by the control loop.
pub struct StatusLed<'a> {
    shared: &'a LedShared,
}

impl<'a> StatusLed<'a> {
    pub fn new(shared: &'a LedShared) -> Self {
        Self { shared }
    }
}

impl IndicatorPort for StatusLed<'_> {
    fn indicate(&mut self, indicator: Indicator, enabled: bool) {
        let request = LedRequest { indicator, enabled };
        if self.shared.snapshot() != request {
            debug!("Status LED: {:?} (enabled={})", indicator, enabled);
            self.shared.set(request);
        }
    }
}

/// Drives the LED pin from the shared request.
pub struct LedDriver<'a, P> {
    shared: &'a LedShared,
    led: P,
    engine: LedPatternEngine,
    output: Option<bool>,
}

impl<'a, P: OutputPin> LedDriver<'a, P> {
    pub fn new(shared: &'a LedShared, led: P) -> Self {
        Self {
            shared,
            led,
            engine: LedPatternEngine::new(),
            output: None,
        }
    }

    /// Advance the pattern by `delta_ms` and write the pin if the level
    /// changed.  Returns the LED level.
    pub fn step(&mut self, delta_ms: u32) -> Result<bool, P::Error> {
        let request = self.shared.snapshot();
        self.engine.set(request.indicator, request.enabled);
        let on = self.engine.tick(delta_ms);
        if self.output != Some(on) {
            if on {
                self.led.set_high()?;
            } else {
                self.led.set_low()?;
            }
            self.output = Some(on);
        }
        Ok(on)
    }
}

/// Run the LED driver on its own thread, ticking every [`LED_TICK`].
pub fn spawn_led_driver<P>(
    shared: &'static LedShared,
    led: P,
) -> crate::Result<std::thread::JoinHandle<()>>
where
    P: OutputPin + Send + 'static,
{
    LED_TASK.spawn(move || {
        let mut driver = LedDriver::new(shared, led);
        let tick_ms = LED_TICK.as_millis() as u32;
        if let Err(e) = driver.step(0) {
            warn!("Status LED: init write failed: {:?}", e);
        }
        loop {
            std::thread::sleep(LED_TICK);
            if let Err(e) = driver.step(tick_ms) {
                warn!("Status LED: write failed: {:?}", e);
            }
        }
    })
}
