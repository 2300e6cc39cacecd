//! Watering controller firmware: main entry point.
//!
//! Wires the adapters to the control loop and hands over to its thread.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Board (GpioInputs + BoardSensors + PumpControl + StatusLed)   │
//! │  LogSink (Notify+Telemetry)  NvsAdapter (Config+Storage)       │
//! │  SystemClock (ClockPort)                                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        WateringService (decision core, pure logic)     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ControlLoop thread · relay and LED threads · level ISR ·       │
//! │  minute ticker  ──▶  ControlSignals                            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result, anyhow};
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{InputPin, PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use watering::adapters::hardware::{Board, BoardSensors, GpioInputs};
use watering::adapters::log_sink::LogSink;
use watering::adapters::nvs::NvsAdapter;
use watering::adapters::time::SystemClock;
use watering::drivers::hw_init;
use watering::drivers::hw_timer::{MINUTE, MinuteTicker};
use watering::drivers::pump::{PumpControl, PumpShared, spawn_relay_driver};
use watering::drivers::status_led::{LedShared, StatusLed, spawn_led_driver};
use watering::events::ControlSignals;
use watering::scheduler::ControlLoop;
use watering::sensors::soil::SoilProbe;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Watering controller v{}          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Pins ───────────────────────────────────────────────
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let pins = peripherals.pins;

    let relay = PinDriver::output(pins.gpio13).context("pump relay")?;
    let activator = PinDriver::output(pins.gpio19).context("leak activator")?;
    let led = PinDriver::output(pins.gpio4).context("watering LED")?;

    let mut leaks = [
        PinDriver::input(pins.gpio33.downgrade_input()).context("leak #1")?,
        PinDriver::input(pins.gpio25.downgrade_input()).context("leak #2")?,
        PinDriver::input(pins.gpio26.downgrade_input()).context("leak #3")?,
    ];
    for pin in &mut leaks {
        pin.set_pull(Pull::Up).context("leak pull-up")?;
    }
    let mut level = PinDriver::input(pins.gpio27).context("level switch")?;
    level.set_pull(Pull::Up).context("level pull-up")?;

    // ── 3. Shared state ───────────────────────────────────────
    let signals: &'static ControlSignals = Box::leak(Box::new(ControlSignals::new()));
    let pump: &'static PumpShared = Box::leak(Box::new(PumpShared::new()));
    let status: &'static LedShared = Box::leak(Box::new(LedShared::new()));

    // ── 4. Peripherals the HAL drivers don't cover ────────────
    hw_init::init_adc().map_err(|e| anyhow!("{e}"))?;
    hw_init::init_level_isr(signals).map_err(|e| anyhow!("{e}"))?;

    // ── 5. Adapters ───────────────────────────────────────────
    let nvs = NvsAdapter::new().unwrap_or_else(|e| {
        warn!("NVS init failed ({}), running with defaults and no persistence", e);
        NvsAdapter::default()
    });
    let clock = SystemClock::new();

    spawn_relay_driver(pump, relay, clock).map_err(|e| anyhow!("relay driver: {e}"))?;
    spawn_led_driver(status, led).map_err(|e| anyhow!("status LED: {e}"))?;
    let _ticker = MinuteTicker::start(signals, MINUTE).map_err(|e| anyhow!("{e}"))?;

    let board = Board::new(
        BoardSensors::new(SoilProbe::default()),
        GpioInputs::new(level, leaks, activator, Ets),
        PumpControl::new(pump, clock),
        StatusLed::new(status),
    );

    // ── 6. Control loop ───────────────────────────────────────
    let control = ControlLoop::new(signals, board, clock, LogSink::new(), nvs)
        .spawn()
        .map_err(|e| anyhow!("control loop: {e}"))?;

    info!("System ready.");

    // The loop never returns; joining keeps `_ticker` alive.
    control
        .join()
        .map_err(|_| anyhow!("control loop panicked"))?;
    Ok(())
}
