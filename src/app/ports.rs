//! Port traits: the hexagonal boundary between the decision core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WateringService / ControlLoop (domain)
//! ```
//!
//! Driven adapters (sensors, inputs, pump driver, status LED, notification
//! and telemetry sinks, storage, clock) implement these traits.  The
//! [`WateringService`](super::service::WateringService) and the
//! [`ControlLoop`](crate::scheduler::ControlLoop) consume them via
//! generics, so the core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **NotifyPort** and **TelemetryPort** are fire-and-forget: the core
//!   logs a failure and moves on, it never waits or retries.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::clock::{LocalTime, Timestamp};
use crate::config::WateringConfig;
use crate::control::PumpRuntimeState;
use crate::drivers::led_patterns::Indicator;
use crate::drivers::pump::DutyCycle;
use crate::error::InputError;
use crate::sensors::{SensorId, SensorReading};

use super::events::Notification;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Filtered analog sensor values, one read per logical sensor per cycle.
pub trait SensorPort {
    fn read(&mut self, id: SensorId) -> SensorReading;
}

// ───────────────────────────────────────────────────────────────
// Digital input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Level switch and leak probes.
pub trait DigitalInputPort {
    /// Current reservoir level; `true` = low.
    fn level_low(&mut self) -> Result<bool, InputError>;

    /// Sample leak probe `channel` (0-based); `true` = water detected.
    ///
    /// Implementations apply the probe settle delay before sampling.
    fn leak(&mut self, channel: usize) -> Result<bool, InputError>;
}

// ───────────────────────────────────────────────────────────────
// Pump port (driven adapter: domain → duty-cycle driver)
// ───────────────────────────────────────────────────────────────

/// The duty-cycle pump driver.
///
/// Owns physical output timing; the core only requests a logical state
/// and reads back the session record.
pub trait PumpPort {
    /// Update the relay duty cycle; applied from the next dwell onwards.
    fn configure(&mut self, cycle: DutyCycle);

    /// Request the logical pump state.
    fn set_desired(&mut self, run: bool);

    fn runtime_state(&self) -> PumpRuntimeState;

    fn is_running(&self) -> bool {
        self.runtime_state().running
    }

    fn last_on(&self) -> Option<Timestamp> {
        self.runtime_state().last_on
    }

    fn last_off(&self) -> Option<Timestamp> {
        self.runtime_state().last_off
    }
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → status LED)
// ───────────────────────────────────────────────────────────────

/// The watering status LED.
pub trait IndicatorPort {
    /// Show `indicator`.  `enabled == false` keeps the LED dark.
    fn indicate(&mut self, indicator: Indicator, enabled: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic seconds since boot.
    fn now(&self) -> Timestamp;

    /// Monotonic milliseconds since boot, for cycle timing.
    fn uptime_ms(&self) -> u64;

    /// Local wall-clock time; `None` until the clock is synchronised.
    fn local_time(&self) -> Option<LocalTime>;
}

// ───────────────────────────────────────────────────────────────
// Notification & telemetry ports (domain → outside world)
// ───────────────────────────────────────────────────────────────

/// Operator notifications (messenger, push, …).
pub trait NotifyPort {
    fn notify(&mut self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Periodic state snapshots on named topics.
pub trait TelemetryPort {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TelemetryError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists watering parameters.
///
/// Implementations MUST validate with [`WateringConfig::validate`] before
/// persisting.  Invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`WateringConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<WateringConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &WateringConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value blob storage.
///
/// Write operations MUST be atomic. No partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`, or
    /// [`StorageError::TooLarge`] when the value does not fit.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Blob could not be encoded or decoded.
    Codec,
    /// Stored value is larger than the caller's buffer.
    TooLarge,
}

/// Errors from [`NotifyPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// No delivery channel is currently connected.
    Unavailable,
    /// The outbound queue is full.
    QueueFull,
}

/// Errors from [`TelemetryPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// Broker not connected.
    NotConnected,
    /// Payload could not be serialised.
    Encode,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Codec => write!(f, "encode/decode failed"),
            Self::TooLarge => write!(f, "value larger than buffer"),
        }
    }
}

impl core::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "notification channel unavailable"),
            Self::QueueFull => write!(f, "notification queue full"),
        }
    }
}

impl core::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "telemetry broker not connected"),
            Self::Encode => write!(f, "telemetry payload encode failed"),
        }
    }
}
