//! Unified error types for the watering controller.
//!
//! Per-cycle failures never reach this type: the control loop absorbs them
//! into safe decision defaults.  `Error` exists for the paths that can
//! actually fail the subsystem: startup, parameter persistence and the
//! remote command surface.  All variants are `Copy`.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible subsystem operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A digital input could not be read.
    Input(InputError),
    /// Configuration is invalid or could not be loaded/stored.
    Config(ConfigError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// The command queue towards the control loop is full.
    CommandQueueFull,
    /// Peripheral or task initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::CommandQueueFull => write!(f, "command queue full"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

/// Failure reading a digital input (leak probe, level switch).
///
/// The control loop treats a failed read as "unchanged since the last
/// confirmed state"; it is never interpreted as an instantaneous `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// GPIO read returned an error.
    GpioReadFailed,
    /// Driving the probe activator failed.
    ActivatorFailed,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::ActivatorFailed => write!(f, "probe activator failed"),
        }
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
