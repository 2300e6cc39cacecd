//! Watering controller firmware library.
//!
//! Exposes the pump decision core, its supporting state machines and the
//! control cycle scheduler for integration testing and host simulation.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod sensors;

mod esp_link_shims;
mod pins;

pub mod adapters;
pub mod drivers;

pub use error::{Error, Result};
