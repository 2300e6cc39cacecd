//! Application core: pure domain logic, no direct I/O.
//!
//! This module holds the watering service: per-cycle sampling, the pump
//! decision, notifications, telemetry snapshots and command handling.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
