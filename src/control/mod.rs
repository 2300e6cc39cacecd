//! Pump control logic: hysteresis, schedule window, duration guard, the
//! decision engine that composes them and the run-time counters.

pub mod decision;
pub mod duration;
pub mod hysteresis;
pub mod run_time;
pub mod window;

pub use decision::{DecisionInputs, DecisionReason, PumpDecision, PumpRuntimeState, decide};
pub use run_time::RunTimeCounters;
pub use window::ScheduleWindow;
