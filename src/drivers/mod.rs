//! Pump relay driver, status LED, tick source, hardware initialisation
//! and task spawning helpers.

pub mod hw_init;
pub mod hw_timer;
pub mod led_patterns;
pub mod pump;
pub mod status_led;
pub mod task_pin;
