//! Fuzz target: packed `HHMMhhmm` schedule window
//!
//! cargo fuzz run fuzz_schedule_window

#![no_main]

use libfuzzer_sys::fuzz_target;
use watering::clock::TimeOfDay;
use watering::control::ScheduleWindow;

fuzz_target!(|input: (u32, u16)| {
    let (packed, minute) = input;
    let Ok(window) = ScheduleWindow::from_packed(packed) else {
        return;
    };
    let Some(t) = TimeOfDay::from_minutes(minute % 1440) else {
        return;
    };
    let _ = window.contains(t);
});
