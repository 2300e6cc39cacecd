//! System clock adapter.
//!
//! Implements [`ClockPort`] for the watering core.
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`
//!   (microsecond precision); local time from `gettimeofday()` +
//!   `localtime_r()`, so the TZ set by SNTP provisioning applies.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for monotonic
//!   time; local time only when a UTC offset was configured.

use crate::app::ports::ClockPort;
use crate::clock::{LocalTime, Timestamp};

/// Wall-clock readings before this instant (2020-01-01) mean "not yet
/// synchronised".
const EPOCH_2020: i64 = 1_577_836_800;

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    utc_offset_secs: Option<i32>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            utc_offset_secs: None,
        }
    }

    /// Report local time from the host clock at a fixed UTC offset.
    #[cfg(not(target_os = "espidf"))]
    pub fn with_utc_offset(mut self, offset_secs: i32) -> Self {
        self.utc_offset_secs = Some(offset_secs);
        self
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer is started by the IDF before app_main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.uptime_us() / 1_000_000)
    }

    fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }

    #[cfg(target_os = "espidf")]
    fn local_time(&self) -> Option<LocalTime> {
        use core::ptr;
        use esp_idf_svc::sys;

        let mut tv = sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: both pointers are valid for the duration of the call.
        if unsafe { sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        if i64::from(tv.tv_sec) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as sys::time_t;
        // SAFETY: `tm` is plain data; localtime_r fully initialises it on
        // success and we bail out on failure.
        let mut tm: sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        LocalTime::from_civil(
            tm.tm_year + 1900,
            (tm.tm_mon + 1) as u8,
            tm.tm_mday as u8,
            tm.tm_hour as u8,
            tm.tm_min as u8,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn local_time(&self) -> Option<LocalTime> {
        let offset = self.utc_offset_secs?;
        let unix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs() as i64;
        (unix >= EPOCH_2020).then(|| LocalTime::from_unix(unix, offset))
    }
}
