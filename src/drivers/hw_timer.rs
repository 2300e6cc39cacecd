//! Periodic tick source for the control loop.
//!
//! Raises [`MINUTE_TICK`](crate::events::MINUTE_TICK) once per period
//! (one minute in production) so the loop re-evaluates the schedule
//! window close to every minute boundary.
//!
//! - **ESP-IDF**: an `esp_timer` periodic timer.  The callback runs in the
//!   esp_timer task (not ISR) and only sets an atomic bit.
//! - **Simulation**: a plain thread sleeping for the period.

use core::time::Duration;

use crate::error::{Error, Result};
use crate::events::ControlSignals;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Production tick period.
pub const MINUTE: Duration = Duration::from_secs(60);

/// A running tick source.  Stops when dropped.
pub struct MinuteTicker {
    #[cfg(target_os = "espidf")]
    handle: esp_timer_handle_t,
    #[cfg(not(target_os = "espidf"))]
    stop: std::sync::Arc<core::sync::atomic::AtomicBool>,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn minute_tick_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static ControlSignals` passed at creation.
    let signals = unsafe { &*(arg as *const ControlSignals) };
    signals.minute_tick();
}

impl MinuteTicker {
    /// Start ticking `signals` every `period`.
    #[cfg(target_os = "espidf")]
    pub fn start(signals: &'static ControlSignals, period: Duration) -> Result<Self> {
        let args = esp_timer_create_args_t {
            callback: Some(minute_tick_cb),
            arg: core::ptr::from_ref(signals).cast_mut().cast(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"minute".as_ptr(),
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: `args` is fully initialised and `signals` outlives the timer.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK as esp_err_t {
            log::error!("hw_timer: create failed (rc={})", ret);
            return Err(Error::Init("minute timer"));
        }
        // SAFETY: `handle` was just created.
        let ret = unsafe { esp_timer_start_periodic(handle, period.as_micros() as u64) };
        if ret != ESP_OK as esp_err_t {
            log::error!("hw_timer: start failed (rc={})", ret);
            unsafe { esp_timer_delete(handle) };
            return Err(Error::Init("minute timer"));
        }
        log::info!("hw_timer: tick every {}s", period.as_secs());
        Ok(Self { handle })
    }

    /// Start ticking `signals` every `period`.
    #[cfg(not(target_os = "espidf"))]
    pub fn start(signals: &'static ControlSignals, period: Duration) -> Result<Self> {
        use core::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("minute-tick".into())
            .spawn(move || {
                loop {
                    std::thread::sleep(period);
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    signals.minute_tick();
                }
            })
            .map_err(|_| Error::Init("minute timer"))?;
        log::info!("hw_timer(sim): tick every {}ms", period.as_millis());
        Ok(Self { stop })
    }
}

impl Drop for MinuteTicker {
    fn drop(&mut self) {
        #[cfg(target_os = "espidf")]
        // SAFETY: the handle is valid until deleted here.
        unsafe {
            esp_timer_stop(self.handle);
            esp_timer_delete(self.handle);
        }

        #[cfg(not(target_os = "espidf"))]
        self.stop
            .store(true, core::sync::atomic::Ordering::Release);
    }
}
