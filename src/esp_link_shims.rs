//! Runtime symbol providers for third-party crates.
//!
//! - `embassy-time-driver`: `_embassy_time_now` / `_embassy_time_schedule_wake`
//!   back the `async_io_mini::Timer` that bounds [`ControlSignals::wait_any`].
//!   Ticks are microseconds (the driver's default 1 MHz tick rate).
//! - `critical-section` (target only): the `embassy-sync` mutexes guarding
//!   the signal, command queue and pump session.  Host builds take the
//!   `std` implementation from the `critical-section` crate instead.
//!
//! [`ControlSignals::wait_any`]: crate::events::ControlSignals::wait_any

use core::task::Waker;
use core::time::Duration;

use log::warn;

#[cfg(target_os = "espidf")]
fn now_us() -> u64 {
    // SAFETY: esp_timer is started by the IDF runtime before `main`.
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

#[cfg(not(target_os = "espidf"))]
fn now_us() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_micros() as u64
}

#[unsafe(no_mangle)]
fn _embassy_time_now() -> u64 {
    now_us()
}

/// One sleeper thread per registered deadline.  The control loop holds at
/// most one pending timer per cycle wait.
#[unsafe(no_mangle)]
fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
    let sleeper = waker.clone();
    let spawned = std::thread::Builder::new()
        .name("time-wake".into())
        .stack_size(4 * 1024)
        .spawn(move || {
            let now = now_us();
            if at > now {
                std::thread::sleep(Duration::from_micros(at - now));
            }
            sleeper.wake();
        });
    if let Err(e) = spawned {
        // An early wake only makes the timer re-check and re-register.
        warn!("Timer wake thread failed: {}", e);
        waker.wake_by_ref();
    }
}

#[cfg(target_os = "espidf")]
mod critical {
    use core::cell::{Cell, RefCell};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use critical_section::RawRestoreState;

    static LOCK: Mutex<()> = Mutex::new(());

    thread_local! {
        static DEPTH: Cell<u8> = const { Cell::new(0) };
        static GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
    }

    /// Re-entrant, task-level critical section over a FreeRTOS-backed
    /// pthread mutex.  ISR producers only touch atomics and never enter it.
    struct TaskCriticalSection;
    critical_section::set_impl!(TaskCriticalSection);

    unsafe impl critical_section::Impl for TaskCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            DEPTH.with(|depth| {
                if depth.get() == 0 {
                    let lock = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
                    GUARD.with(|g| *g.borrow_mut() = Some(lock));
                }
                depth.set(depth.get().saturating_add(1));
            });
            RawRestoreState::default()
        }

        unsafe fn release(_state: RawRestoreState) {
            DEPTH.with(|depth| {
                let d = depth.get();
                if d == 0 {
                    return;
                }
                depth.set(d - 1);
                if d == 1 {
                    GUARD.with(|g| *g.borrow_mut() = None);
                }
            });
        }
    }
}
