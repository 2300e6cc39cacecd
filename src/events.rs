//! Cross-context signalling into the control loop.
//!
//! Flags are produced by:
//! - the level switch GPIO ISR (edge + current level)
//! - the once-per-minute timer callback
//! - the command dispatcher (queued command, suspend/resume requests)
//!
//! and consumed by the control loop, which is the only context that clears
//! them.  Setting a bit is a single atomic `fetch_or`, safe from ISR
//! context.
//!
//! ```text
//! ┌─────────────┐  set   ┌──────────────────────┐  wait_any / clear  ┌──────────────┐
//! │ Level ISR   │──────▶│                      │◀──────────────────│              │
//! │ Minute tick │──────▶│  ControlSignals      │                    │ Control loop │
//! │ Dispatcher  │──────▶│  flags + cmd queue   │──── commands ────▶│  (consumer)  │
//! └─────────────┘        └──────────────────────┘                    └──────────────┘
//! ```
//!
//! `LEVEL_LOW` is the one exception to "set then cleared by the loop": it
//! mirrors the level input and is written only by the level edge source.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use futures_lite::future;

use crate::app::commands::Command;
use crate::error::{Error, Result};

/// Level input changed since the loop last consumed it.
pub const LEVEL_CHANGED: u32 = 1 << 0;
/// Current level input is low (mirror, written by the edge source).
pub const LEVEL_LOW: u32 = 1 << 1;
/// Once-per-minute timer tick.
pub const MINUTE_TICK: u32 = 1 << 8;
/// At least one command is queued.
pub const COMMAND_PENDING: u32 = 1 << 9;
/// Suspend requested (e.g. firmware update starting).
pub const SUSPEND: u32 = 1 << 10;
/// Resume requested.
pub const RESUME: u32 = 1 << 11;

/// Events that cut the cycle wait short.
pub const WAKE_MASK: u32 = LEVEL_CHANGED | MINUTE_TICK | COMMAND_PENDING | SUSPEND;

/// Depth of the command queue.
pub const COMMAND_DEPTH: usize = 4;

/// Shared signalling state between producers and the control loop.
///
/// Created once at startup and handed out by reference; there is no
/// process-wide instance.
pub struct ControlSignals {
    flags: AtomicU32,
    wake: Signal<CriticalSectionRawMutex, ()>,
    commands: Channel<CriticalSectionRawMutex, Command, COMMAND_DEPTH>,
}

impl Default for ControlSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlSignals {
    pub const fn new() -> Self {
        Self {
            flags: AtomicU32::new(0),
            wake: Signal::new(),
            commands: Channel::new(),
        }
    }

    // ── Flag primitives ───────────────────────────────────────

    /// Set bits and wake the loop.  ISR-safe.
    pub fn set(&self, mask: u32) {
        self.flags.fetch_or(mask, Ordering::AcqRel);
        self.wake.signal(());
    }

    /// Clear bits.  Control loop only.
    pub fn clear(&self, mask: u32) {
        self.flags.fetch_and(!mask, Ordering::AcqRel);
    }

    pub fn get(&self) -> u32 {
        self.flags.load(Ordering::Acquire)
    }

    /// Block until any bit in `mask` is set or `timeout` elapses.
    ///
    /// Returns the masked bits at wake-up (0 on timeout).  Never clears.
    pub fn wait_any(&self, mask: u32, timeout: Duration) -> u32 {
        let pending = self.get() & mask;
        if pending != 0 || timeout.is_zero() {
            return pending;
        }

        // Reset before the re-check: a set() racing with us either shows
        // up in the re-check or leaves the signal raised.
        self.wake.reset();
        let pending = self.get() & mask;
        if pending != 0 {
            return pending;
        }

        future::block_on(future::or(
            async {
                loop {
                    self.wake.wait().await;
                    let pending = self.get() & mask;
                    if pending != 0 {
                        return pending;
                    }
                }
            },
            async {
                async_io_mini::Timer::after(timeout).await;
                self.get() & mask
            },
        ))
    }

    // ── Producers ─────────────────────────────────────────────

    /// Record a level switch edge.  ISR-safe.
    pub fn level_edge(&self, low: bool) {
        if low {
            self.flags.fetch_or(LEVEL_LOW, Ordering::AcqRel);
        } else {
            self.flags.fetch_and(!LEVEL_LOW, Ordering::AcqRel);
        }
        self.set(LEVEL_CHANGED);
    }

    /// Once-per-minute timer callback.
    pub fn minute_tick(&self) {
        self.set(MINUTE_TICK);
    }

    /// Queue a command for the next cycle.
    pub fn send_command(&self, cmd: Command) -> Result<()> {
        self.commands
            .try_send(cmd)
            .map_err(|_| Error::CommandQueueFull)?;
        self.set(COMMAND_PENDING);
        Ok(())
    }

    /// Ask the loop to park at the next cycle boundary.
    pub fn request_suspend(&self) {
        self.set(SUSPEND);
    }

    /// Release a parked loop.
    pub fn request_resume(&self) {
        self.set(RESUME);
    }

    // ── Consumer ──────────────────────────────────────────────

    /// Pop the next queued command.  Control loop only.
    pub fn try_take_command(&self) -> Option<Command> {
        if let Ok(cmd) = self.commands.try_receive() {
            return Some(cmd);
        }
        // Clear first: a command queued after this point either shows up
        // in the re-check or re-raises the flag.
        self.clear(COMMAND_PENDING);
        self.commands.try_receive().ok()
    }

    /// Drop a `RESUME` that arrived with no suspend outstanding.  Atomic
    /// with respect to `SUSPEND`, so a suspend/resume pair racing this call
    /// keeps its resume.  Control loop only.
    pub fn discard_stale_resume(&self) {
        let _ = self
            .flags
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |f| {
                (f & SUSPEND == 0 && f & RESUME != 0).then_some(f & !RESUME)
            });
    }
}
