//! Overflow/leak probes with asymmetric debounce.
//!
//! A leak is confirmed on the first sample that reports it: missing a
//! real overflow is worse than a false alarm.  Clearing takes
//! `leak_debounce_count` consecutive clean samples, and any leak sample
//! in between restarts the count.
//!
//! ```text
//!   raw:        0 0 1 0 0 1 0 0 0 … 0
//!   confirmed:  0 0 1 1 1 1 1 1 1 … 1 0
//!   pending:    0 0 0 1 2 0 1 2 3 … N-1 ▲ N reached → BecameFalse
//! ```

use heapless::Vec;
use log::{info, warn};

use crate::config::LEAK_CHANNELS;
use crate::error::InputError;

/// Confirmed-state change reported by a debounced input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameTrue,
    BecameFalse,
}

/// One debounced leak probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakChannel {
    /// 1-based channel number as printed on the board.
    id: u8,
    enabled: bool,
    confirmed: bool,
    pending_clear_count: u32,
}

impl LeakChannel {
    pub const fn new(id: u8) -> Self {
        Self {
            id,
            enabled: true,
            confirmed: false,
            pending_clear_count: 0,
        }
    }

    pub const fn id(&self) -> u8 {
        self.id
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Debounced leak state.
    pub const fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub const fn pending_clear_count(&self) -> u32 {
        self.pending_clear_count
    }

    /// Enable or disable the probe.  Disabling drops any confirmed leak
    /// so a later re-enable starts from a clean state.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(
                "Leak #{}: probe {}",
                self.id,
                if enabled { "enabled" } else { "disabled" }
            );
            self.enabled = enabled;
            if !enabled {
                self.confirmed = false;
                self.pending_clear_count = 0;
            }
        }
    }

    /// Feed one raw sample.  A `debounce_count` of 0 behaves as 1.
    pub fn update(&mut self, raw_sample: bool, debounce_count: u32) -> Option<Transition> {
        if raw_sample {
            self.pending_clear_count = 0;
            if !self.confirmed {
                self.confirmed = true;
                return Some(Transition::BecameTrue);
            }
            return None;
        }

        if self.confirmed {
            self.pending_clear_count += 1;
            if self.pending_clear_count >= debounce_count.max(1) {
                self.confirmed = false;
                self.pending_clear_count = 0;
                return Some(Transition::BecameFalse);
            }
        }
        None
    }
}

/// A confirmed-state change on a specific channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakEvent {
    pub channel: u8,
    pub transition: Transition,
}

/// The board's three leak probes and their aggregate.
#[derive(Debug, Clone)]
pub struct LeakMonitor {
    channels: [LeakChannel; LEAK_CHANNELS],
}

impl Default for LeakMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LeakMonitor {
    pub fn new() -> Self {
        Self {
            channels: [LeakChannel::new(1), LeakChannel::new(2), LeakChannel::new(3)],
        }
    }

    /// Sample every enabled channel once.
    ///
    /// `read(index)` is called only for enabled channels, with a 0-based
    /// index.  A failed read leaves that channel's state untouched.
    pub fn sample(
        &mut self,
        enabled: [bool; LEAK_CHANNELS],
        debounce_count: u32,
        mut read: impl FnMut(usize) -> Result<bool, InputError>,
    ) -> Vec<LeakEvent, LEAK_CHANNELS> {
        let mut events = Vec::new();
        for (idx, channel) in self.channels.iter_mut().enumerate() {
            channel.set_enabled(enabled[idx]);
            if !channel.is_enabled() {
                continue;
            }
            match read(idx) {
                Ok(raw) => {
                    if let Some(transition) = channel.update(raw, debounce_count) {
                        // Capacity equals channel count, so push cannot fail.
                        let _ = events.push(LeakEvent {
                            channel: channel.id(),
                            transition,
                        });
                    }
                }
                Err(e) => {
                    warn!("Leak #{}: read failed ({}), keeping previous state", channel.id(), e);
                }
            }
        }
        events
    }

    /// Logical OR of the enabled channels' confirmed state.
    pub fn any_leak(&self) -> bool {
        self.channels
            .iter()
            .any(|c| c.is_enabled() && c.is_confirmed())
    }

    pub fn channel(&self, index: usize) -> Option<&LeakChannel> {
        self.channels.get(index)
    }

    /// Per-channel confirmed flags, disabled channels reported as clear.
    pub fn states(&self) -> [bool; LEAK_CHANNELS] {
        self.channels.map(|c| c.is_enabled() && c.is_confirmed())
    }
}
