//! Reservoir level monitor.
//!
//! The level switch is edge-triggered and debounced in hardware, so edges
//! are taken at face value.  Every edge produces a notification; a level
//! that stays low is re-announced once per notify period so it cannot be
//! forgotten after the first alert.

use log::info;

use crate::clock::Timestamp;

/// What the level monitor wants announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelNotice {
    Low,
    Restored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelMonitor {
    enabled: bool,
    low: bool,
    changed_at: Option<Timestamp>,
    last_notified_at: Option<Timestamp>,
}

impl Default for LevelMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelMonitor {
    pub const fn new() -> Self {
        Self {
            enabled: true,
            low: false,
            changed_at: None,
            last_notified_at: None,
        }
    }

    /// A disabled sensor reads as "level OK" and stays silent.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(
                "Level: sensor {}",
                if enabled { "enabled" } else { "disabled" }
            );
            self.enabled = enabled;
            self.low = false;
        }
    }

    /// Handle a level edge.
    pub fn on_edge(&mut self, new_level_low: bool, now: Timestamp) -> Option<LevelNotice> {
        if !self.enabled {
            self.low = false;
            return None;
        }
        self.low = new_level_low;
        self.changed_at = Some(now);
        self.last_notified_at = Some(now);
        info!("Level: {}", if new_level_low { "LOW" } else { "OK" });
        Some(if new_level_low {
            LevelNotice::Low
        } else {
            LevelNotice::Restored
        })
    }

    /// Periodic check without an edge: re-announce a persistent low level.
    pub fn poll(&mut self, now: Timestamp, notify_period_secs: u32) -> Option<LevelNotice> {
        if !self.enabled || !self.low {
            return None;
        }
        let due = self
            .last_notified_at
            .is_none_or(|at| now.saturating_since(at) >= u64::from(notify_period_secs));
        if due {
            self.last_notified_at = Some(now);
            Some(LevelNotice::Low)
        } else {
            None
        }
    }

    /// Re-seed from a fresh hardware read; only a real change is an edge.
    pub fn resync(&mut self, level_low: bool, now: Timestamp) -> Option<LevelNotice> {
        if self.enabled && level_low != self.low {
            self.on_edge(level_low, now)
        } else {
            None
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub const fn is_low(&self) -> bool {
        self.enabled && self.low
    }

    pub const fn level_ok(&self) -> bool {
        !self.is_low()
    }

    pub const fn changed_at(&self) -> Option<Timestamp> {
        self.changed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: u32 = 12 * 3600;

    fn at(secs: u64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    #[test]
    fn every_edge_notifies() {
        let mut m = LevelMonitor::new();
        assert_eq!(m.on_edge(true, at(10)), Some(LevelNotice::Low));
        assert!(!m.level_ok());
        assert_eq!(m.changed_at(), Some(at(10)));
        assert_eq!(m.on_edge(false, at(20)), Some(LevelNotice::Restored));
        assert!(m.level_ok());
        // A repeated edge with the same level still notifies.
        assert_eq!(m.on_edge(false, at(30)), Some(LevelNotice::Restored));
    }

    #[test]
    fn persistent_low_is_renotified_per_period() {
        let mut m = LevelMonitor::new();
        m.on_edge(true, at(0));
        assert_eq!(m.poll(at(100), PERIOD), None);
        assert_eq!(m.poll(at(u64::from(PERIOD) - 1), PERIOD), None);
        assert_eq!(m.poll(at(u64::from(PERIOD)), PERIOD), Some(LevelNotice::Low));
        assert_eq!(m.poll(at(u64::from(PERIOD) + 10), PERIOD), None);
        assert_eq!(m.poll(at(2 * u64::from(PERIOD)), PERIOD), Some(LevelNotice::Low));
    }

    #[test]
    fn ok_level_never_renotifies() {
        let mut m = LevelMonitor::new();
        m.on_edge(false, at(0));
        assert_eq!(m.poll(at(10 * u64::from(PERIOD)), PERIOD), None);
    }

    #[test]
    fn disabled_sensor_is_ok_and_silent() {
        let mut m = LevelMonitor::new();
        m.on_edge(true, at(0));
        m.set_enabled(false);
        assert!(m.level_ok());
        assert_eq!(m.on_edge(true, at(5)), None);
        assert!(m.level_ok());
        assert_eq!(m.poll(at(10 * u64::from(PERIOD)), PERIOD), None);
    }

    #[test]
    fn resync_only_reports_real_changes() {
        let mut m = LevelMonitor::new();
        assert_eq!(m.resync(false, at(0)), None);
        assert_eq!(m.resync(true, at(1)), Some(LevelNotice::Low));
        assert_eq!(m.resync(true, at(2)), None);
    }
}
