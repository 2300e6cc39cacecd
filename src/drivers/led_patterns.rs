//! Status LED blink patterns with priority-based selection.
//!
//! The control loop picks one [`Indicator`] per cycle; the LED driver
//! thread calls [`LedPatternEngine::tick`] at a fixed rate and writes the
//! returned level to the pin.
//!
//! ## Priority hierarchy (highest first)
//!
//! | Indicator | Pattern                                   |
//! |-----------|-------------------------------------------|
//! | Leak      | 100 ms flashes, 100 ms apart              |
//! | LevelLow  | two 100 ms flashes, then 1 s dark         |
//! | Watering  | 500 ms on, 500 ms off                     |
//! | Idle      | dark                                      |

/// What the status LED is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Indicator {
    Leak,
    LevelLow,
    Watering,
    #[default]
    Idle,
}

impl Indicator {
    /// Highest-priority indicator for the current controller state.
    pub const fn select(leak: bool, level_low: bool, pump_running: bool) -> Self {
        if leak {
            Self::Leak
        } else if level_low {
            Self::LevelLow
        } else if pump_running {
            Self::Watering
        } else {
            Self::Idle
        }
    }

    pub const fn pattern(self) -> Option<BlinkPattern> {
        match self {
            Self::Leak => Some(BlinkPattern::new(1, 100, 100)),
            Self::LevelLow => Some(BlinkPattern::new(2, 100, 1000)),
            Self::Watering => Some(BlinkPattern::new(1, 500, 500)),
            Self::Idle => None,
        }
    }
}

/// `flashes` pulses of `on_ms`, separated by `on_ms` dark, then
/// `pause_ms` dark before the group repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub flashes: u8,
    pub on_ms: u32,
    pub pause_ms: u32,
}

impl BlinkPattern {
    pub const fn new(flashes: u8, on_ms: u32, pause_ms: u32) -> Self {
        Self {
            flashes,
            on_ms,
            pause_ms,
        }
    }

    const fn burst_ms(&self) -> u32 {
        if self.flashes == 0 {
            return 0;
        }
        (2 * self.flashes as u32 - 1) * self.on_ms
    }

    pub const fn period_ms(&self) -> u32 {
        self.burst_ms() + self.pause_ms
    }

    /// LED level `phase_ms` into the pattern.
    pub const fn is_on(&self, phase_ms: u32) -> bool {
        let period = self.period_ms();
        if period == 0 || self.on_ms == 0 {
            return false;
        }
        let t = phase_ms % period;
        t < self.burst_ms() && (t / self.on_ms) % 2 == 0
    }
}

/// LED pattern engine.  Stack-allocated, no heap.
pub struct LedPatternEngine {
    phase_ms: u32,
    active: Option<Indicator>,
    request: Indicator,
    enabled: bool,
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedPatternEngine {
    pub const fn new() -> Self {
        Self {
            phase_ms: 0,
            active: None,
            request: Indicator::Idle,
            enabled: true,
        }
    }

    /// Request an indicator.  `enabled == false` keeps the LED dark
    /// without forgetting the request.
    pub fn set(&mut self, indicator: Indicator, enabled: bool) {
        self.request = indicator;
        self.enabled = enabled;
    }

    /// Advance the pattern phase and return the LED level.
    /// `delta_ms` is the time since the previous call.
    pub fn tick(&mut self, delta_ms: u32) -> bool {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);
        // A new indicator starts from the top of its pattern.
        if self.active != Some(self.request) {
            self.phase_ms = 0;
        }
        self.active = Some(self.request);

        if !self.enabled {
            return false;
        }
        self.request
            .pattern()
            .is_some_and(|p| p.is_on(self.phase_ms))
    }

    pub fn indicator(&self) -> Indicator {
        self.request
    }
}
