//! Hub loop timing statistics.
//!
//! Updated once per tick under the hub lock. O(1), no allocation.

/// Width of the window the loop rate is measured over [s].
pub const RATE_WINDOW_S: f64 = 0.5;

/// Timing statistics of the hub loop since the last `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Ticks that finished after their deadline.
    pub missed_deadlines: u64,
    /// Last tick duration [ns].
    pub last_tick_ns: u64,
    /// Minimum tick duration [ns].
    pub min_tick_ns: u64,
    /// Maximum tick duration [ns].
    pub max_tick_ns: u64,
    /// Running sum for average computation.
    pub sum_tick_ns: u64,
    /// Measured tick rate over the last full window [Hz].
    pub loop_rate: f64,
    window_start: f64,
    window_ticks: u64,
}

impl LoopStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            missed_deadlines: 0,
            last_tick_ns: 0,
            min_tick_ns: u64::MAX,
            max_tick_ns: 0,
            sum_tick_ns: 0,
            loop_rate: 0.0,
            window_start: 0.0,
            window_ticks: 0,
        }
    }

    /// Record one tick that started at loop time `t` [s] and took
    /// `duration_ns`.
    #[inline]
    pub fn record(&mut self, t: f64, duration_ns: u64, missed: bool) {
        self.ticks += 1;
        self.last_tick_ns = duration_ns;
        self.min_tick_ns = self.min_tick_ns.min(duration_ns);
        self.max_tick_ns = self.max_tick_ns.max(duration_ns);
        self.sum_tick_ns = self.sum_tick_ns.saturating_add(duration_ns);
        if missed {
            self.missed_deadlines += 1;
        }

        if self.window_ticks == 0 {
            self.window_start = t;
        }
        self.window_ticks += 1;
        let span = t - self.window_start;
        if span >= RATE_WINDOW_S {
            self.loop_rate = (self.window_ticks - 1) as f64 / span;
            self.window_start = t;
            self.window_ticks = 1;
        }
    }

    /// Fraction of ticks that missed their deadline.
    pub fn miss_rate(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.missed_deadlines as f64 / self.ticks as f64
        }
    }

    /// Average tick duration [ns] (returns 0 if no ticks).
    #[inline]
    pub fn avg_tick_ns(&self) -> u64 {
        if self.ticks == 0 {
            0
        } else {
            self.sum_tick_ns / self.ticks
        }
    }
}

impl Default for LoopStats {
    fn default() -> Self {
        Self::new()
    }
}
