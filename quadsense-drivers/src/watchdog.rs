//! Conversion watchdog
//!
//! Counts reference ticks since the last conversion pulse while results are
//! expected. A peripheral that stops answering shows up as an expiry
//! instead of a silently stale sample.

use quadsense_core::{DriverConfig, SequencerMode};

/// Bus clock periods in the longest single-pair read, including the wait
/// for the next period boundary
pub const READ_PERIODS: u32 = 30;

/// Tick counter with a fixed budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConversionWatchdog {
    budget: u32,
    elapsed: u32,
    expired: bool,
}

impl ConversionWatchdog {
    /// Create a watchdog expiring after `budget` ticks without a conversion
    pub const fn new(budget: u32) -> Self {
        Self {
            budget,
            elapsed: 0,
            expired: false,
        }
    }

    /// Budget for a configuration
    ///
    /// One cadence period in autonomous mode plus one worst-case read.
    pub fn for_config(config: &DriverConfig, divisor: u32, cadence_ticks: u32) -> Self {
        let read = divisor.saturating_mul(READ_PERIODS);
        let budget = match config.sequencer.mode {
            SequencerMode::Autonomous => read.saturating_add(cadence_ticks),
            SequencerMode::PassThrough => read,
        };
        Self::new(budget)
    }

    pub const fn budget(&self) -> u32 {
        self.budget
    }

    /// Ticks since the last conversion or disarm
    pub const fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Check if the budget has run out since the last feed
    pub const fn is_expired(&self) -> bool {
        self.expired
    }

    /// A conversion arrived
    pub fn feed(&mut self) {
        self.elapsed = 0;
        self.expired = false;
    }

    /// Account for one tick
    ///
    /// While `armed` is false the count is held at zero. Returns true only
    /// on the tick the budget runs out, not on every tick after.
    pub fn tick(&mut self, armed: bool) -> bool {
        if !armed {
            self.feed();
            return false;
        }
        if self.expired {
            return false;
        }
        self.elapsed += 1;
        if self.elapsed >= self.budget {
            self.expired = true;
            return true;
        }
        false
    }
}
