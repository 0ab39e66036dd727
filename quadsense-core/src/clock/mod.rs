//! Bus clock generator
//!
//! Divides the reference clock down to the bus clock by counting ticks.
//! Each bus clock period of `divisor` reference ticks produces three
//! one-tick pulses:
//!
//! ```text
//! count:   0 ........ q ........ d-q ........ d-1
//!                     │           │            │
//!                     quarter     three_quarter tick
//! SCL:     ____________‾‾‾‾‾‾‾‾‾‾‾‾____________
//! ```
//!
//! where `d = divisor` and `q = divisor / 4` (truncating). `quarter` releases
//! the clock line and marks the sampling instant, `three_quarter` pulls the
//! clock line low, and `tick` is the period boundary on which the bus
//! engine changes state.
//!
//! When `divisor` is not a multiple of 4 the truncation makes the high
//! phase `d - 2q` ticks and the low phase `2q` ticks, so the duty cycle is
//! not exactly 50%. The skew is at most 3 reference ticks per period and is
//! kept as is.

use crate::config::ConfigError;

/// Smallest divisor that keeps the three pulses on distinct ticks
/// from the period boundary.
pub const MIN_DIVISOR: u32 = 4;

/// Reference-to-bus clock divider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Divider {
    divisor: u32,
    exact: bool,
}

impl Divider {
    /// Create a divider from the reference and bus frequencies
    ///
    /// The divisor is `reference_hz / bus_hz` rounded to the nearest
    /// integer. A divide that leaves a remainder is accepted and reported
    /// by [`Divider::is_exact`].
    pub fn new(reference_hz: u32, bus_hz: u32) -> Result<Self, ConfigError> {
        if bus_hz == 0 {
            return Err(ConfigError::BusFrequencyOutOfRange);
        }
        let divisor = ((reference_hz as u64 + bus_hz as u64 / 2) / bus_hz as u64) as u32;
        if divisor < MIN_DIVISOR {
            return Err(ConfigError::ReferenceClockTooSlow);
        }
        let exact = reference_hz % bus_hz == 0;
        if !exact {
            warn!(
                "bus clock {} Hz does not divide reference {} Hz, using divisor {}",
                bus_hz,
                reference_hz,
                divisor
            );
        }
        Ok(Self { divisor, exact })
    }

    /// Create a divider directly from a tick count
    pub const fn from_divisor(divisor: u32) -> Result<Self, ConfigError> {
        if divisor < MIN_DIVISOR {
            return Err(ConfigError::ReferenceClockTooSlow);
        }
        Ok(Self {
            divisor,
            exact: true,
        })
    }

    /// Reference ticks per bus clock period
    pub const fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Whether the reference clock divided evenly
    pub const fn is_exact(&self) -> bool {
        self.exact
    }

    /// Count at which the quarter pulse fires
    pub const fn quarter(&self) -> u32 {
        self.divisor / 4
    }

    /// Count at which the three-quarter pulse fires
    pub const fn three_quarter(&self) -> u32 {
        self.divisor - self.divisor / 4
    }

    /// Reference ticks per period with the clock line released
    pub const fn high_ticks(&self) -> u32 {
        self.three_quarter() - self.quarter()
    }

    /// Reference ticks per period with the clock line pulled low
    pub const fn low_ticks(&self) -> u32 {
        self.divisor - self.high_ticks()
    }
}

/// Timing pulses for the current reference tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusPulses {
    /// Bus clock period boundary
    pub tick: bool,
    /// Release the clock line, sample the data line
    pub quarter: bool,
    /// Pull the clock line low
    pub three_quarter: bool,
}

/// Free-running tick counter driving the bus clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockGenerator {
    divider: Divider,
    count: u32,
}

impl ClockGenerator {
    /// Create a generator at count zero
    pub const fn new(divider: Divider) -> Self {
        Self { divider, count: 0 }
    }

    /// Return to count zero
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub const fn divider(&self) -> &Divider {
        &self.divider
    }

    /// Current position within the bus clock period
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Pulses asserted at the current count
    pub const fn pulses(&self) -> BusPulses {
        BusPulses {
            tick: self.count == self.divider.divisor - 1,
            quarter: self.count == self.divider.quarter(),
            three_quarter: self.count == self.divider.three_quarter(),
        }
    }

    /// Snapshot after one reference tick
    pub const fn next(&self) -> Self {
        let count = if self.count >= self.divider.divisor - 1 {
            0
        } else {
            self.count + 1
        };
        Self {
            divider: self.divider,
            count,
        }
    }
}
