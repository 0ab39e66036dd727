//! Configuration type definitions

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::Divider;
use crate::registers::{address, ChannelMask, MAX_ADDRESS};

/// Standard-mode bus frequency
pub const STANDARD_MODE_HZ: u32 = 100_000;

/// Fast-mode bus frequency, the supported ceiling
pub const FAST_MODE_HZ: u32 = 400_000;

/// Default reference clock (50 MHz board oscillator)
pub const DEFAULT_REFERENCE_HZ: u32 = 50_000_000;

/// Errors detected while validating or loading a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Bus frequency outside 1 Hz ..= 400 kHz
    BusFrequencyOutOfRange,
    /// Fewer than four reference ticks per bus clock period
    ReferenceClockTooSlow,
    /// Peripheral address wider than 7 bits
    InvalidAddress,
    /// Channel mask uses bits above the four channels
    InvalidChannelMask,
    /// Cadence of zero, or faster than the reference clock
    InvalidCadence,
    /// Stored configuration blob could not be decoded or encoded
    Encoding,
    /// Configuration text could not be parsed
    Parse,
}

/// Bus timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Reference clock frequency in Hz (one driver tick per cycle)
    pub reference_clock_hz: u32,
    /// Bus clock frequency in Hz
    pub bus_frequency_hz: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::FAST
    }
}

impl BusConfig {
    /// Standard mode (100 kHz) from the default reference
    pub const STANDARD: Self = Self {
        reference_clock_hz: DEFAULT_REFERENCE_HZ,
        bus_frequency_hz: STANDARD_MODE_HZ,
    };

    /// Fast mode (400 kHz) from the default reference
    pub const FAST: Self = Self {
        reference_clock_hz: DEFAULT_REFERENCE_HZ,
        bus_frequency_hz: FAST_MODE_HZ,
    };

    /// Same bus frequency from a different reference clock
    pub const fn with_reference(self, reference_clock_hz: u32) -> Self {
        Self {
            reference_clock_hz,
            ..self
        }
    }

    /// Validate and build the clock divider
    pub fn divider(&self) -> Result<Divider, ConfigError> {
        if self.bus_frequency_hz == 0 || self.bus_frequency_hz > FAST_MODE_HZ {
            return Err(ConfigError::BusFrequencyOutOfRange);
        }
        Divider::new(self.reference_clock_hz, self.bus_frequency_hz)
    }
}

/// Which cycle sequencer variant drives the bus engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SequencerMode {
    /// Caller inputs go straight to the engine, first operation forced to
    /// a configuration write
    PassThrough,
    /// One configuration write, then a read every cadence period
    #[default]
    Autonomous,
}

/// Cycle sequencer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SequencerConfig {
    /// Sequencer variant
    pub mode: SequencerMode,
    /// Read requests per second in autonomous mode
    pub cadence_hz: u32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            mode: SequencerMode::Autonomous,
            cadence_hz: 1,
        }
    }
}

impl SequencerConfig {
    /// Pass-through sequencing
    pub const PASS_THROUGH: Self = Self {
        mode: SequencerMode::PassThrough,
        cadence_hz: 1,
    };

    /// Autonomous sequencing at the given read rate
    pub const fn autonomous(cadence_hz: u32) -> Self {
        Self {
            mode: SequencerMode::Autonomous,
            cadence_hz,
        }
    }

    /// Cadence period in reference ticks
    pub fn cadence_ticks(&self, reference_clock_hz: u32) -> Result<u32, ConfigError> {
        if self.cadence_hz == 0 || self.cadence_hz > reference_clock_hz {
            return Err(ConfigError::InvalidCadence);
        }
        Ok(reference_clock_hz / self.cadence_hz)
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverConfig {
    /// Bus timing
    pub bus: BusConfig,
    /// 7-bit peripheral address
    pub address: u8,
    /// Channels included in round-robin conversion
    pub channels: ChannelMask,
    /// Cycle sequencing
    #[cfg_attr(feature = "serde", serde(default))]
    pub sequencer: SequencerConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::FAST,
            address: address::AD7991_0,
            channels: ChannelMask(0x01),
            sequencer: SequencerConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Check every field, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bus.divider()?;
        if self.address > MAX_ADDRESS {
            return Err(ConfigError::InvalidAddress);
        }
        if !self.channels.is_valid() {
            return Err(ConfigError::InvalidChannelMask);
        }
        if self.sequencer.mode == SequencerMode::Autonomous {
            self.sequencer.cadence_ticks(self.bus.reference_clock_hz)?;
        }
        Ok(())
    }

    /// Configuration register value for the selected channels
    pub const fn config_byte(&self) -> u8 {
        self.channels.config_byte()
    }

    /// Caller inputs matching this configuration, engine disabled
    pub const fn host_inputs(&self) -> crate::driver::HostInputs {
        crate::driver::HostInputs {
            enable: false,
            mode: crate::bus::Mode::Write,
            address: self.address,
            config: self.config_byte(),
            last_read: true,
        }
    }
}
