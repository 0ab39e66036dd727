//! Converter register layouts
//!
//! The converter exposes one write-only configuration register and a
//! read-only 16-bit conversion result per sample.
//!
//! Configuration byte:
//! ```text
//! ┌────┬────┬────┬────┬──────────────────────┐
//! │ 7  │ 6  │ 5  │ 4  │ 3..0                 │
//! │CH3 │CH2 │CH1 │CH0 │ 0 (default ref/filt) │
//! └────┴────┴────┴────┴──────────────────────┘
//! ```
//!
//! Conversion result:
//! ```text
//! ┌───────┬─────────┬──────────────────┐
//! │ 15..14│ 13..12  │ 11..0            │
//! │ 0     │ channel │ sample (MSB 11)  │
//! └───────┴─────────┴──────────────────┘
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Peripheral addresses of the converter family
pub mod address {
    /// Variant with address pin option 0 (`0101000b`)
    pub const AD7991_0: u8 = 0x28;
    /// Variant with address pin option 1 (`0101001b`)
    pub const AD7991_1: u8 = 0x29;
}

/// Largest valid 7-bit peripheral address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Full-scale 12-bit sample value
pub const SAMPLE_MAX: u16 = 0x0FFF;

/// Analog input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Channel {
    Vin0,
    Vin1,
    Vin2,
    Vin3,
}

impl Channel {
    /// All channels in round-robin order
    pub const ALL: [Channel; 4] = [Channel::Vin0, Channel::Vin1, Channel::Vin2, Channel::Vin3];

    /// Channel id as encoded in the conversion result
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Decode a 2-bit channel id
    pub const fn from_id(id: u8) -> Self {
        match id & 0x3 {
            0 => Channel::Vin0,
            1 => Channel::Vin1,
            2 => Channel::Vin2,
            _ => Channel::Vin3,
        }
    }
}

/// Set of channels included in round-robin conversion
///
/// Bit `n` selects channel `Vin<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelMask(pub u8);

impl ChannelMask {
    /// No channels
    pub const NONE: Self = Self(0);

    /// All four channels
    pub const ALL: Self = Self(0x0F);

    /// Mask with a single channel
    pub const fn only(channel: Channel) -> Self {
        Self(1 << channel.id())
    }

    /// Add a channel to the mask
    pub const fn with(self, channel: Channel) -> Self {
        Self(self.0 | (1 << channel.id()))
    }

    /// Check if a channel is included
    pub const fn contains(self, channel: Channel) -> bool {
        self.0 & (1 << channel.id()) != 0
    }

    /// Check that only the low four bits are used
    pub const fn is_valid(self) -> bool {
        self.0 & !0x0F == 0
    }

    /// Number of selected channels
    pub const fn count(self) -> u32 {
        (self.0 & 0x0F).count_ones()
    }

    /// Configuration register value selecting these channels
    ///
    /// Bits 3..0 stay zero for the default reference, filter and timing
    /// behavior.
    pub const fn config_byte(self) -> u8 {
        (self.0 & 0x0F) << 4
    }

    /// Recover the mask from a configuration register value
    pub const fn from_config_byte(byte: u8) -> Self {
        Self(byte >> 4)
    }
}

/// One 16-bit conversion result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Conversion(u16);

impl Conversion {
    /// Wrap a raw result word
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Assemble from the two bytes as they arrive on the bus
    pub const fn from_bytes(hi: u8, lo: u8) -> Self {
        Self(((hi as u16) << 8) | lo as u16)
    }

    /// Raw 16-bit word, reserved bits included
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Channel that produced this sample
    pub const fn channel(self) -> Channel {
        Channel::from_id((self.0 >> 12) as u8)
    }

    /// 12-bit sample magnitude
    pub const fn value(self) -> u16 {
        self.0 & SAMPLE_MAX
    }

    /// Check that the two reserved leading bits are zero
    pub const fn reserved_clear(self) -> bool {
        self.0 & 0xC000 == 0
    }

    /// Scale the sample to millivolts against a reference voltage
    pub fn millivolts(self, vref_mv: u16) -> u16 {
        ((self.value() as u32 * vref_mv as u32) / (SAMPLE_MAX as u32 + 1)) as u16
    }
}
