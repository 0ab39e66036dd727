//! Per-channel sample table
//!
//! The converter tags every result with the channel that produced it, so
//! results arriving round-robin can be sorted into one slot per input.
//! The two leading bits of a result word are don't-care and are ignored.

use quadsense_core::{Channel, Conversion};

/// Errors reading a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError {
    /// No conversion has arrived for this channel yet
    NotSampled,
}

/// ADC reading trait for platform abstraction
pub trait AdcReader {
    /// Read the latest sample (12-bit, 0-4095)
    fn read(&mut self) -> Result<u16, SampleError>;
}

/// Latest 12-bit sample of each input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelTable {
    samples: [Option<u16>; 4],
    /// Results that arrived with the don't-care bits set
    flagged: u32,
}

impl ChannelTable {
    pub const fn new() -> Self {
        Self {
            samples: [None; 4],
            flagged: 0,
        }
    }

    /// Store a conversion in its channel's slot, returning the channel
    pub fn record(&mut self, conversion: Conversion) -> Channel {
        if !conversion.reserved_clear() {
            self.flagged += 1;
            #[cfg(feature = "defmt")]
            defmt::trace!("conversion {=u16:#x} has leading bits set", conversion.raw());
        }
        let channel = conversion.channel();
        self.samples[channel.id() as usize] = Some(conversion.value());
        channel
    }

    /// Latest sample of a channel
    pub fn sample(&self, channel: Channel) -> Option<u16> {
        self.samples[channel.id() as usize]
    }

    /// Count of results that arrived with the don't-care bits set
    pub fn flagged(&self) -> u32 {
        self.flagged
    }

    /// Forget every sample
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Reader for one channel
    pub fn reader(&self, channel: Channel) -> ChannelReader<'_> {
        ChannelReader {
            table: self,
            channel,
        }
    }
}

/// One channel of a [`ChannelTable`] as an [`AdcReader`]
pub struct ChannelReader<'a> {
    table: &'a ChannelTable,
    channel: Channel,
}

impl ChannelReader<'_> {
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

impl AdcReader for ChannelReader<'_> {
    fn read(&mut self) -> Result<u16, SampleError> {
        self.table
            .sample(self.channel)
            .ok_or(SampleError::NotSampled)
    }
}
