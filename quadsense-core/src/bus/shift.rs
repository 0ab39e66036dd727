//! Shift register and bit counter
//!
//! One 16-bit register serves both directions. Writes load the whole
//! `{address, mode, config}` frame once and rotate it left, so the byte
//! after the address is already in place when the data phase starts.
//! Reads shift each sampled bit in at the least-significant end.

/// 16-bit shift register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShiftBuffer(u16);

impl ShiftBuffer {
    /// Load a full 16-bit frame
    pub const fn load(value: u16) -> Self {
        Self(value)
    }

    /// Current register contents
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Bit currently presented on the data line while transmitting
    pub const fn msb(self) -> bool {
        self.0 & 0x8000 != 0
    }

    /// Advance one transmitted bit
    pub const fn rotate(self) -> Self {
        Self(self.0.rotate_left(1))
    }

    /// Accept one received bit
    pub const fn shift_in(self, bit: bool) -> Self {
        Self((self.0 << 1) | bit as u16)
    }
}

/// 3-bit counter over one 8-bit phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitCounter(u8);

impl BitCounter {
    /// Terminal count
    pub const MAX: u8 = 7;

    pub const fn new() -> Self {
        Self(0)
    }

    /// Bits already completed in the current phase
    pub const fn count(self) -> u8 {
        self.0
    }

    /// The bit in progress is the last of the phase
    pub const fn is_complete(self) -> bool {
        self.0 == Self::MAX
    }

    /// Count one bit, wrapping to zero after the terminal count
    pub const fn increment(self) -> Self {
        Self((self.0 + 1) & Self::MAX)
    }
}
