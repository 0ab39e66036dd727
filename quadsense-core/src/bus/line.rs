//! Open-drain bus wires
//!
//! Each side of the bus either pulls a wire low or releases it to the
//! external pull-up. A wire is never actively driven high.

/// What one device does to one wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Actively pulled low
    DrivenLow,
    /// High-impedance, the pull-up wins unless someone else pulls low
    #[default]
    Released,
}

/// Electrical level seen on a wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    #[default]
    High,
}

/// Acknowledge: receiver pulls the data line low
pub const ACK: Level = Level::Low;

/// No-acknowledge: receiver leaves the data line released
pub const NACK: Level = Level::High;

impl Line {
    /// Drive that transmits the given bit
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Line::Released
        } else {
            Line::DrivenLow
        }
    }

    /// Level of a wire with this drive and nobody else on it
    pub const fn level(self) -> Level {
        match self {
            Line::DrivenLow => Level::Low,
            Line::Released => Level::High,
        }
    }

    /// Wired-AND of two drivers: low if either pulls low
    pub const fn resolve(self, other: Line) -> Level {
        match (self, other) {
            (Line::Released, Line::Released) => Level::High,
            _ => Level::Low,
        }
    }
}

impl Level {
    /// Logic value of the level
    pub const fn bit(self) -> bool {
        matches!(self, Level::High)
    }

    /// Level for a logic value
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }

    pub const fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }

    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

/// Drive of both wires by one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusLines {
    /// Clock line
    pub scl: Line,
    /// Data line
    pub sda: Line,
}

impl BusLines {
    /// Both wires released
    pub const RELEASED: Self = Self {
        scl: Line::Released,
        sda: Line::Released,
    };

    /// Resolve against another device on the same wires
    pub const fn resolve(self, other: BusLines) -> BusLevels {
        BusLevels {
            scl: self.scl.resolve(other.scl),
            sda: self.sda.resolve(other.sda),
        }
    }
}

/// Resolved levels of both wires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusLevels {
    /// Clock line
    pub scl: Level,
    /// Data line
    pub sda: Level,
}

impl BusLevels {
    /// Idle bus, both wires pulled up
    pub const IDLE: Self = Self {
        scl: Level::High,
        sda: Level::High,
    };
}
