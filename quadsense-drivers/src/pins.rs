//! Open-drain pin binding
//!
//! Both pins must be configured as open-drain outputs by the HAL, so that
//! "high" releases the wire to its pull-up. The data pin must also be
//! readable, because the driver samples the resolved wire level.

use embedded_hal::digital::{InputPin, OutputPin};
use quadsense_core::{BusLines, Level, Line};

/// Clock and data pins of one bus
pub struct OpenDrainBus<SCL, SDA> {
    scl: SCL,
    sda: SDA,
    /// Drive last written to the pins
    applied: Option<BusLines>,
}

impl<SCL, SDA, E> OpenDrainBus<SCL, SDA>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
{
    /// Take ownership of the pins
    ///
    /// Nothing is written until the first [`OpenDrainBus::apply`].
    pub fn new(scl: SCL, sda: SDA) -> Self {
        Self {
            scl,
            sda,
            applied: None,
        }
    }

    /// Give the pins back
    pub fn release(self) -> (SCL, SDA) {
        (self.scl, self.sda)
    }

    /// Drive last written to the pins
    pub fn applied(&self) -> Option<BusLines> {
        self.applied
    }

    /// Write a drive to the pins, skipping pins that already match
    pub fn apply(&mut self, lines: BusLines) -> Result<(), E> {
        let previous = self.applied;
        if previous.map(|p| p.scl) != Some(lines.scl) {
            drive(&mut self.scl, lines.scl)?;
        }
        if previous.map(|p| p.sda) != Some(lines.sda) {
            drive(&mut self.sda, lines.sda)?;
        }
        self.applied = Some(lines);
        Ok(())
    }

    /// Read the resolved data line level
    pub fn sample_sda(&mut self) -> Result<Level, E> {
        Ok(Level::from_bit(self.sda.is_high()?))
    }
}

fn drive<P: OutputPin>(pin: &mut P, line: Line) -> Result<(), P::Error> {
    match line {
        Line::Released => pin.set_high(),
        Line::DrivenLow => pin.set_low(),
    }
}
