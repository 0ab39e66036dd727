//! Scripted converter model
//!
//! A slave-side model of the converter's bus interface. It watches the
//! resolved wire levels, detects START and STOP, shifts bits on clock
//! edges and answers reads from a script of bytes.
//!
//! Like a real device it samples the data line on the rising clock edge
//! and changes its own drive only after the falling edge, so its drive
//! for one tick depends only on what it saw on earlier ticks.

use heapless::Vec;

use crate::bus::{BusLevels, BusLines, Level, Line};
use crate::registers::Conversion;

/// Maximum scripted read bytes
pub const MAX_SCRIPT: usize = 32;

/// Maximum received bytes kept in the log
pub const MAX_RECEIVED: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum SlaveState {
    /// Not addressed
    Idle,
    /// Receiving the address byte
    Address,
    /// Holding the address acknowledge
    AddressAck,
    /// Receiving a data byte
    Data,
    /// Holding a data acknowledge
    DataAck,
    /// Sending a byte
    Transmit,
    /// Waiting for the master to ACK or NACK
    MasterAck,
}

/// Scripted peripheral on the simulated bus
#[derive(Debug, Clone)]
pub struct ScriptedPeripheral {
    address: u8,
    respond: bool,
    script: Vec<u8, MAX_SCRIPT>,
    cursor: usize,
    received: Vec<u8, MAX_RECEIVED>,
    config: Option<u8>,
    state: SlaveState,
    shift: u8,
    bits: u8,
    read: bool,
    master_acked: bool,
    sda: Line,
    last: BusLevels,
    starts: u32,
    stops: u32,
}

impl ScriptedPeripheral {
    /// Create a peripheral answering at `address` with no read data
    pub fn new(address: u8) -> Self {
        Self {
            address,
            respond: true,
            script: Vec::new(),
            cursor: 0,
            received: Vec::new(),
            config: None,
            state: SlaveState::Idle,
            shift: 0,
            bits: 0,
            read: false,
            master_acked: false,
            sda: Line::Released,
            last: BusLevels::IDLE,
            starts: 0,
            stops: 0,
        }
    }

    /// Bytes returned by reads, in order, repeating when exhausted
    ///
    /// Bytes beyond [`MAX_SCRIPT`] are dropped.
    pub fn with_script(mut self, bytes: &[u8]) -> Self {
        self.script.clear();
        for &byte in bytes.iter().take(MAX_SCRIPT) {
            let _ = self.script.push(byte);
        }
        self.cursor = 0;
        self
    }

    /// Script a sequence of conversion words
    pub fn with_conversions(self, words: &[Conversion]) -> Self {
        let mut bytes: Vec<u8, MAX_SCRIPT> = Vec::new();
        for word in words.iter().take(MAX_SCRIPT / 2) {
            let [hi, lo] = word.raw().to_be_bytes();
            let _ = bytes.push(hi);
            let _ = bytes.push(lo);
        }
        self.with_script(&bytes)
    }

    /// Leave the address unacknowledged, as if the device were absent
    pub fn silent(mut self) -> Self {
        self.respond = false;
        self
    }

    /// Wire drive for the current tick (the clock line is never held)
    pub fn lines(&self) -> BusLines {
        BusLines {
            scl: Line::Released,
            sda: self.sda,
        }
    }

    /// Every byte received, address bytes included
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Last configuration byte written
    pub fn config(&self) -> Option<u8> {
        self.config
    }

    /// START conditions seen
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// STOP conditions seen
    pub fn stops(&self) -> u32 {
        self.stops
    }

    fn next_byte(&mut self) -> u8 {
        if self.script.is_empty() {
            return 0;
        }
        let byte = self.script[self.cursor % self.script.len()];
        self.cursor = (self.cursor + 1) % self.script.len();
        byte
    }

    fn begin_transmit(&mut self) {
        self.shift = self.next_byte();
        self.bits = 0;
        self.sda = Line::from_bit(self.shift & 0x80 != 0);
        self.state = SlaveState::Transmit;
    }

    fn begin_receive(&mut self, state: SlaveState) {
        self.shift = 0;
        self.bits = 0;
        self.sda = Line::Released;
        self.state = state;
    }

    fn log(&mut self, byte: u8) {
        let _ = self.received.push(byte);
    }

    /// Observe the resolved wire levels for one tick
    pub fn tick(&mut self, levels: BusLevels) {
        let last = self.last;
        self.last = levels;

        let clock_held_high = last.scl.is_high() && levels.scl.is_high();
        if clock_held_high && last.sda.is_high() && levels.sda.is_low() {
            self.starts += 1;
            self.begin_receive(SlaveState::Address);
            return;
        }
        if clock_held_high && last.sda.is_low() && levels.sda.is_high() {
            self.stops += 1;
            self.begin_receive(SlaveState::Idle);
            return;
        }

        let rising = last.scl.is_low() && levels.scl.is_high();
        let falling = last.scl.is_high() && levels.scl.is_low();

        match self.state {
            SlaveState::Idle => {}
            SlaveState::Address | SlaveState::Data => {
                if rising && self.bits < 8 {
                    self.shift = (self.shift << 1) | levels.sda.bit() as u8;
                    self.bits += 1;
                }
                if falling && self.bits == 8 {
                    let byte = self.shift;
                    self.log(byte);
                    if self.state == SlaveState::Address {
                        if byte >> 1 == self.address && self.respond {
                            self.read = byte & 1 == 1;
                            self.sda = Line::DrivenLow;
                            self.state = SlaveState::AddressAck;
                        } else {
                            self.begin_receive(SlaveState::Idle);
                        }
                    } else {
                        self.config = Some(byte);
                        self.sda = Line::DrivenLow;
                        self.state = SlaveState::DataAck;
                    }
                }
            }
            SlaveState::AddressAck => {
                if falling {
                    if self.read {
                        self.begin_transmit();
                    } else {
                        self.begin_receive(SlaveState::Data);
                    }
                }
            }
            SlaveState::DataAck => {
                if falling {
                    self.begin_receive(SlaveState::Data);
                }
            }
            SlaveState::Transmit => {
                if falling {
                    self.bits += 1;
                    if self.bits == 8 {
                        self.sda = Line::Released;
                        self.state = SlaveState::MasterAck;
                    } else {
                        self.sda = Line::from_bit(self.shift & (0x80 >> self.bits) != 0);
                    }
                }
            }
            SlaveState::MasterAck => {
                if rising {
                    self.master_acked = levels.sda == Level::Low;
                }
                if falling {
                    if self.master_acked {
                        self.begin_transmit();
                    } else {
                        self.begin_receive(SlaveState::Idle);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(scl: Level, sda: Level) -> BusLevels {
        BusLevels { scl, sda }
    }

    /// Clock one bit into the peripheral: data set while low, then a pulse
    fn clock_bit(p: &mut ScriptedPeripheral, bit: Level) {
        p.tick(levels(Level::Low, bit));
        p.tick(levels(Level::High, bit));
        p.tick(levels(Level::Low, bit));
    }

    fn start(p: &mut ScriptedPeripheral) {
        p.tick(BusLevels::IDLE);
        p.tick(levels(Level::High, Level::Low));
        p.tick(levels(Level::Low, Level::Low));
    }

    #[test]
    fn test_detects_start_and_stop() {
        let mut p = ScriptedPeripheral::new(0x28);
        start(&mut p);
        assert_eq!(p.starts(), 1);
        p.tick(levels(Level::High, Level::Low));
        p.tick(levels(Level::High, Level::High));
        assert_eq!(p.stops(), 1);
    }

    #[test]
    fn test_acknowledges_own_address() {
        let mut p = ScriptedPeripheral::new(0x28);
        start(&mut p);
        for i in 0..8 {
            clock_bit(&mut p, Level::from_bit(0x50 & (0x80 >> i) != 0));
        }
        assert_eq!(p.received(), &[0x50]);
        assert_eq!(p.lines().sda, Line::DrivenLow);
    }

    #[test]
    fn test_ignores_other_address() {
        let mut p = ScriptedPeripheral::new(0x29);
        start(&mut p);
        for i in 0..8 {
            clock_bit(&mut p, Level::from_bit(0x50 & (0x80 >> i) != 0));
        }
        assert_eq!(p.lines().sda, Line::Released);
    }

    #[test]
    fn test_silent_device_never_acks() {
        let mut p = ScriptedPeripheral::new(0x28).silent();
        start(&mut p);
        for i in 0..8 {
            clock_bit(&mut p, Level::from_bit(0x50 & (0x80 >> i) != 0));
        }
        assert_eq!(p.lines().sda, Line::Released);
    }

    #[test]
    fn test_script_cycles() {
        let mut p = ScriptedPeripheral::new(0x28).with_conversions(&[Conversion::new(0xD715)]);
        assert_eq!(p.next_byte(), 0xD7);
        assert_eq!(p.next_byte(), 0x15);
        assert_eq!(p.next_byte(), 0xD7);
    }
}
