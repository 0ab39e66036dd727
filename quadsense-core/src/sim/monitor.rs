//! Passive bus observer
//!
//! Records what happens on the wires without driving them: START and STOP
//! conditions, every bit sampled on a rising clock edge, and whether the
//! bus is busy. Bits are grouped into 9-bit frames (8 data bits plus the
//! acknowledge slot) to recover the bytes of each transaction.

use heapless::Vec;

use crate::bus::{BusLevels, Level};

/// Maximum events kept
pub const MAX_EVENTS: usize = 1024;

/// Maximum bytes returned by [`BusMonitor::bytes`]
pub const MAX_BYTES: usize = 64;

/// Something observed on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusEvent {
    /// Data line fell while the clock line was high
    Start,
    /// Data line rose while the clock line was high
    Stop,
    /// Data line level at a rising clock edge
    Bit(Level),
}

/// A byte and the acknowledge level that followed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObservedByte {
    pub value: u8,
    pub ack: Level,
}

/// Passive bus observer
#[derive(Debug, Clone)]
pub struct BusMonitor {
    last: BusLevels,
    busy: bool,
    events: Vec<BusEvent, MAX_EVENTS>,
    overflowed: bool,
}

impl Default for BusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl BusMonitor {
    pub fn new() -> Self {
        Self {
            last: BusLevels::IDLE,
            busy: false,
            events: Vec::new(),
            overflowed: false,
        }
    }

    /// Forget recorded events, keep tracking the wires
    pub fn clear(&mut self) {
        self.events.clear();
        self.overflowed = false;
    }

    /// Check if a START has been seen without its STOP
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Check if events were dropped for lack of space
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    fn record(&mut self, event: BusEvent) {
        if self.events.push(event).is_err() {
            self.overflowed = true;
        }
    }

    /// Observe the resolved wire levels for one tick
    pub fn observe(&mut self, levels: BusLevels) {
        let last = self.last;
        self.last = levels;

        if last.scl.is_high() && levels.scl.is_high() {
            if last.sda.is_high() && levels.sda.is_low() {
                self.busy = true;
                self.record(BusEvent::Start);
            } else if last.sda.is_low() && levels.sda.is_high() {
                self.busy = false;
                self.record(BusEvent::Stop);
            }
        } else if self.busy && last.scl.is_low() && levels.scl.is_high() {
            self.record(BusEvent::Bit(levels.sda));
        }
    }

    /// Bytes of all recorded transactions, in order
    ///
    /// Bits left over before a STOP (the clock pulse of the stop condition
    /// itself) are discarded.
    pub fn bytes(&self) -> Vec<ObservedByte, MAX_BYTES> {
        let mut bytes = Vec::new();
        let mut value = 0u16;
        let mut count = 0;
        for event in self.events.iter() {
            match event {
                BusEvent::Start | BusEvent::Stop => {
                    value = 0;
                    count = 0;
                }
                BusEvent::Bit(level) => {
                    value = (value << 1) | level.bit() as u16;
                    count += 1;
                    if count == 9 {
                        let _ = bytes.push(ObservedByte {
                            value: (value >> 1) as u8,
                            ack: Level::from_bit(value & 1 != 0),
                        });
                        value = 0;
                        count = 0;
                    }
                }
            }
        }
        bytes
    }

    /// Number of START conditions recorded
    pub fn starts(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BusEvent::Start))
            .count()
    }

    /// Number of STOP conditions recorded
    pub fn stops(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BusEvent::Stop))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(scl: Level, sda: Level) -> BusLevels {
        BusLevels { scl, sda }
    }

    #[test]
    fn test_start_bits_stop() {
        let mut monitor = BusMonitor::new();
        monitor.observe(BusLevels::IDLE);
        monitor.observe(at(Level::High, Level::Low));
        assert!(monitor.is_busy());

        // byte 0xA5 then ACK
        for i in 0..9 {
            let bit = if i < 8 { 0xA5 & (0x80 >> i) != 0 } else { false };
            monitor.observe(at(Level::Low, Level::from_bit(bit)));
            monitor.observe(at(Level::High, Level::from_bit(bit)));
        }
        monitor.observe(at(Level::Low, Level::Low));
        monitor.observe(at(Level::High, Level::Low));
        monitor.observe(at(Level::High, Level::High));
        assert!(!monitor.is_busy());

        let bytes = monitor.bytes();
        assert_eq!(
            bytes.as_slice(),
            &[ObservedByte {
                value: 0xA5,
                ack: Level::Low
            }]
        );
        assert_eq!(monitor.starts(), 1);
        assert_eq!(monitor.stops(), 1);
    }

    #[test]
    fn test_ignores_clock_while_idle() {
        let mut monitor = BusMonitor::new();
        monitor.observe(at(Level::Low, Level::High));
        monitor.observe(at(Level::High, Level::High));
        assert!(monitor.events().is_empty());
    }
}
