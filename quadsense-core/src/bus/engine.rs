//! Bus transaction engine
//!
//! Protocol state machine for one master on an open-drain two-wire bus.
//! It frames START/STOP, shifts bytes MSB-first, checks the address
//! acknowledge and issues ACK/NACK after received bytes.
//!
//! ```text
//! Idle ─enable─► Start ─► WriteAddress ─8 bits─► AddressAck ─NACK─► Stop
//!                                                   │ write    │ read
//!                                                   ▼          ▼
//!                                   WriteByte ─► WriteByteAck  ReadByte1 ─► ReadByte1Ack
//!                                                   │                           │
//!                                                   ▼                           ▼
//!                                                  Stop         ReadByte2 ─last─► ReadByte2NoAck ─► Stop
//!                                                                   │ more
//!                                                                   ▼
//!                                                               ReadByte2Ack ─► ReadByte1
//! Stop ─► Idle
//! ```
//!
//! State changes only on the bus clock period boundary. Caller inputs are
//! captured once, on Idle -> Start; the only field looked at again is the
//! last-read flag, re-latched when a read burst moves on to its next pair.

use super::line::{BusLines, Level, Line, ACK};
use super::shift::{BitCounter, ShiftBuffer};
use crate::clock::BusPulses;
use crate::registers::Conversion;

/// Bus protocol states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// Both wires released, ready for a new transaction
    #[default]
    Idle,
    /// Data line pulled low under a released clock line
    Start,
    /// Sending the 7-bit address and the mode bit
    WriteAddress,
    /// Peripheral acknowledges its address
    AddressAck,
    /// Sending the configuration byte
    WriteByte,
    /// Peripheral acknowledges the configuration byte (not checked)
    WriteByteAck,
    /// Receiving the high byte of a conversion result
    ReadByte1,
    /// Acknowledging the high byte
    ReadByte1Ack,
    /// Receiving the low byte of a conversion result
    ReadByte2,
    /// Acknowledging the low byte, another pair follows
    ReadByte2Ack,
    /// Declining the low byte, the read ends
    ReadByte2NoAck,
    /// Data line released under a released clock line
    Stop,
}

impl BusState {
    /// Check if this state shifts eight bits
    pub const fn is_byte_phase(&self) -> bool {
        matches!(
            self,
            BusState::WriteAddress | BusState::WriteByte | BusState::ReadByte1 | BusState::ReadByte2
        )
    }

    /// Check if the master transmits the shift register in this state
    pub const fn is_transmit(&self) -> bool {
        matches!(self, BusState::WriteAddress | BusState::WriteByte)
    }

    /// Check if the master shifts received bits in this state
    pub const fn is_receive(&self) -> bool {
        matches!(self, BusState::ReadByte1 | BusState::ReadByte2)
    }

    /// Data line drive for this state
    ///
    /// States not listed leave the line to the peripheral.
    pub const fn sda(&self, shift: ShiftBuffer) -> Line {
        match self {
            BusState::Start | BusState::Stop => Line::DrivenLow,
            BusState::ReadByte1Ack | BusState::ReadByte2Ack => Line::DrivenLow,
            BusState::ReadByte2NoAck => Line::Released,
            BusState::WriteAddress | BusState::WriteByte => Line::from_bit(shift.msb()),
            _ => Line::Released,
        }
    }
}

/// Transfer direction, sent as the bit after the address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Write the configuration byte
    #[default]
    Write,
    /// Read conversion results
    Read,
}

impl Mode {
    /// Value of the mode bit
    pub const fn bit(self) -> u16 {
        match self {
            Mode::Write => 0,
            Mode::Read => 1,
        }
    }
}

/// Inputs presented to the engine on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request {
    /// Start a transaction when idle
    pub enable: bool,
    /// Transfer direction
    pub mode: Mode,
    /// 7-bit peripheral address
    pub address: u8,
    /// Configuration byte for writes
    pub config: u8,
    /// End a read after the current pair
    pub last_read: bool,
}

/// Request fields latched at the start of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transaction {
    /// 7-bit peripheral address
    pub address: u8,
    /// Transfer direction
    pub mode: Mode,
    /// Configuration byte
    pub config: u8,
    /// End a read after the current pair
    pub last_read: bool,
}

impl Transaction {
    /// Latch a request
    pub const fn capture(request: &Request) -> Self {
        Self {
            address: request.address & 0x7F,
            mode: request.mode,
            config: request.config,
            last_read: request.last_read,
        }
    }

    /// `{address, mode, config}` as loaded into the shift register
    pub const fn frame(&self) -> u16 {
        ((self.address as u16) << 9) | (self.mode.bit() << 8) | self.config as u16
    }

    /// First byte on the bus
    pub const fn address_byte(&self) -> u8 {
        (self.frame() >> 8) as u8
    }
}

/// Engine outputs for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineOutputs {
    /// High only while idle
    pub ready: bool,
    /// Present for exactly one tick after a pair is received
    pub conversion: Option<Conversion>,
    /// Wire drive
    pub lines: BusLines,
}

/// Bus transaction engine snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusEngine {
    state: BusState,
    /// Present from capture until Idle is re-entered
    transaction: Option<Transaction>,
    shift: ShiftBuffer,
    bits: BitCounter,
    /// Data line level sampled at the last quarter pulse
    sampled: Level,
    scl: Line,
    valid: bool,
}

impl BusEngine {
    /// Create an idle engine
    pub const fn new() -> Self {
        Self {
            state: BusState::Idle,
            transaction: None,
            shift: ShiftBuffer::load(0),
            bits: BitCounter::new(),
            sampled: Level::High,
            scl: Line::Released,
            valid: false,
        }
    }

    /// Return to idle, abandoning any transaction
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Current protocol state
    pub const fn state(&self) -> BusState {
        self.state
    }

    /// Latched transaction, if one is running
    pub const fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    pub const fn shift(&self) -> ShiftBuffer {
        self.shift
    }

    pub const fn bits(&self) -> BitCounter {
        self.bits
    }

    /// Ready for a new transaction
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, BusState::Idle)
    }

    /// Wire drive for the current tick
    pub const fn lines(&self) -> BusLines {
        BusLines {
            scl: self.scl,
            sda: self.state.sda(self.shift),
        }
    }

    /// All outputs for the current tick
    pub const fn outputs(&self) -> EngineOutputs {
        EngineOutputs {
            ready: self.is_ready(),
            conversion: if self.valid {
                Some(Conversion::new(self.shift.value()))
            } else {
                None
            },
            lines: self.lines(),
        }
    }

    /// Snapshot after one reference tick
    ///
    /// `sda` is the resolved data line level during the current tick.
    pub fn next(&self, pulses: BusPulses, request: &Request, sda: Level) -> Self {
        let mut next = *self;
        next.valid = false;

        if pulses.quarter {
            next.sampled = sda;
        }

        next.scl = if self.is_ready() || pulses.quarter {
            Line::Released
        } else if pulses.three_quarter && self.state != BusState::Stop {
            Line::DrivenLow
        } else {
            self.scl
        };

        if !pulses.tick {
            return next;
        }

        match self.transaction {
            None => {
                if request.enable {
                    let transaction = Transaction::capture(request);
                    debug!(
                        "capture {:?} address {=u8:#x} config {=u8:#x}",
                        transaction.mode,
                        transaction.address,
                        transaction.config
                    );
                    next.transaction = Some(transaction);
                    next.shift = ShiftBuffer::load(transaction.frame());
                    next.bits = BitCounter::new();
                    next.state = BusState::Start;
                }
            }
            Some(transaction) => next.advance(transaction, request),
        }

        next
    }

    /// Period-boundary transition of an active transaction
    fn advance(&mut self, transaction: Transaction, request: &Request) {
        let sampled = self.sampled;
        let state = self.state;

        if state.is_transmit() {
            self.shift = self.shift.rotate();
        } else if state.is_receive() {
            self.shift = self.shift.shift_in(sampled.bit());
        }

        let phase_done = self.bits.is_complete();
        if state.is_byte_phase() && !phase_done {
            self.bits = self.bits.increment();
            return;
        }

        let next_state = match state {
            BusState::Start => BusState::WriteAddress,
            BusState::WriteAddress => BusState::AddressAck,
            BusState::AddressAck => {
                if sampled != ACK {
                    warn!("address {=u8:#x} not acknowledged", transaction.address);
                    BusState::Stop
                } else {
                    match transaction.mode {
                        Mode::Write => BusState::WriteByte,
                        Mode::Read => BusState::ReadByte1,
                    }
                }
            }
            BusState::WriteByte => BusState::WriteByteAck,
            BusState::WriteByteAck => BusState::Stop,
            BusState::ReadByte1 => BusState::ReadByte1Ack,
            BusState::ReadByte1Ack => BusState::ReadByte2,
            BusState::ReadByte2 => {
                self.valid = true;
                trace!("conversion {=u16:#x}", self.shift.value());
                if transaction.last_read {
                    BusState::ReadByte2NoAck
                } else {
                    BusState::ReadByte2Ack
                }
            }
            BusState::ReadByte2Ack => {
                self.transaction = Some(Transaction {
                    last_read: request.last_read,
                    ..transaction
                });
                BusState::ReadByte1
            }
            BusState::ReadByte2NoAck => BusState::Stop,
            // Idle never has a transaction and so never reaches here
            BusState::Stop | BusState::Idle => {
                self.transaction = None;
                BusState::Idle
            }
        };

        self.bits = BitCounter::new();
        self.state = next_state;
    }
}
