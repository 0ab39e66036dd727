//! Board-agnostic core of the two-wire ADC sampling driver
//!
//! This crate contains the bus timing and sequencing logic, independent of
//! any pin or clock wiring:
//!
//! - Bus clock generator (period, quarter and three-quarter pulses)
//! - Shift register and bit counter
//! - Bus transaction engine (START, address, data, ACK/NACK, STOP)
//! - Cycle sequencer (pass-through and autonomous variants)
//! - Register layouts of the converter
//! - Configuration types
//! - Simulation toolkit for host-side testing
//!
//! Everything advances on [`Driver::tick`], one call per reference clock
//! tick. Each tick computes the next state of every component from the
//! previous one; nothing blocks and nothing runs concurrently.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod bus;
pub mod clock;
pub mod config;
pub mod driver;
pub mod registers;
pub mod sequencer;
pub mod sim;

pub use bus::{BusEngine, BusLevels, BusLines, BusState, Level, Line, Mode, Transaction};
pub use clock::{BusPulses, ClockGenerator, Divider};
pub use config::{BusConfig, ConfigError, DriverConfig, SequencerConfig, SequencerMode};
pub use driver::{Driver, HostInputs, TickReport};
pub use registers::{Channel, ChannelMask, Conversion};
pub use sequencer::{CycleSequencer, Phase};
