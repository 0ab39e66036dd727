//! Hardware bindings for the quadsense bus master
//!
//! Connects the tick-driven [`quadsense_core::Driver`] to real pins and
//! wraps it as an AD7991 device driver:
//!
//! - Open-drain pin binding over `embedded-hal` digital traits
//! - AD7991 driver with per-channel sample table
//! - Conversion watchdog

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod ad7991;
pub mod channel;
pub mod pins;
pub mod watchdog;

pub use ad7991::{Ad7991, Error};
pub use channel::{AdcReader, ChannelReader, ChannelTable, SampleError};
pub use pins::OpenDrainBus;
pub use watchdog::ConversionWatchdog;
