//! Host-side simulation toolkit
//!
//! A scripted converter, a passive bus observer, and a harness wiring them
//! to a [`Driver`](crate::Driver) through open-drain resolution. Used by the
//! crate's own tests and by anyone validating timing without hardware.

pub mod harness;
pub mod monitor;
pub mod peripheral;

pub use harness::Harness;
pub use monitor::{BusEvent, BusMonitor, ObservedByte};
pub use peripheral::ScriptedPeripheral;
