//! Cycle sequencer
//!
//! Decides, above the byte level, what the bus engine does next: a one-shot
//! configuration write, then reads for as long as the driver runs.

pub mod controller;
pub mod phase;

pub use controller::{CadenceTimer, CycleSequencer};
pub use phase::Phase;
