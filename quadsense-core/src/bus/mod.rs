//! Two-wire bus master
//!
//! The bus engine is explicit, finite and deterministic: every output is a
//! function of its current snapshot, and every state change happens on a
//! bus clock period boundary.

pub mod engine;
pub mod line;
pub mod shift;

pub use engine::{BusEngine, BusState, EngineOutputs, Mode, Request, Transaction};
pub use line::{BusLevels, BusLines, Level, Line, ACK, NACK};
pub use shift::{BitCounter, ShiftBuffer};
