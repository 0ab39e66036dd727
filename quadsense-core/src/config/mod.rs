//! Configuration types
//!
//! Board-agnostic driver configuration, optionally stored as postcard
//! binary data or loaded from TOML text.

#[cfg(feature = "serde")]
pub mod loader;
pub mod types;

pub use types::*;
