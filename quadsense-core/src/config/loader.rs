//! Configuration storage and parsing
//!
//! Binary storage uses postcard. Text loading (feature `toml`) accepts:
//!
//! ```toml
//! address = 0x28
//! channels = 0b0011
//!
//! [bus]
//! reference_clock_hz = 50000000
//! bus_frequency_hz = 400000
//!
//! [sequencer]
//! mode = "autonomous"
//! cadence_hz = 1
//! ```

use super::types::{ConfigError, DriverConfig};

/// Upper bound on the postcard encoding of a [`DriverConfig`]
pub const MAX_ENCODED_LEN: usize = 32;

impl DriverConfig {
    /// Encode into `buf`, returning the used prefix
    pub fn to_postcard<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Encoding)
    }

    /// Decode and validate a stored configuration
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: DriverConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Encoding)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML configuration
    #[cfg(feature = "toml")]
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: DriverConfig = toml::from_str(input).map_err(|_| {
            error!("configuration text rejected");
            ConfigError::Parse
        })?;
        config.validate()?;
        Ok(config)
    }
}
