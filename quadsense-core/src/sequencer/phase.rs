//! Autonomous sequencing phases
//!
//! Every transition is driven by the engine's ready level or by the
//! cadence timer. Once the configuration write has finished the machine
//! loops between `WaitingRead`, `ReadAdc` and `EndRead` forever.

/// Autonomous sequencer phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// After reset, waiting for the engine to be ready
    #[default]
    Idle,
    /// Requesting the configuration write
    Config,
    /// Configuration write in progress
    EndConfig,
    /// Waiting for the cadence timer
    WaitingRead,
    /// Requesting a read
    ReadAdc,
    /// Read in progress
    EndRead,
}

impl Phase {
    /// Check if the engine enable is asserted in this phase
    pub const fn enable(&self) -> bool {
        !matches!(self, Phase::Idle | Phase::WaitingRead)
    }

    /// Check if this phase belongs to the configuration write
    pub const fn is_config(&self) -> bool {
        matches!(self, Phase::Config | Phase::EndConfig)
    }

    /// Process one tick and return the next phase
    pub const fn transition(self, ready: bool, cadence_fired: bool) -> Self {
        use Phase::*;

        match self {
            Idle if ready => Config,
            Config if !ready => EndConfig,
            EndConfig if ready => WaitingRead,
            WaitingRead if cadence_fired => ReadAdc,
            ReadAdc if !ready => EndRead,
            EndRead if ready => WaitingRead,
            // Default: stay in current phase
            _ => self,
        }
    }
}
