//! Cycle sequencer controller
//!
//! Sits between the caller inputs and the bus engine. Both variants latch
//! the most recent conversion into a level register, so a slow caller
//! never has to catch the one-tick pulse.

use super::phase::Phase;
use crate::bus::{EngineOutputs, Mode, Request};
use crate::config::SequencerMode;
use crate::driver::HostInputs;
use crate::registers::Conversion;

/// Free-running counter pacing read requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CadenceTimer {
    period: u32,
    count: u32,
}

impl CadenceTimer {
    /// Create a timer firing every `period` ticks
    pub const fn new(period: u32) -> Self {
        Self { period, count: 0 }
    }

    /// Reference ticks per cadence period
    pub const fn period(&self) -> u32 {
        self.period
    }

    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Timer reaches its terminal count on this tick
    pub const fn fired(&self) -> bool {
        self.count + 1 >= self.period
    }

    /// Snapshot after one tick, restarting on rollover or when `restart`
    pub const fn next(&self, restart: bool) -> Self {
        let count = if restart || self.fired() {
            0
        } else {
            self.count + 1
        };
        Self {
            period: self.period,
            count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Variant {
    /// Caller drives the engine; the first operation is forced to a write
    PassThrough {
        /// Set once the first transaction has completed
        configured: bool,
        /// Engine ready level on the previous tick
        was_ready: bool,
    },
    /// Sequencer drives the engine on its own schedule
    Autonomous { phase: Phase, timer: CadenceTimer },
}

/// Cycle sequencer snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleSequencer {
    variant: Variant,
    latest: Option<Conversion>,
}

impl CycleSequencer {
    /// Create a sequencer of the given variant
    ///
    /// `cadence_ticks` is only used by the autonomous variant.
    pub const fn new(mode: SequencerMode, cadence_ticks: u32) -> Self {
        let variant = match mode {
            SequencerMode::PassThrough => Variant::PassThrough {
                configured: false,
                // Ready is already high out of reset; only the end of the
                // first transaction counts as a rising edge.
                was_ready: true,
            },
            SequencerMode::Autonomous => Variant::Autonomous {
                phase: Phase::Idle,
                timer: CadenceTimer::new(cadence_ticks),
            },
        };
        Self {
            variant,
            latest: None,
        }
    }

    /// Return to the post-reset state of the same variant
    pub fn reset(&mut self) {
        *self = match self.variant {
            Variant::PassThrough { .. } => Self::new(SequencerMode::PassThrough, 0),
            Variant::Autonomous { timer, .. } => {
                Self::new(SequencerMode::Autonomous, timer.period())
            }
        };
    }

    /// Sequencer variant
    pub const fn mode(&self) -> SequencerMode {
        match self.variant {
            Variant::PassThrough { .. } => SequencerMode::PassThrough,
            Variant::Autonomous { .. } => SequencerMode::Autonomous,
        }
    }

    /// Autonomous phase, `None` for the pass-through variant
    pub const fn phase(&self) -> Option<Phase> {
        match self.variant {
            Variant::PassThrough { .. } => None,
            Variant::Autonomous { phase, .. } => Some(phase),
        }
    }

    /// Check if the initial configuration write has been completed
    pub const fn is_configured(&self) -> bool {
        match self.variant {
            Variant::PassThrough { configured, .. } => configured,
            Variant::Autonomous { phase, .. } => {
                !matches!(phase, Phase::Idle | Phase::Config | Phase::EndConfig)
            }
        }
    }

    /// Most recently completed conversion
    pub const fn latest(&self) -> Option<Conversion> {
        self.latest
    }

    /// Engine inputs for the current tick
    pub const fn request(&self, host: &HostInputs) -> Request {
        match self.variant {
            Variant::PassThrough { configured, .. } => Request {
                enable: host.enable,
                mode: if configured { host.mode } else { Mode::Write },
                address: host.address,
                config: host.config,
                last_read: host.last_read,
            },
            Variant::Autonomous { phase, .. } => Request {
                enable: phase.enable(),
                mode: if phase.is_config() {
                    Mode::Write
                } else {
                    Mode::Read
                },
                address: host.address,
                config: host.config,
                last_read: true,
            },
        }
    }

    /// Snapshot after one tick, given the engine outputs of the current tick
    pub fn next(&self, engine: &EngineOutputs) -> Self {
        let latest = match engine.conversion {
            Some(conversion) => Some(conversion),
            None => self.latest,
        };

        let variant = match self.variant {
            Variant::PassThrough {
                configured,
                was_ready,
            } => {
                let rising = engine.ready && !was_ready;
                if rising && !configured {
                    debug!("configuration write complete, following caller mode");
                }
                Variant::PassThrough {
                    configured: configured || rising,
                    was_ready: engine.ready,
                }
            }
            Variant::Autonomous { phase, timer } => {
                let next_phase = phase.transition(engine.ready, timer.fired());
                if next_phase != phase {
                    debug!("sequencer {:?} -> {:?}", phase, next_phase);
                }
                let entering_end_read = next_phase == Phase::EndRead && phase != Phase::EndRead;
                Variant::Autonomous {
                    phase: next_phase,
                    timer: timer.next(entering_end_read),
                }
            }
        };

        Self { variant, latest }
    }
}
