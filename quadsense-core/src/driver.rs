//! Tick-driven driver
//!
//! Composes the clock generator, bus engine and cycle sequencer. One call
//! to [`Driver::tick`] is one reference clock cycle; every component's next
//! snapshot is computed from the snapshots of the previous cycle only.
//!
//! A tick is used in two steps, because the data line level the engine
//! samples depends on how the engine itself drives it:
//!
//! ```ignore
//! let lines = driver.lines();
//! let levels = lines.resolve(peripheral_lines);
//! let report = driver.tick(&inputs, levels.sda);
//! ```

use crate::bus::{BusEngine, BusLines, Level, Mode};
use crate::clock::ClockGenerator;
use crate::config::{ConfigError, DriverConfig, SequencerMode};
use crate::registers::Conversion;
use crate::sequencer::CycleSequencer;

/// Caller-side inputs, sampled every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostInputs {
    /// Start a transaction when the engine is idle
    pub enable: bool,
    /// Transfer direction
    pub mode: Mode,
    /// 7-bit peripheral address
    pub address: u8,
    /// Configuration byte
    pub config: u8,
    /// End a read burst after the current pair
    pub last_read: bool,
}

/// Caller-side outputs of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Engine idle and ready for a new transaction
    pub ready: bool,
    /// Conversion completed on this tick
    pub conversion: Option<Conversion>,
    /// Most recently completed conversion, held between pulses
    pub latest: Option<Conversion>,
}

/// Bus master driver
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Driver {
    clock: ClockGenerator,
    engine: BusEngine,
    sequencer: CycleSequencer,
    ticks: u64,
}

impl Driver {
    /// Create a driver in its post-reset state
    pub fn new(config: &DriverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let divider = config.bus.divider()?;
        let cadence_ticks = match config.sequencer.mode {
            SequencerMode::PassThrough => 0,
            SequencerMode::Autonomous => config
                .sequencer
                .cadence_ticks(config.bus.reference_clock_hz)?,
        };
        info!(
            "driver: divisor {}, sequencer {:?}",
            divider.divisor(),
            config.sequencer.mode
        );
        Ok(Self {
            clock: ClockGenerator::new(divider),
            engine: BusEngine::new(),
            sequencer: CycleSequencer::new(config.sequencer.mode, cadence_ticks),
            ticks: 0,
        })
    }

    /// External reset: idle engine, counters at zero, latched result cleared
    pub fn reset(&mut self) {
        self.clock.reset();
        self.engine.reset();
        self.sequencer.reset();
        self.ticks = 0;
    }

    pub fn clock(&self) -> &ClockGenerator {
        &self.clock
    }

    pub fn engine(&self) -> &BusEngine {
        &self.engine
    }

    pub fn sequencer(&self) -> &CycleSequencer {
        &self.sequencer
    }

    /// Reference ticks since reset
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Engine ready for a new transaction
    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// Most recently completed conversion
    pub fn latest(&self) -> Option<Conversion> {
        self.sequencer.latest()
    }

    /// Wire drive during the current tick
    pub fn lines(&self) -> BusLines {
        self.engine.lines()
    }

    /// Advance one reference tick
    ///
    /// `sda` is the resolved data line level during this tick. The report
    /// describes the tick that just ran; the driver then holds the next
    /// snapshot.
    pub fn tick(&mut self, host: &HostInputs, sda: Level) -> TickReport {
        let pulses = self.clock.pulses();
        let request = self.sequencer.request(host);
        let outputs = self.engine.outputs();

        let report = TickReport {
            ready: outputs.ready,
            conversion: outputs.conversion,
            latest: outputs.conversion.or(self.sequencer.latest()),
        };

        self.engine = self.engine.next(pulses, &request, sda);
        self.sequencer = self.sequencer.next(&outputs);
        self.clock = self.clock.next();
        self.ticks += 1;

        report
    }
}
