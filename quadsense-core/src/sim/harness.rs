//! Simulated bus harness
//!
//! Wires a [`Driver`], a [`ScriptedPeripheral`] and a [`BusMonitor`] to the
//! same two wires. Each [`Harness::step`] is one reference tick:
//!
//! 1. both devices present their drive for this tick
//! 2. the wires resolve (low if anyone pulls low)
//! 3. the driver, the peripheral and the monitor all see the same levels

use crate::bus::BusLevels;
use crate::config::{ConfigError, DriverConfig};
use crate::driver::{Driver, HostInputs, TickReport};
use crate::registers::Conversion;

use super::monitor::BusMonitor;
use super::peripheral::ScriptedPeripheral;

/// Driver and peripheral on a simulated bus
#[derive(Debug, Clone)]
pub struct Harness {
    /// Driver under test
    pub driver: Driver,
    /// Converter model
    pub peripheral: ScriptedPeripheral,
    /// Passive observer
    pub monitor: BusMonitor,
    /// Caller inputs presented every tick
    pub inputs: HostInputs,
    levels: BusLevels,
}

impl Harness {
    /// Create a harness with inputs taken from the configuration
    pub fn new(config: &DriverConfig, peripheral: ScriptedPeripheral) -> Result<Self, ConfigError> {
        Ok(Self {
            driver: Driver::new(config)?,
            peripheral,
            monitor: BusMonitor::new(),
            inputs: config.host_inputs(),
            levels: BusLevels::IDLE,
        })
    }

    /// Wire levels during the last tick
    pub fn levels(&self) -> BusLevels {
        self.levels
    }

    /// Run one reference tick
    pub fn step(&mut self) -> TickReport {
        let levels = self.driver.lines().resolve(self.peripheral.lines());
        let report = self.driver.tick(&self.inputs, levels.sda);
        self.peripheral.tick(levels);
        self.monitor.observe(levels);
        self.levels = levels;
        report
    }

    /// Step until `done` returns true, at most `max_ticks` times
    ///
    /// Returns the number of ticks taken, or `None` if `done` never held.
    pub fn run_until<F>(&mut self, mut done: F, max_ticks: u64) -> Option<u64>
    where
        F: FnMut(&Harness, &TickReport) -> bool,
    {
        for taken in 1..=max_ticks {
            let report = self.step();
            if done(self, &report) {
                return Some(taken);
            }
        }
        None
    }

    /// Step until the next conversion pulse
    pub fn next_conversion(&mut self, max_ticks: u64) -> Option<Conversion> {
        let mut found = None;
        self.run_until(
            |_, report| {
                found = report.conversion;
                found.is_some()
            },
            max_ticks,
        )?;
        found
    }

    /// Step `ticks` times, counting conversion pulses
    pub fn run(&mut self, ticks: u64) -> usize {
        let mut pulses = 0;
        for _ in 0..ticks {
            if self.step().conversion.is_some() {
                pulses += 1;
            }
        }
        pulses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Level, Mode};
    use crate::config::{BusConfig, SequencerConfig};
    use crate::sequencer::Phase;
    use crate::sim::{BusEvent, ObservedByte};
    use proptest::prelude::*;
    use std::vec::Vec;

    /// Generous bound on one transaction at divisor 10
    const TRANSACTION_TICKS: u64 = 1_000;

    fn pass_through() -> DriverConfig {
        DriverConfig {
            bus: BusConfig {
                reference_clock_hz: 1_000_000,
                bus_frequency_hz: 100_000,
            },
            sequencer: SequencerConfig::PASS_THROUGH,
            ..DriverConfig::default()
        }
    }

    fn byte(value: u8, ack: Level) -> ObservedByte {
        ObservedByte { value, ack }
    }

    /// Run one enable pulse to completion
    fn transact(h: &mut Harness) {
        h.inputs.enable = true;
        h.run_until(|h, _| !h.driver.is_ready(), TRANSACTION_TICKS)
            .unwrap();
        h.inputs.enable = false;
        finish(h);
    }

    /// Run until ready, plus the tick on which the STOP shows on the wires
    fn finish(h: &mut Harness) {
        h.run_until(|h, _| h.driver.is_ready(), TRANSACTION_TICKS)
            .unwrap();
        h.step();
    }

    #[test]
    fn test_write_scenario() {
        let mut h = Harness::new(&pass_through(), ScriptedPeripheral::new(0x28)).unwrap();
        h.driver.reset();
        assert_eq!(h.inputs.address, 0x28);
        assert_eq!(h.inputs.config, 0x10);

        h.inputs.enable = true;
        h.inputs.mode = Mode::Write;
        let mut pulses = 0;
        h.run_until(
            |h, r| {
                pulses += r.conversion.is_some() as u32;
                !h.driver.is_ready()
            },
            TRANSACTION_TICKS,
        )
        .unwrap();
        h.inputs.enable = false;
        h.run_until(
            |h, r| {
                pulses += r.conversion.is_some() as u32;
                h.driver.is_ready()
            },
            TRANSACTION_TICKS,
        )
        .unwrap();
        h.step();

        // 0101000 0, 00010000, both acknowledged
        assert_eq!(
            h.monitor.bytes().as_slice(),
            &[byte(0x50, Level::Low), byte(0x10, Level::Low)]
        );
        assert_eq!(h.monitor.starts(), 1);
        assert_eq!(h.monitor.stops(), 1);
        assert!(!h.monitor.is_busy());
        assert_eq!(h.peripheral.config(), Some(0x10));
        assert_eq!(pulses, 0);
        assert_eq!(h.levels(), BusLevels::IDLE);
    }

    #[test]
    fn test_write_transaction_length() {
        let mut h = Harness::new(&pass_through(), ScriptedPeripheral::new(0x28)).unwrap();
        h.inputs.enable = true;
        let start = h.run_until(|h, _| !h.driver.is_ready(), TRANSACTION_TICKS).unwrap();
        h.inputs.enable = false;
        let busy = h.run_until(|h, _| h.driver.is_ready(), TRANSACTION_TICKS).unwrap();
        // captured on the first period boundary
        assert_eq!(start, 10);
        // Start, 8 address bits, ack, 8 data bits, ack, Stop
        assert_eq!(busy, 20 * 10);
    }

    #[test]
    fn test_first_operation_forced_to_write() {
        let peripheral = ScriptedPeripheral::new(0x28).with_script(&[0xD7, 0x15]);
        let mut h = Harness::new(&pass_through(), peripheral).unwrap();
        h.inputs.enable = true;
        h.inputs.mode = Mode::Read;
        h.inputs.last_read = true;

        let conversion = h.next_conversion(2 * TRANSACTION_TICKS).unwrap();
        assert_eq!(conversion.raw(), 0xD715);
        assert_eq!(h.peripheral.config(), Some(0x10));
        assert!(h.driver.sequencer().is_configured());

        h.inputs.enable = false;
        finish(&mut h);
        assert_eq!(
            h.monitor.bytes().as_slice(),
            &[
                byte(0x50, Level::Low),
                byte(0x10, Level::Low),
                byte(0x51, Level::Low),
                byte(0xD7, Level::Low),
                byte(0x15, Level::High),
            ]
        );
        assert_eq!(h.driver.latest(), Some(Conversion::new(0xD715)));
    }

    #[test]
    fn test_read_burst_until_last_read() {
        let peripheral = ScriptedPeripheral::new(0x28).with_script(&[0xD7, 0x15, 0xD0, 0x50]);
        let mut h = Harness::new(&pass_through(), peripheral).unwrap();
        transact(&mut h);
        h.monitor.clear();

        h.inputs.enable = true;
        h.inputs.mode = Mode::Read;
        h.inputs.last_read = false;
        assert_eq!(h.next_conversion(TRANSACTION_TICKS).unwrap().raw(), 0xD715);
        h.inputs.last_read = true;
        h.inputs.enable = false;
        assert_eq!(h.next_conversion(TRANSACTION_TICKS).unwrap().raw(), 0xD050);
        finish(&mut h);

        assert_eq!(
            h.monitor.bytes().as_slice(),
            &[
                byte(0x51, Level::Low),
                byte(0xD7, Level::Low),
                byte(0x15, Level::Low),
                byte(0xD0, Level::Low),
                byte(0x50, Level::High),
            ]
        );
        assert_eq!(h.monitor.starts(), 1);
        assert_eq!(h.monitor.stops(), 1);
    }

    #[test]
    fn test_burst_keeps_reading() {
        let peripheral = ScriptedPeripheral::new(0x28).with_script(&[0x10, 0x01, 0x20, 0x02]);
        let mut h = Harness::new(&pass_through(), peripheral).unwrap();
        transact(&mut h);

        h.inputs.enable = true;
        h.inputs.mode = Mode::Read;
        h.inputs.last_read = false;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(h.next_conversion(TRANSACTION_TICKS).unwrap().raw());
        }
        assert_eq!(seen, [0x1001, 0x2002, 0x1001, 0x2002, 0x1001, 0x2002]);
        assert!(h.monitor.is_busy());
        assert_eq!(h.peripheral.starts(), 2);
    }

    #[test]
    fn test_address_nack_produces_nothing() {
        let peripheral = ScriptedPeripheral::new(0x28).silent();
        let mut h = Harness::new(&pass_through(), peripheral).unwrap();
        h.inputs.enable = true;
        h.inputs.mode = Mode::Read;
        assert_eq!(h.run(3 * TRANSACTION_TICKS), 0);
        assert_eq!(h.driver.latest(), None);

        let bytes = h.monitor.bytes();
        assert!(!bytes.is_empty());
        assert!(bytes.iter().all(|b| b.ack == Level::High));
        assert_eq!(bytes[0].value, 0x50);
        assert!(h.monitor.stops() >= 1);
    }

    #[test]
    fn test_repeat_is_identical() {
        let mut h = Harness::new(&pass_through(), ScriptedPeripheral::new(0x28)).unwrap();
        transact(&mut h);
        let first: Vec<BusEvent> = h.monitor.events().to_vec();
        h.monitor.clear();
        transact(&mut h);
        assert_eq!(h.monitor.events(), first.as_slice());
    }

    #[test]
    fn test_autonomous_sequence() {
        let config = DriverConfig {
            sequencer: SequencerConfig::autonomous(1_000),
            ..pass_through()
        };
        let peripheral = ScriptedPeripheral::new(0x28)
            .with_conversions(&[Conversion::new(0x0123), Conversion::new(0x1456)]);
        let mut h = Harness::new(&config, peripheral).unwrap();

        let mut phases: Vec<Phase> = Vec::new();
        let mut conversions = Vec::new();
        for _ in 0..5_500 {
            let report = h.step();
            if let Some(c) = report.conversion {
                conversions.push(c.raw());
            }
            let phase = h.driver.sequencer().phase().unwrap();
            if phases.last() != Some(&phase) {
                phases.push(phase);
            }
        }

        use Phase::*;
        assert_eq!(
            &phases[..9],
            &[Idle, Config, EndConfig, WaitingRead, ReadAdc, EndRead, WaitingRead, ReadAdc, EndRead]
        );
        assert!(phases[3..]
            .iter()
            .all(|p| matches!(p, WaitingRead | ReadAdc | EndRead)));
        assert_eq!(h.peripheral.config(), Some(0x10));
        assert_eq!(&conversions[..4], &[0x0123, 0x1456, 0x0123, 0x1456]);
        assert_eq!(h.driver.latest().map(|c| c.raw()), conversions.last().copied());

        // one single-pair read per cadence period, each ending in a NACK
        let bytes = h.monitor.bytes();
        let reads = bytes.iter().filter(|b| b.value == 0x51).count();
        assert!(reads >= conversions.len());
        assert!(bytes.iter().filter(|b| b.ack == Level::High).count() >= conversions.len());
    }

    proptest! {
        #[test]
        fn prop_read_round_trip(hi in any::<u8>(), lo in any::<u8>()) {
            let peripheral = ScriptedPeripheral::new(0x28).with_script(&[hi, lo]);
            let mut h = Harness::new(&pass_through(), peripheral).unwrap();
            h.inputs.enable = true;
            h.inputs.mode = Mode::Read;
            h.inputs.last_read = true;
            let conversion = h.next_conversion(2 * TRANSACTION_TICKS).unwrap();
            prop_assert_eq!(conversion, Conversion::from_bytes(hi, lo));
        }
    }
}
