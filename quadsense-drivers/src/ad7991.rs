//! AD7991 device driver
//!
//! Runs the tick-driven bus master on two open-drain pins. The caller owns
//! the timing: [`Ad7991::poll`] must be called once per reference clock
//! period, from a timer interrupt or a paced loop.
//!
//! Results are sorted into a [`ChannelTable`] by the channel id carried in
//! each conversion word.

use embedded_hal::digital::{InputPin, OutputPin};
use quadsense_core::{
    Channel, ChannelMask, ConfigError, Conversion, Driver, DriverConfig, HostInputs, Mode,
    SequencerMode, TickReport,
};

use crate::channel::{ChannelReader, ChannelTable};
use crate::pins::OpenDrainBus;
use crate::watchdog::ConversionWatchdog;

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// GPIO error
    Pin(E),
    /// Rejected configuration
    Config(ConfigError),
    /// No conversion within the watchdog budget
    Timeout,
}

impl<E> From<ConfigError> for Error<E> {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// AD7991 on a bit-banged bus
pub struct Ad7991<SCL, SDA> {
    driver: Driver,
    bus: OpenDrainBus<SCL, SDA>,
    config: DriverConfig,
    inputs: HostInputs,
    channels: ChannelTable,
    watchdog: ConversionWatchdog,
    /// Reset requested, held until the current transaction ends
    reset_pending: bool,
}

impl<SCL, SDA, E> Ad7991<SCL, SDA>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
{
    /// Create a driver and release both wires
    pub fn new(config: &DriverConfig, scl: SCL, sda: SDA) -> Result<Self, Error<E>> {
        let driver = Driver::new(config)?;
        let cadence_ticks = match config.sequencer.mode {
            SequencerMode::Autonomous => config
                .sequencer
                .cadence_ticks(config.bus.reference_clock_hz)?,
            SequencerMode::PassThrough => 0,
        };
        let watchdog = ConversionWatchdog::for_config(
            config,
            driver.clock().divider().divisor(),
            cadence_ticks,
        );

        let mut bus = OpenDrainBus::new(scl, sda);
        bus.apply(driver.lines()).map_err(Error::Pin)?;

        Ok(Self {
            driver,
            bus,
            config: *config,
            inputs: config.host_inputs(),
            channels: ChannelTable::new(),
            watchdog,
            reset_pending: false,
        })
    }

    /// Give the pins back
    pub fn release(self) -> (SCL, SDA) {
        self.bus.release()
    }

    /// Run one reference tick
    pub fn poll(&mut self) -> Result<TickReport, Error<E>> {
        if self.reset_pending && self.driver.is_ready() {
            self.driver.reset();
            self.watchdog.feed();
            self.reset_pending = false;
        }

        self.bus.apply(self.driver.lines()).map_err(Error::Pin)?;
        let sda = self.bus.sample_sda().map_err(Error::Pin)?;
        let report = self.driver.tick(&self.inputs, sda);

        if let Some(conversion) = report.conversion {
            self.channels.record(conversion);
            self.watchdog.feed();
        } else if self.watchdog.tick(self.expecting()) {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "no conversion from {=u8:#x} in {} ticks",
                self.inputs.address,
                self.watchdog.budget()
            );
            return Err(Error::Timeout);
        }

        Ok(report)
    }

    /// Reset the bus master, keeping the configuration and samples
    ///
    /// A transaction in progress runs to its STOP first, so the peripheral
    /// is never left holding the data line. The configuration write is
    /// then repeated before the next read. A pass-through burst holds the
    /// reset off until the caller ends it with `last_read`.
    pub fn reset(&mut self) {
        self.reset_pending = true;
    }

    /// Check if a reset is waiting for the bus to go idle
    pub fn is_reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Check if conversions should be arriving
    fn expecting(&self) -> bool {
        let sequencer = self.driver.sequencer();
        match sequencer.mode() {
            SequencerMode::Autonomous => true,
            SequencerMode::PassThrough => {
                self.inputs.enable && self.inputs.mode == Mode::Read && sequencer.is_configured()
            }
        }
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn inputs(&self) -> &HostInputs {
        &self.inputs
    }

    pub fn watchdog(&self) -> &ConversionWatchdog {
        &self.watchdog
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Most recently completed conversion
    pub fn latest(&self) -> Option<Conversion> {
        self.driver.latest()
    }

    /// Latest 12-bit sample of a channel
    pub fn sample(&self, channel: Channel) -> Option<u16> {
        self.channels.sample(channel)
    }

    /// Reader for one channel
    pub fn channel(&self, channel: Channel) -> ChannelReader<'_> {
        self.channels.reader(channel)
    }

    /// Select the converted channels
    ///
    /// Resets the bus master so the new configuration byte is written once
    /// the current transaction has ended.
    pub fn set_channels(&mut self, channels: ChannelMask) -> Result<(), Error<E>> {
        let config = DriverConfig {
            channels,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        self.inputs.config = config.config_byte();
        self.reset();
        Ok(())
    }

    /// Request transactions (pass-through mode)
    pub fn set_enabled(&mut self, enable: bool) {
        self.inputs.enable = enable;
    }

    /// Transfer direction (pass-through mode)
    pub fn set_mode(&mut self, mode: Mode) {
        self.inputs.mode = mode;
    }

    /// End a read burst after the current pair (pass-through mode)
    pub fn set_last_read(&mut self, last_read: bool) {
        self.inputs.last_read = last_read;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;
    use quadsense_core::sim::ScriptedPeripheral;
    use quadsense_core::{BusConfig, BusLevels, BusState, Level, Line, SequencerConfig};

    /// One wire with a pull-up: low if either side pulls it low
    #[derive(Default)]
    struct Wire {
        master_low: Cell<bool>,
        device_low: Cell<bool>,
    }

    impl Wire {
        fn level(&self) -> Level {
            Level::from_bit(!(self.master_low.get() || self.device_low.get()))
        }
    }

    /// Open-drain pin on a shared wire
    struct MockPin<'a> {
        wire: &'a Wire,
    }

    impl ErrorType for MockPin<'_> {
        type Error = Infallible;
    }

    impl OutputPin for MockPin<'_> {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.wire.master_low.set(true);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.wire.master_low.set(false);
            Ok(())
        }
    }

    impl InputPin for MockPin<'_> {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.wire.level().is_high())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(self.wire.level().is_low())
        }
    }

    struct Bench<'a> {
        dev: Ad7991<MockPin<'a>, MockPin<'a>>,
        peripheral: ScriptedPeripheral,
        scl: &'a Wire,
        sda: &'a Wire,
    }

    impl<'a> Bench<'a> {
        fn new(
            config: &DriverConfig,
            peripheral: ScriptedPeripheral,
            scl: &'a Wire,
            sda: &'a Wire,
        ) -> Self {
            let dev = Ad7991::new(config, MockPin { wire: scl }, MockPin { wire: sda }).unwrap();
            Self {
                dev,
                peripheral,
                scl,
                sda,
            }
        }

        fn step(&mut self) -> Result<TickReport, Error<Infallible>> {
            self.sda
                .device_low
                .set(self.peripheral.lines().sda == Line::DrivenLow);
            let result = self.dev.poll();
            self.peripheral.tick(BusLevels {
                scl: self.scl.level(),
                sda: self.sda.level(),
            });
            result
        }

        /// Step `ticks` times, returning the number of timeouts
        fn run(&mut self, ticks: u32) -> u32 {
            let mut timeouts = 0;
            for _ in 0..ticks {
                match self.step() {
                    Ok(_) => {}
                    Err(Error::Timeout) => timeouts += 1,
                    Err(e) => panic!("unexpected {:?}", e),
                }
            }
            timeouts
        }
    }

    fn bus() -> BusConfig {
        BusConfig {
            reference_clock_hz: 1_000_000,
            bus_frequency_hz: 100_000,
        }
    }

    fn autonomous(channels: ChannelMask) -> DriverConfig {
        DriverConfig {
            bus: bus(),
            channels,
            sequencer: SequencerConfig::autonomous(1_000),
            ..DriverConfig::default()
        }
    }

    #[test]
    fn test_rejects_bad_config() {
        let (scl, sda) = (Wire::default(), Wire::default());
        let config = DriverConfig {
            address: 0x80,
            ..autonomous(ChannelMask::ALL)
        };
        let result = Ad7991::new(&config, MockPin { wire: &scl }, MockPin { wire: &sda });
        assert!(matches!(result, Err(Error::Config(ConfigError::InvalidAddress))));
    }

    #[test]
    fn test_starts_released() {
        let (scl, sda) = (Wire::default(), Wire::default());
        scl.master_low.set(true);
        sda.master_low.set(true);
        let _dev = Ad7991::new(
            &autonomous(ChannelMask::ALL),
            MockPin { wire: &scl },
            MockPin { wire: &sda },
        )
        .unwrap();
        assert_eq!(scl.level(), Level::High);
        assert_eq!(sda.level(), Level::High);
    }

    #[test]
    fn test_autonomous_fills_channel_table() {
        let (scl, sda) = (Wire::default(), Wire::default());
        let peripheral = ScriptedPeripheral::new(0x28).with_conversions(&[
            Conversion::new(0x0111),
            Conversion::new(0x1222),
            Conversion::new(0x2333),
            Conversion::new(0x3444),
        ]);
        let mut bench = Bench::new(&autonomous(ChannelMask::ALL), peripheral, &scl, &sda);

        assert_eq!(bench.run(5_000), 0);
        assert_eq!(bench.peripheral.config(), Some(0xF0));
        assert_eq!(bench.dev.sample(Channel::Vin0), Some(0x111));
        assert_eq!(bench.dev.sample(Channel::Vin1), Some(0x222));
        assert_eq!(bench.dev.sample(Channel::Vin2), Some(0x333));
        assert_eq!(bench.dev.sample(Channel::Vin3), Some(0x444));
        assert_eq!(bench.dev.latest(), Some(Conversion::new(0x3444)));
    }

    #[test]
    fn test_pass_through_burst() {
        let (scl, sda) = (Wire::default(), Wire::default());
        let peripheral = ScriptedPeripheral::new(0x28)
            .with_conversions(&[Conversion::new(0x0ABC), Conversion::new(0x1DEF)]);
        let config = DriverConfig {
            bus: bus(),
            channels: ChannelMask::only(Channel::Vin0).with(Channel::Vin1),
            sequencer: SequencerConfig::PASS_THROUGH,
            ..DriverConfig::default()
        };
        let mut bench = Bench::new(&config, peripheral, &scl, &sda);
        bench.dev.set_enabled(true);
        bench.dev.set_mode(Mode::Read);
        bench.dev.set_last_read(false);

        assert_eq!(bench.run(1_000), 0);
        assert_eq!(bench.peripheral.config(), Some(0x30));
        let mut vin1 = bench.dev.channel(Channel::Vin1);
        assert_eq!(crate::AdcReader::read(&mut vin1), Ok(0xDEF));
        assert_eq!(bench.dev.sample(Channel::Vin0), Some(0xABC));
    }

    #[test]
    fn test_timeout_reported_once() {
        let (scl, sda) = (Wire::default(), Wire::default());
        let peripheral = ScriptedPeripheral::new(0x28).silent();
        let mut bench = Bench::new(&autonomous(ChannelMask::ALL), peripheral, &scl, &sda);
        assert_eq!(bench.dev.watchdog().budget(), 1_300);

        assert_eq!(bench.run(5_000), 1);
        assert!(bench.dev.watchdog().is_expired());
        assert_eq!(bench.dev.latest(), None);
    }

    #[test]
    fn test_pass_through_idle_never_times_out() {
        let (scl, sda) = (Wire::default(), Wire::default());
        let config = DriverConfig {
            bus: bus(),
            sequencer: SequencerConfig::PASS_THROUGH,
            ..DriverConfig::default()
        };
        let mut bench = Bench::new(&config, ScriptedPeripheral::new(0x28), &scl, &sda);
        assert_eq!(bench.run(2_000), 0);
        assert_eq!(bench.dev.watchdog().elapsed(), 0);
    }

    #[test]
    fn test_set_channels_rewrites_config() {
        let (scl, sda) = (Wire::default(), Wire::default());
        let peripheral = ScriptedPeripheral::new(0x28);
        let mut bench = Bench::new(
            &autonomous(ChannelMask::only(Channel::Vin0)),
            peripheral,
            &scl,
            &sda,
        );
        bench.run(500);
        assert_eq!(bench.peripheral.config(), Some(0x10));

        assert_eq!(
            bench.dev.set_channels(ChannelMask(0x10)),
            Err(Error::Config(ConfigError::InvalidChannelMask))
        );
        assert_eq!(bench.dev.inputs().config, 0x10);

        bench.dev.set_channels(ChannelMask::ALL).unwrap();
        assert_eq!(bench.dev.inputs().config, 0xF0);
        bench.run(500);
        assert_eq!(bench.peripheral.config(), Some(0xF0));
    }

    #[test]
    fn test_set_channels_mid_read_waits_for_stop() {
        let (scl, sda) = (Wire::default(), Wire::default());
        let peripheral = ScriptedPeripheral::new(0x28).with_conversions(&[Conversion::new(0x0111)]);
        let mut bench = Bench::new(
            &autonomous(ChannelMask::only(Channel::Vin0)),
            peripheral,
            &scl,
            &sda,
        );

        // converter holding the data line low inside the high byte
        let mut ticks = 0;
        while !(bench.dev.driver().engine().state() == BusState::ReadByte1
            && bench.peripheral.lines().sda == Line::DrivenLow)
        {
            bench.step().unwrap();
            ticks += 1;
            assert!(ticks < 5_000);
        }

        bench.dev.set_channels(ChannelMask::ALL).unwrap();
        assert!(bench.dev.is_reset_pending());
        assert_eq!(bench.dev.driver().engine().state(), BusState::ReadByte1);

        assert_eq!(bench.run(20_000), 0);
        assert!(!bench.dev.is_reset_pending());
        assert_eq!(bench.peripheral.config(), Some(0xF0));
        assert!(!bench.dev.watchdog().is_expired());
        assert_eq!(bench.dev.sample(Channel::Vin0), Some(0x111));
    }
}
