//! # Introduction
//!
//! This is a platform agnostic Rust driver for the Vishay VEML7700 ambient light sensor, based
//! on the [`embedded-hal`](https://github.com/rust-embedded/embedded-hal) traits, built around
//! duty-cycled operation: the sensor is kept in shutdown between samples and only powered for
//! as long as it takes to get one trustworthy reading.
//!
//! ## Power States
//!
//! The driver tracks the sensor as [`PowerState::Off`], [`PowerState::Warming`] or
//! [`PowerState::Active`]. Power is controlled through the shutdown bit of the `ALS_CONF`
//! register, whose last written value is cached in the driver. A failed register write leaves
//! both the cache and the power state untouched.
//!
//! After the shutdown bit is cleared the sensor needs 2.5 ms before it is electrically ready,
//! and then a full integration window (plus margin) before the first conversion is valid.
//! [`activate`](crate::Veml7700::activate()) blocks for both.
//!
//! ## Usage
//!
//! ### Setup
//!
//! Instantiate a new driver instance using a [blocking I²C HAL
//! implementation](https://docs.rs/embedded-hal/1.0.0/embedded_hal/i2c/index.html), then
//! initialize it once. For example, using `linux-embedded-hal`:
//!
//! ```no_run
//! use linux_embedded_hal::I2cdev;
//! use lumen_veml7700::Veml7700;
//!
//! let dev = I2cdev::new("/dev/i2c-1").unwrap();
//! let mut als = Veml7700::new(dev);
//! let config = als.init().unwrap();
//! ```
//!
//! ### Measurements
//!
//! ```no_run
//! use linux_embedded_hal::{Delay, I2cdev};
//! use lumen_veml7700::{Config, Gain, IntegrationTime, Veml7700};
//!
//! let config = Config {
//!     integration_time: IntegrationTime::Ms200,
//!     gain: Gain::X1_4,
//! };
//! let mut als = Veml7700::with_config(I2cdev::new("/dev/i2c-1").unwrap(), config);
//! let mut delay = Delay;
//!
//! als.init().unwrap();
//! als.activate(&mut delay).unwrap();
//! let microlux = als.sample_lux().unwrap();
//! als.deactivate().unwrap();
//!
//! println!("Illuminance: {} lx", microlux as f32 / 1_000_000.0);
//! ```
#![deny(unsafe_code, missing_docs)]
#![no_std]

mod types;

use embedded_hal::{
    delay::DelayNs,
    i2c::{self, I2c, SevenBitAddress},
};
use lumen_fmt::debug;

use types::{GAIN_MASK, INTEGRATION_TIME_MASK};
pub use types::{Config, Gain, Illuminance, IntegrationTime, RawMeasurement};

/// Shutdown bit of `ALS_CONF`.
const ALS_SD: u16 = 0x0001;
/// `ALS_CONF` after power on: everything default, sensor shut down.
const POWER_ON_CONF: u16 = ALS_SD;
/// Low byte of the `ID` register.
const DEVICE_CODE: u8 = 0x81;

/// Minimum delay after clearing the shutdown bit, in microseconds.
const STARTUP_DELAY_US: u32 = 2_500;
/// Margin added on top of the integration time before the first reading, in microseconds.
const SETTLE_MARGIN_US: u32 = 50_000;

/// Logical power state of the sensor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Shut down.
    Off,
    /// Powered on, first conversion not yet valid.
    Warming,
    /// Powered on and settled, samples are valid.
    Active,
}

/// All possible errors in this crate
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: i2c::Error> {
    /// The sensor did not answer, or answered with an unexpected device code.
    NotReady,
    /// Applying the configuration, or reading it back, failed.
    ConfigFailed(E),
    /// Writing the power control register failed.
    WriteFailed(E),
    /// Reading the channel counters failed.
    FetchFailed(E),
    /// The illuminance channel could not be converted, as the counter was saturated.
    ReadFailed,
    /// A sample was requested while the sensor was not [`PowerState::Active`].
    NotActive,
}

/// Registers of the sensor.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Register {
    /// Configuration and power control.
    AlsConf,
    /// Ambient light channel output.
    Als,
    /// White channel output.
    White,
    /// Device identifier.
    Id,
}

impl Register {
    const fn address(self) -> u8 {
        match self {
            Register::AlsConf => 0x00,
            Register::Als => 0x04,
            Register::White => 0x05,
            Register::Id => 0x07,
        }
    }
}

/// Driver for the VEML7700 sensor.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Veml7700<I2C> {
    /// The concrete I²C device implementation.
    i2c: I2C,
    /// The I²C device address.
    address: u8,
    /// The configuration applied on init.
    config: Config,
    /// Last known value of `ALS_CONF`.
    conf: u16,
    /// Logical power state.
    state: PowerState,
}

/// General functions.
impl<I2C> Veml7700<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    /// Create a new instance of the driver with the default configuration.
    #[inline]
    pub const fn new(i2c: I2C) -> Self {
        Self::with_config(
            i2c,
            Config {
                integration_time: IntegrationTime::Ms100,
                gain: Gain::X1,
            },
        )
    }

    /// Create a new instance of the driver, applying `config` on init.
    #[inline]
    pub const fn with_config(i2c: I2C, config: Config) -> Self {
        Self {
            i2c,
            address: 0x10,
            config,
            conf: POWER_ON_CONF,
            state: PowerState::Off,
        }
    }

    /// Destroy driver instance, return I²C bus instance.
    pub fn destroy(self) -> I2C {
        self.i2c
    }

    /// The current logical power state.
    #[inline]
    pub const fn state(&self) -> PowerState {
        self.state
    }

    /// The sensor configuration.
    #[inline]
    pub const fn config(&self) -> Config {
        self.config
    }

    /// The cached value of the `ALS_CONF` register.
    #[inline]
    pub const fn cached_register(&self) -> u16 {
        self.conf
    }

    /// Delay required after power on before the sensor is electrically ready, in microseconds.
    #[inline(always)]
    pub const fn startup_duration(&self) -> u32 {
        STARTUP_DELAY_US
    }

    /// Delay required after startup before the first reading is valid, in microseconds: one
    /// integration window plus margin.
    #[inline(always)]
    pub const fn settle_duration(&self) -> u32 {
        self.config.integration_time.as_millis() * 1000 + SETTLE_MARGIN_US
    }

    /// Write a 16-bit register, transmitted as `[register, low byte, high byte]`.
    fn write_register(&mut self, register: Register, value: u16) -> Result<(), I2C::Error> {
        let [lo, hi] = value.to_le_bytes();
        self.i2c.write(self.address, &[register.address(), lo, hi])
    }

    /// Read a 16-bit little endian register.
    fn read_register(&mut self, register: Register) -> Result<u16, I2C::Error> {
        let mut buf = [0; 2];
        self.i2c
            .write_read(self.address, &[register.address()], &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Return the raw `ID` register. The low byte is the device code, `0x81`.
    pub fn raw_id_register(&mut self) -> Result<u16, Error<I2C::Error>> {
        self.read_register(Register::Id)
            .map_err(|_| Error::NotReady)
    }

    /// Check the sensor answers with the VEML7700 device code, apply the configuration, then
    /// read back `ALS_CONF` into the register cache.
    ///
    /// Must be called once before the sensor is used. The power state follows the shutdown
    /// bit read back: [`PowerState::Off`] normally, [`PowerState::Warming`] if the sensor
    /// reports itself powered.
    pub fn init(&mut self) -> Result<Config, Error<I2C::Error>> {
        let [code, _] = self.raw_id_register()?.to_le_bytes();

        if code != DEVICE_CODE {
            return Err(Error::NotReady);
        }

        self.set_gain(self.config.gain)?;
        self.set_integration_time(self.config.integration_time)?;

        self.conf = self
            .read_register(Register::AlsConf)
            .map_err(Error::ConfigFailed)?;
        // A powered sensor has not been timed for settling, so it is only warming up.
        self.state = if self.conf & ALS_SD == 0 {
            PowerState::Warming
        } else {
            PowerState::Off
        };

        debug!("VEML7700 configured, ALS_CONF {:#x}", self.conf);

        Ok(self.config)
    }

    /// Set the gain of the ambient light channel.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<I2C::Error>> {
        let conf = (self.conf & !GAIN_MASK) | gain.bits();

        self.write_register(Register::AlsConf, conf)
            .map_err(Error::ConfigFailed)?;

        self.conf = conf;
        self.config.gain = gain;

        Ok(())
    }

    /// Set the integration time of the ambient light channel. This also changes the
    /// [`settle_duration`](Self::settle_duration()).
    pub fn set_integration_time(
        &mut self,
        integration_time: IntegrationTime,
    ) -> Result<(), Error<I2C::Error>> {
        let conf = (self.conf & !INTEGRATION_TIME_MASK) | integration_time.bits();

        self.write_register(Register::AlsConf, conf)
            .map_err(Error::ConfigFailed)?;

        self.conf = conf;
        self.config.integration_time = integration_time;

        Ok(())
    }
}

/// Power management.
impl<I2C> Veml7700<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    /// Power the sensor on and wait until its first reading is valid. (blocking)
    ///
    /// Blocks for [`startup_duration`](Self::startup_duration()), then for
    /// [`settle_duration`](Self::settle_duration()). If the register write fails, nothing is
    /// waited for and the power state is unchanged.
    pub fn activate(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<I2C::Error>> {
        let conf = self.conf & !ALS_SD;

        self.write_register(Register::AlsConf, conf)
            .map_err(Error::WriteFailed)?;

        self.conf = conf;
        self.state = PowerState::Warming;

        delay.delay_us(self.startup_duration());
        delay.delay_us(self.settle_duration());

        self.state = PowerState::Active;

        Ok(())
    }

    /// Shut the sensor down.
    ///
    /// On failure the cache keeps the powered value, so a later
    /// [`activate`](Self::activate()) writes from a consistent register value.
    pub fn deactivate(&mut self) -> Result<(), Error<I2C::Error>> {
        let conf = self.conf | ALS_SD;

        self.write_register(Register::AlsConf, conf)
            .map_err(Error::WriteFailed)?;

        self.conf = conf;
        self.state = PowerState::Off;

        Ok(())
    }
}

/// Measurements.
impl<I2C> Veml7700<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    /// Read both channel counters.
    pub fn fetch(&mut self) -> Result<RawMeasurement, Error<I2C::Error>> {
        let als = self
            .read_register(Register::Als)
            .map_err(Error::FetchFailed)?;
        let white = self
            .read_register(Register::White)
            .map_err(Error::FetchFailed)?;

        Ok(RawMeasurement { als, white })
    }

    /// Convert fetched counters into an illuminance with the current configuration.
    pub fn illuminance(&self, raw: RawMeasurement) -> Result<Illuminance, Error<I2C::Error>> {
        if raw.is_saturated() {
            return Err(Error::ReadFailed);
        }

        Ok(Illuminance::from_counts(raw.als, &self.config))
    }

    /// Fetch one sample and return the illuminance in microlux.
    ///
    /// Only valid while the sensor is [`PowerState::Active`], otherwise returns
    /// [`Error::NotActive`] without touching the bus.
    pub fn sample_lux(&mut self) -> Result<i64, Error<I2C::Error>> {
        if self.state != PowerState::Active {
            return Err(Error::NotActive);
        }

        let raw = self.fetch()?;

        Ok(self.illuminance(raw)?.as_microlux())
    }
}
