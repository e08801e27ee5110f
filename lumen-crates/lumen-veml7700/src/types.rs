/// Mask of the gain bits in `ALS_CONF`.
pub(crate) const GAIN_MASK: u16 = 0b11 << 11;
/// Mask of the integration time bits in `ALS_CONF`.
pub(crate) const INTEGRATION_TIME_MASK: u16 = 0b1111 << 6;

/// Lux per count at gain x2 and 800 ms integration time, in microlux (datasheet table 1).
const BASE_RESOLUTION_MICROLUX: u32 = 3600;

/// Integration time of the ambient light channel.
///
/// Longer integration improves low light resolution, but also lengthens the settle delay
/// needed before the first reading after power on is valid.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IntegrationTime {
    /// 25 ms
    Ms25,
    /// 50 ms
    Ms50,
    /// 100 ms
    #[default]
    Ms100,
    /// 200 ms
    Ms200,
    /// 400 ms
    Ms400,
    /// 800 ms
    Ms800,
}

impl IntegrationTime {
    /// Integration time in milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u32 {
        match self {
            IntegrationTime::Ms25 => 25,
            IntegrationTime::Ms50 => 50,
            IntegrationTime::Ms100 => 100,
            IntegrationTime::Ms200 => 200,
            IntegrationTime::Ms400 => 400,
            IntegrationTime::Ms800 => 800,
        }
    }

    /// `ALS_IT` bits, already shifted into place.
    pub(crate) const fn bits(self) -> u16 {
        let bits: u16 = match self {
            IntegrationTime::Ms25 => 0b1100,
            IntegrationTime::Ms50 => 0b1000,
            IntegrationTime::Ms100 => 0b0000,
            IntegrationTime::Ms200 => 0b0001,
            IntegrationTime::Ms400 => 0b0010,
            IntegrationTime::Ms800 => 0b0011,
        };

        bits << 6
    }
}

/// Gain of the ambient light channel.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// Gain x1/8
    X1_8,
    /// Gain x1/4
    X1_4,
    /// Gain x1
    #[default]
    X1,
    /// Gain x2
    X2,
}

impl Gain {
    /// Gain in eighths, so x1/8 is 1 and x2 is 16.
    #[inline]
    pub const fn as_eighths(self) -> u32 {
        match self {
            Gain::X1_8 => 1,
            Gain::X1_4 => 2,
            Gain::X1 => 8,
            Gain::X2 => 16,
        }
    }

    /// `ALS_GAIN` bits, already shifted into place.
    pub(crate) const fn bits(self) -> u16 {
        let bits: u16 = match self {
            Gain::X1 => 0b00,
            Gain::X2 => 0b01,
            Gain::X1_8 => 0b10,
            Gain::X1_4 => 0b11,
        };

        bits << 11
    }
}

/// Sensor configuration applied by [`init`](crate::Veml7700::init()).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Integration time of the ambient light channel.
    pub integration_time: IntegrationTime,
    /// Gain of the ambient light channel.
    pub gain: Gain,
}

impl Config {
    /// Microlux represented by one count of the ambient light channel.
    ///
    /// Resolution scales inversely with both integration time and gain:
    /// `3600 µlx * (800 ms / IT) * (2 / gain)`.
    #[inline]
    pub const fn resolution_microlux(&self) -> u32 {
        BASE_RESOLUTION_MICROLUX * (800 / self.integration_time.as_millis()) * 16
            / self.gain.as_eighths()
    }
}

/// The raw channel counters read from the sensor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawMeasurement {
    /// Ambient light channel counts.
    pub als: u16,
    /// White channel counts.
    pub white: u16,
}

impl RawMeasurement {
    /// The ambient light counter hit its ceiling, the real illuminance is unknown.
    #[inline]
    pub const fn is_saturated(&self) -> bool {
        self.als == u16::MAX
    }
}

/// An illuminance measurement.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Illuminance(i64);

impl Illuminance {
    /// Create a new `Illuminance` from ambient light channel counts.
    #[inline]
    pub const fn from_counts(counts: u16, config: &Config) -> Self {
        Self(counts as i64 * config.resolution_microlux() as i64)
    }

    /// Return illuminance in microlux.
    #[inline]
    pub const fn as_microlux(&self) -> i64 {
        self.0
    }

    /// Return illuminance in lux.
    #[inline]
    pub const fn as_lux(&self) -> f32 {
        self.0 as f32 / 1_000_000.0
    }
}
