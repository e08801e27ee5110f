//! BTHome v2 telemetry payload for the lumen beacon: the fixed 9 byte [`TelemetryRecord`]
//! carried as 16-bit service data, and the [`BtHomeAd`] legacy advertising frame builder.
#![no_std]

use heapless::Vec;

const BR_EDR_NOT_SUPPORTED: u8 = 4;
const LE_GENERAL_DISCOVERABLE: u8 = 2;

const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_SHORTENED_LOCAL_NAME: u8 = 0x08;
const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
const AD_TYPE_SERVICE_DATA_UUID16: u8 = 0x16;

pub const BTHOME_UUID16: u16 = 0xFCD2;

/// BTHome v2, unencrypted, regular (not trigger based) advertisements.
pub const DEVICE_INFO: u8 = 0x40;
/// Object id of a 3 byte illuminance measurement with 0.01 lux resolution.
pub const ILLUMINANCE_ID: u8 = 0x05;
/// Object id of a 1 byte battery percentage.
pub const BATTERY_ID: u8 = 0x01;
/// Battery byte broadcast when the battery could not be measured.
pub const BATTERY_UNKNOWN: u8 = 0xFF;

/// Largest centilux value representable in the 3 byte illuminance field.
pub const CENTILUX_MAX: u32 = 0x00FF_FFFF;

/// Size of an encoded [`TelemetryRecord`].
pub const RECORD_LEN: usize = 9;

/// Converts microlux to the little endian centilux field, rounding half up and clamping the
/// result to `clamp_max`. Negative readings are floored to zero.
///
/// ```
/// use lumen_bthome::encode_lux_clamped;
///
/// assert_eq!(encode_lux_clamped(1_234_567, 100), [100, 0, 0]);
/// ```
pub const fn encode_lux_clamped(microlux: i64, clamp_max: u32) -> [u8; 3] {
    let microlux = if microlux < 0 { 0 } else { microlux };
    let centilux = microlux.saturating_add(5_000) / 10_000;
    let max = if clamp_max > CENTILUX_MAX {
        CENTILUX_MAX
    } else {
        clamp_max
    };

    let centilux = if centilux > max as i64 {
        max
    } else {
        centilux as u32
    };

    let [lo, mid, hi, _] = centilux.to_le_bytes();

    [lo, mid, hi]
}

/// Converts microlux to the little endian centilux field, clamped to [`CENTILUX_MAX`].
///
/// ```
/// use lumen_bthome::encode_lux;
///
/// assert_eq!(encode_lux(1_234_567), [0x7B, 0x00, 0x00]);
/// assert_eq!(encode_lux(-1), [0, 0, 0]);
/// ```
#[inline]
pub const fn encode_lux(microlux: i64) -> [u8; 3] {
    encode_lux_clamped(microlux, CENTILUX_MAX)
}

/// A battery level as broadcast: a percentage, or unknown after a failed reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryLevel {
    /// Battery charge in percent, `0..=100`.
    Percent(u8),
    /// The battery voltage could not be read.
    Unknown,
}

/// Encodes a battery level into its payload byte.
///
/// Percentages pass through unchanged; callers only construct `0..=100`.
#[inline]
pub const fn encode_battery(level: BatteryLevel) -> u8 {
    match level {
        BatteryLevel::Percent(pct) => pct,
        BatteryLevel::Unknown => BATTERY_UNKNOWN,
    }
}

/// An encoded illuminance measurement in 0.01 lux, little endian 24 bit.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Illuminance10mLux([u8; 3]);

impl Illuminance10mLux {
    /// Encodes a microlux reading.
    #[inline]
    pub const fn from_microlux(microlux: i64) -> Self {
        Self(encode_lux(microlux))
    }

    #[inline]
    pub const fn as_bytes(&self) -> [u8; 3] {
        self.0
    }

    /// The encoded value in centilux.
    #[inline]
    pub const fn as_centilux(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], 0])
    }
}

impl From<[u8; 3]> for Illuminance10mLux {
    fn from(value: [u8; 3]) -> Self {
        Self(value)
    }
}

/// The service data broadcast by the beacon.
///
/// | bytes | content                                 |
/// |-------|-----------------------------------------|
/// | 0..2  | [`BTHOME_UUID16`], little endian        |
/// | 2     | [`DEVICE_INFO`]                         |
/// | 3     | [`ILLUMINANCE_ID`]                      |
/// | 4..7  | illuminance, centilux, little endian    |
/// | 7     | [`BATTERY_ID`]                          |
/// | 8     | battery percent or [`BATTERY_UNKNOWN`]  |
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    lux: Illuminance10mLux,
    battery: u8,
}

impl TelemetryRecord {
    /// Assembles a record around the constant header fields.
    #[inline]
    pub const fn new(lux: Illuminance10mLux, battery: u8) -> Self {
        Self { lux, battery }
    }

    #[inline]
    pub const fn lux(&self) -> Illuminance10mLux {
        self.lux
    }

    #[inline]
    pub const fn battery(&self) -> u8 {
        self.battery
    }

    pub const fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let [uuid_lo, uuid_hi] = BTHOME_UUID16.to_le_bytes();
        let [lux_lo, lux_mid, lux_hi] = self.lux.as_bytes();

        [
            uuid_lo,
            uuid_hi,
            DEVICE_INFO,
            ILLUMINANCE_ID,
            lux_lo,
            lux_mid,
            lux_hi,
            BATTERY_ID,
            self.battery,
        ]
    }
}

impl Default for TelemetryRecord {
    #[inline]
    fn default() -> Self {
        Self::new(Illuminance10mLux::default(), 0)
    }
}

/// A legacy advertising frame: flags, then service data and an optional local name.
pub struct BtHomeAd<const N: usize> {
    buffer: Vec<u8, N>,
}

impl<const N: usize> BtHomeAd<N> {
    /// Appends `payload` as a 16-bit service data structure. The payload must already start
    /// with the service UUID, as an encoded [`TelemetryRecord`] does.
    #[inline]
    pub fn add_service_data(&mut self, payload: &[u8]) -> &mut Self {
        if self.remaining() >= payload.len() + 2 {
            self.buffer
                .extend([(payload.len() + 1) as u8, AD_TYPE_SERVICE_DATA_UUID16]);
            self.buffer.extend_from_slice(payload).ok();
        }

        self
    }

    /// Appends the device name. When the whole name does not fit, as much as fits is added as
    /// a shortened local name instead.
    #[inline]
    pub fn add_local_name(&mut self, name: &str) -> &mut Self {
        let available = self.remaining().saturating_sub(2);

        if available == 0 || name.is_empty() {
            return self;
        }

        let (name, ad_type) = if name.len() <= available {
            (name.as_bytes(), AD_TYPE_COMPLETE_LOCAL_NAME)
        } else {
            (&name.as_bytes()[..available], AD_TYPE_SHORTENED_LOCAL_NAME)
        };

        self.buffer.extend([(name.len() + 1) as u8, ad_type]);
        self.buffer.extend_from_slice(name).ok();
        self
    }

    #[inline]
    pub fn encode(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    fn remaining(&self) -> usize {
        N - self.buffer.len()
    }
}

impl<const N: usize> Default for BtHomeAd<N> {
    #[inline]
    fn default() -> Self {
        let buffer =
            Vec::from_iter([0x02, AD_TYPE_FLAGS, LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED]);

        Self { buffer }
    }
}
