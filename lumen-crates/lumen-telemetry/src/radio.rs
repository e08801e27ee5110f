/// Advertising interval units, 0.625 ms, in microseconds.
const INTERVAL_UNIT_US: u32 = 625;

/// Advertising parameters of the broadcast. Intervals are in 0.625 ms units.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BroadcastParams {
    pub interval_min: u16,
    pub interval_max: u16,
}

impl BroadcastParams {
    #[inline]
    pub const fn interval_min_us(&self) -> u32 {
        self.interval_min as u32 * INTERVAL_UNIT_US
    }

    #[inline]
    pub const fn interval_max_us(&self) -> u32 {
        self.interval_max as u32 * INTERVAL_UNIT_US
    }
}

impl Default for BroadcastParams {
    /// Advertise every 5 to 10 seconds.
    fn default() -> Self {
        Self {
            interval_min: 8000,
            interval_max: 16000,
        }
    }
}

/// The radio stack: a non-connectable, general discoverable broadcaster without scan response
/// data.
pub trait Radio {
    type Error;

    /// Bring up the radio.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Start broadcasting `record` as service data, optionally along with a device name.
    fn start_broadcast(
        &mut self,
        params: &BroadcastParams,
        record: &[u8],
        name: Option<&str>,
    ) -> Result<(), Self::Error>;

    /// Replace the service data of the running broadcast.
    fn update_broadcast(&mut self, record: &[u8]) -> Result<(), Self::Error>;
}

impl<T: Radio + ?Sized> Radio for &mut T {
    type Error = T::Error;

    #[inline]
    fn enable(&mut self) -> Result<(), Self::Error> {
        T::enable(self)
    }

    #[inline]
    fn start_broadcast(
        &mut self,
        params: &BroadcastParams,
        record: &[u8],
        name: Option<&str>,
    ) -> Result<(), Self::Error> {
        T::start_broadcast(self, params, record, name)
    }

    #[inline]
    fn update_broadcast(&mut self, record: &[u8]) -> Result<(), Self::Error> {
        T::update_broadcast(self, record)
    }
}
