use lumen_battery::estimate_percent;
use lumen_bthome::BatteryLevel;

/// Number of raw samples averaged into one battery reading.
pub const BATTERY_SAMPLES: u8 = 4;

/// Programmable gain of the ADC input stage.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcGain {
    #[default]
    Gain1_6,
    Gain1_5,
    Gain1_4,
    Gain1_3,
    Gain1_2,
    Gain1,
    Gain2,
    Gain4,
}

/// How the battery voltage is sampled and scaled back to millivolts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcChannel {
    /// Index of the ADC input, as configured on the platform ADC.
    pub input: u8,
    pub resolution_bits: u8,
    pub gain: AdcGain,
    /// Full scale voltage of a conversion with the selected gain and reference.
    pub reference_mv: u32,
    /// Ratio of the external voltage divider in front of the input, 1 when unused.
    pub divider: u32,
    /// Raw samples averaged per reading. 0 is treated as 1.
    pub samples: u8,
}

impl Default for AdcChannel {
    /// VDD measured directly: 12 bit, gain 1/6 against the 0.6 V internal reference.
    fn default() -> Self {
        Self {
            input: 0,
            resolution_bits: 12,
            gain: AdcGain::Gain1_6,
            reference_mv: 3600,
            divider: 1,
            samples: BATTERY_SAMPLES,
        }
    }
}

/// The analog to digital conversion primitive.
pub trait BatteryAdc {
    type Error;

    /// Take one raw sample of `channel`.
    fn read_raw(&mut self, channel: &AdcChannel) -> Result<i16, Self::Error>;
}

impl<T: BatteryAdc + ?Sized> BatteryAdc for &mut T {
    type Error = T::Error;

    #[inline]
    fn read_raw(&mut self, channel: &AdcChannel) -> Result<i16, Self::Error> {
        T::read_raw(self, channel)
    }
}

/// Scale a raw sample to millivolts at the divider input. Negative samples, which the ADC
/// reports for inputs slightly below ground, read as 0 mV, as does any sample of a channel
/// without a usable resolution.
pub const fn raw_to_millivolts(raw: i16, channel: &AdcChannel) -> u32 {
    let raw = if raw < 0 { 0 } else { raw as u64 };
    let full_scale = match 1u64.checked_shl(channel.resolution_bits as u32) {
        Some(steps) => steps - 1,
        None => 0,
    };

    if full_scale == 0 {
        return 0;
    }

    (raw * channel.reference_mv as u64 * channel.divider as u64 / full_scale) as u32
}

/// Reads the battery voltage through a [`BatteryAdc`].
pub struct BatteryMonitor<A> {
    adc: A,
    channel: AdcChannel,
}

impl<A: BatteryAdc> BatteryMonitor<A> {
    pub const fn new(adc: A, channel: AdcChannel) -> Self {
        Self { adc, channel }
    }

    #[inline]
    pub const fn channel(&self) -> &AdcChannel {
        &self.channel
    }

    /// Sample the battery and return the average in millivolts. Any failed sample fails the
    /// whole reading.
    pub fn read_millivolts(&mut self) -> Result<u32, A::Error> {
        let samples = self.channel.samples.max(1);
        let mut total = 0u32;

        for _ in 0..samples {
            let raw = self.adc.read_raw(&self.channel)?;
            total += raw_to_millivolts(raw, &self.channel);
        }

        Ok(total / u32::from(samples))
    }

    /// Sample the battery and estimate its charge, or [`BatteryLevel::Unknown`] if it could not
    /// be read.
    pub fn read_level(&mut self) -> BatteryLevel {
        match self.read_millivolts() {
            Ok(mv) => BatteryLevel::Percent(estimate_percent(mv)),
            Err(_) => BatteryLevel::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays raw samples in order, failing once they run out.
    struct ReplayAdc<const N: usize> {
        samples: [i16; N],
        next: usize,
    }

    impl<const N: usize> ReplayAdc<N> {
        fn new(samples: [i16; N]) -> Self {
            Self { samples, next: 0 }
        }
    }

    impl<const N: usize> BatteryAdc for ReplayAdc<N> {
        type Error = ();

        fn read_raw(&mut self, _channel: &AdcChannel) -> Result<i16, ()> {
            let sample = self.samples.get(self.next).copied().ok_or(())?;
            self.next += 1;
            Ok(sample)
        }
    }

    #[test]
    fn raw_conversion() {
        let channel = AdcChannel::default();

        assert_eq!(raw_to_millivolts(0, &channel), 0);
        assert_eq!(raw_to_millivolts(4095, &channel), 3600);
        assert_eq!(raw_to_millivolts(3527, &channel), 3100);
        assert_eq!(raw_to_millivolts(-12, &channel), 0);
    }

    #[test]
    fn raw_conversion_with_divider() {
        let channel = AdcChannel {
            resolution_bits: 10,
            reference_mv: 600,
            divider: 6,
            ..AdcChannel::default()
        };

        // 512 * 600 * 6 / 1023
        assert_eq!(raw_to_millivolts(512, &channel), 1801);
        assert_eq!(raw_to_millivolts(1023, &channel), 3600);
    }

    #[test]
    fn raw_conversion_without_resolution() {
        for resolution_bits in [0, 64, u8::MAX] {
            let channel = AdcChannel {
                resolution_bits,
                ..AdcChannel::default()
            };

            assert_eq!(raw_to_millivolts(4095, &channel), 0);
        }
    }

    #[test]
    fn samples_are_averaged() {
        let mut monitor = BatteryMonitor::new(ReplayAdc::new([4095, 0, 4095, 0]), AdcChannel::default());

        assert_eq!(monitor.read_millivolts(), Ok(1800));
    }

    #[test]
    fn single_sample() {
        let channel = AdcChannel {
            samples: 1,
            ..AdcChannel::default()
        };
        let mut monitor = BatteryMonitor::new(ReplayAdc::new([3527]), channel);

        assert_eq!(monitor.read_millivolts(), Ok(3100));
        assert_eq!(monitor.read_millivolts(), Err(()));
    }

    #[test]
    fn zero_samples_reads_once() {
        let channel = AdcChannel {
            samples: 0,
            ..AdcChannel::default()
        };
        let mut monitor = BatteryMonitor::new(ReplayAdc::new([4095]), channel);

        assert_eq!(monitor.read_millivolts(), Ok(3600));
    }

    #[test]
    fn failed_sample_fails_reading() {
        let mut monitor = BatteryMonitor::new(ReplayAdc::new([4095, 4095]), AdcChannel::default());

        assert_eq!(monitor.read_millivolts(), Err(()));
    }

    #[test]
    fn battery_level() {
        let mut monitor =
            BatteryMonitor::new(ReplayAdc::new([3527, 3527, 3527, 3527]), AdcChannel::default());
        assert_eq!(monitor.read_level(), BatteryLevel::Percent(100));
        assert_eq!(monitor.read_level(), BatteryLevel::Unknown);
    }
}
