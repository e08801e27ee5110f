use embassy_futures::block_on;
use embassy_nrf::{
    peripherals,
    saadc::{ChannelConfig, Config, Gain, Reference, Resolution, Saadc, VddInput},
};
use lumen_telemetry::{AdcChannel, AdcGain, BatteryAdc};

use crate::Irqs;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// The SAADC cannot sample the requested channel setup.
    UnsupportedChannel,
}

fn resolution(bits: u8) -> Result<Resolution, AdcError> {
    match bits {
        8 => Ok(Resolution::_8BIT),
        10 => Ok(Resolution::_10BIT),
        12 => Ok(Resolution::_12BIT),
        14 => Ok(Resolution::_14BIT),
        _ => Err(AdcError::UnsupportedChannel),
    }
}

fn gain(gain: AdcGain) -> Gain {
    match gain {
        AdcGain::Gain1_6 => Gain::GAIN1_6,
        AdcGain::Gain1_5 => Gain::GAIN1_5,
        AdcGain::Gain1_4 => Gain::GAIN1_4,
        AdcGain::Gain1_3 => Gain::GAIN1_3,
        AdcGain::Gain1_2 => Gain::GAIN1_2,
        AdcGain::Gain1 => Gain::GAIN1,
        AdcGain::Gain2 => Gain::GAIN2,
        AdcGain::Gain4 => Gain::GAIN4,
    }
}

/// Samples the supply voltage on the SAADC.
pub struct VddAdc {
    saadc: Saadc<'static, 1>,
    input: u8,
}

impl VddAdc {
    pub fn new(saadc: peripherals::SAADC, channel: &AdcChannel) -> Result<Self, AdcError> {
        let mut vdd_config = ChannelConfig::single_ended(VddInput);
        vdd_config.gain = gain(channel.gain);
        vdd_config.reference = Reference::INTERNAL;

        let mut saadc_config = Config::default();
        saadc_config.resolution = resolution(channel.resolution_bits)?;

        let saadc = Saadc::new(saadc, Irqs, saadc_config, [vdd_config]);

        block_on(saadc.calibrate());

        Ok(Self {
            saadc,
            input: channel.input,
        })
    }
}

impl BatteryAdc for VddAdc {
    type Error = AdcError;

    fn read_raw(&mut self, channel: &AdcChannel) -> Result<i16, AdcError> {
        if channel.input != self.input {
            return Err(AdcError::UnsupportedChannel);
        }

        let mut buf = [0; 1];

        block_on(self.saadc.sample(&mut buf));

        Ok(buf[0])
    }
}
