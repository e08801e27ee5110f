use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};
use lumen_bthome::{BatteryLevel, Illuminance10mLux, TelemetryRecord, encode_battery};
use lumen_fmt::{debug, error, info, warn};
use lumen_veml7700::{Error as SensorError, Veml7700};

use crate::{
    battery::{BatteryAdc, BatteryMonitor},
    config::TelemetryConfig,
    radio::Radio,
};

/// Errors which stop the beacon from starting. Nothing fails once the cycle loop runs.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError<SE, RE> {
    /// The light sensor could not be reached or configured.
    Sensor(SE),
    /// The radio could not be enabled, or the broadcast could not be started.
    Radio(RE),
}

/// Position of the scheduler within a telemetry cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CyclePhase {
    Idle,
    Activating,
    SamplingLux,
    SamplingBattery,
    Encoding,
    Publishing,
    Deactivating,
    Sleeping,
}

/// Values gathered while a cycle is in flight.
struct Cycle {
    battery: BatteryLevel,
    record: TelemetryRecord,
}

/// Runs the telemetry cycle: power the light sensor, sample light and battery, publish the
/// record, power down, sleep.
///
/// Failures within a cycle only degrade the published data. A failed light reading keeps
/// the previous illuminance, a failed battery reading publishes
/// [`BATTERY_UNKNOWN`](lumen_bthome::BATTERY_UNKNOWN).
pub struct Scheduler<I2C, A, R, D> {
    sensor: Veml7700<I2C>,
    battery: BatteryMonitor<A>,
    radio: R,
    delay: D,
    config: TelemetryConfig,
    lux: Illuminance10mLux,
    phase: CyclePhase,
}

impl<I2C, A, R, D> Scheduler<I2C, A, R, D>
where
    I2C: I2c<SevenBitAddress>,
    A: BatteryAdc,
    R: Radio,
    D: DelayNs,
{
    pub fn new(
        sensor: Veml7700<I2C>,
        battery: BatteryMonitor<A>,
        radio: R,
        delay: D,
        config: TelemetryConfig,
    ) -> Self {
        Self {
            sensor,
            battery,
            radio,
            delay,
            config,
            lux: Illuminance10mLux::default(),
            phase: CyclePhase::Idle,
        }
    }

    #[inline]
    pub const fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// The illuminance published by the latest cycle, carried over when a cycle fails to
    /// sample light.
    #[inline]
    pub const fn last_lux(&self) -> Illuminance10mLux {
        self.lux
    }

    #[inline]
    pub const fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    #[inline]
    pub const fn sensor(&self) -> &Veml7700<I2C> {
        &self.sensor
    }

    /// Initialize the light sensor, enable the radio and start broadcasting an empty record.
    ///
    /// Must succeed before [`run_cycle`](Self::run_cycle()) is used.
    pub fn start(&mut self) -> Result<(), InitError<SensorError<I2C::Error>, R::Error>> {
        let sensor_config = self.sensor.init().map_err(InitError::Sensor)?;

        info!("Light sensor ready: {:?}", sensor_config);

        self.radio.enable().map_err(InitError::Radio)?;

        let record = TelemetryRecord::new(self.lux, encode_battery(BatteryLevel::Percent(0)));

        self.radio
            .start_broadcast(&self.config.broadcast, &record.to_bytes(), self.config.name)
            .map_err(InitError::Radio)?;

        info!("Broadcast started");

        Ok(())
    }

    /// Run one full cycle, ending with the period sleep, and return the published record.
    pub fn run_cycle(&mut self) -> TelemetryRecord {
        let mut cycle = Cycle {
            battery: BatteryLevel::Unknown,
            record: TelemetryRecord::default(),
        };

        self.phase = CyclePhase::Activating;

        while self.phase != CyclePhase::Idle {
            self.phase = self.step(&mut cycle);
        }

        cycle.record
    }

    /// Run cycles forever.
    pub fn run(mut self) -> ! {
        loop {
            self.run_cycle();
        }
    }

    /// Execute the current phase and return the next one.
    fn step(&mut self, cycle: &mut Cycle) -> CyclePhase {
        match self.phase {
            CyclePhase::Idle => CyclePhase::Activating,
            CyclePhase::Activating => match self.sensor.activate(&mut self.delay) {
                Ok(()) => CyclePhase::SamplingLux,
                Err(_) => {
                    warn!("Light sensor activation failed, keeping previous illuminance");
                    CyclePhase::SamplingBattery
                }
            },
            CyclePhase::SamplingLux => {
                match self.sensor.sample_lux() {
                    Ok(microlux) => self.lux = Illuminance10mLux::from_microlux(microlux),
                    Err(SensorError::FetchFailed(_)) => {
                        warn!("Light sensor fetch failed, keeping previous illuminance");
                    }
                    Err(_) => {
                        warn!("Light sensor read failed, keeping previous illuminance");
                    }
                }

                CyclePhase::SamplingBattery
            }
            CyclePhase::SamplingBattery => {
                cycle.battery = self.battery.read_level();

                if cycle.battery == BatteryLevel::Unknown {
                    warn!("Battery read failed, reporting unknown level");
                }

                CyclePhase::Encoding
            }
            CyclePhase::Encoding => {
                cycle.record = TelemetryRecord::new(self.lux, encode_battery(cycle.battery));
                CyclePhase::Publishing
            }
            CyclePhase::Publishing => {
                let payload = cycle.record.to_bytes();

                if self.radio.update_broadcast(&payload).is_err() {
                    error!("Broadcast update failed, retrying next cycle");
                } else {
                    debug!("Published {:#x}", payload);
                }

                CyclePhase::Deactivating
            }
            CyclePhase::Deactivating => {
                if self.sensor.deactivate().is_err() {
                    warn!("Light sensor shutdown failed");
                }

                CyclePhase::Sleeping
            }
            CyclePhase::Sleeping => {
                self.delay.delay_ms(self.config.period_ms);
                CyclePhase::Idle
            }
        }
    }
}
