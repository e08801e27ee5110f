//! The telemetry cycle of the lumen beacon: duty-cycle the ambient light sensor, sample the
//! battery, and republish both as BTHome service data, once per period.
//!
//! The platform provides the collaborators: an [`embedded_hal::i2c::I2c`] bus for the
//! sensor, a [`BatteryAdc`], a [`Radio`] and a blocking [`embedded_hal::delay::DelayNs`].
#![no_std]

mod battery;
mod config;
mod radio;
mod scheduler;

pub use battery::{
    AdcChannel, AdcGain, BATTERY_SAMPLES, BatteryAdc, BatteryMonitor, raw_to_millivolts,
};
pub use config::{TELEMETRY_PERIOD_MS, TelemetryConfig};
pub use radio::{BroadcastParams, Radio};
pub use scheduler::{CyclePhase, InitError, Scheduler};
