use lumen_telemetry::{AdcChannel, BroadcastParams, TELEMETRY_PERIOD_MS, TelemetryConfig};
use lumen_veml7700::{Config, Gain, IntegrationTime};
use trouble_host::prelude::TxPower;

pub const LUMEN_BLE_TX_POWER: TxPower = TxPower::ZerodBm;
/// Controller memory for a single advertising set.
pub const LUMEN_SDC_MEM: usize = 3312;

pub static LUMEN_NAME: &str = "light_sensor_proki";

pub const LUMEN_SENSOR_CONFIG: Config = Config {
    integration_time: IntegrationTime::Ms100,
    gain: Gain::X1,
};

pub fn telemetry_config() -> TelemetryConfig {
    TelemetryConfig {
        period_ms: TELEMETRY_PERIOD_MS,
        broadcast: BroadcastParams::default(),
        name: Some(LUMEN_NAME),
    }
}

/// VDD sampled directly, no divider on the board.
pub fn battery_channel() -> AdcChannel {
    AdcChannel::default()
}
