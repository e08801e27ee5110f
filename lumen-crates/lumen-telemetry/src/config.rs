use crate::radio::BroadcastParams;

/// Time between the end of one telemetry cycle and the start of the next, in milliseconds.
pub const TELEMETRY_PERIOD_MS: u32 = 5000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryConfig {
    /// Sleep after each cycle. Sampling time adds to it, so cycles start slightly further
    /// apart than this.
    pub period_ms: u32,
    pub broadcast: BroadcastParams,
    /// Local name advertised next to the telemetry.
    pub name: Option<&'static str>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            period_ms: TELEMETRY_PERIOD_MS,
            broadcast: BroadcastParams::default(),
            name: None,
        }
    }
}
