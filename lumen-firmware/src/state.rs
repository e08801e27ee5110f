use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use heapless::Vec;
use lumen_telemetry::BroadcastParams;

/// Size of a legacy advertising payload.
pub const ADV_FRAME_LEN: usize = 31;

/// A complete advertising frame, along with the parameters to broadcast it with.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Broadcast {
    pub params: BroadcastParams,
    pub frame: Vec<u8, ADV_FRAME_LEN>,
}

/// Raised once by the BLE task, `false` if the host stack failed to come up.
pub static RADIO_READY: Signal<CriticalSectionRawMutex, bool> = Signal::new();
/// The frame to advertise. Only the latest one matters.
pub static BROADCAST: Signal<CriticalSectionRawMutex, Broadcast> = Signal::new();
