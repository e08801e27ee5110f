use embassy_futures::block_on;
use heapless::{String, Vec};
use lumen_bthome::BtHomeAd;
use lumen_fmt::info;
use lumen_telemetry::{BroadcastParams, Radio};

use crate::state::{ADV_FRAME_LEN, BROADCAST, Broadcast, RADIO_READY};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// The BLE host stack failed to start.
    Unavailable,
    /// An update was published before the broadcast was started.
    NotBroadcasting,
    FrameOverflow,
}

struct Session {
    params: BroadcastParams,
    name: String<ADV_FRAME_LEN>,
}

/// Hands advertising frames over to the BLE task.
pub struct BleRadio {
    session: Option<Session>,
}

impl BleRadio {
    pub const fn new() -> Self {
        Self { session: None }
    }

    fn publish(&self, record: &[u8]) -> Result<(), RadioError> {
        let session = self.session.as_ref().ok_or(RadioError::NotBroadcasting)?;

        let mut ad = BtHomeAd::<ADV_FRAME_LEN>::default();

        ad.add_service_data(record).add_local_name(&session.name);

        let frame = Vec::from_slice(ad.encode()).map_err(|_| RadioError::FrameOverflow)?;

        BROADCAST.signal(Broadcast {
            params: session.params,
            frame,
        });

        Ok(())
    }
}

impl Radio for BleRadio {
    type Error = RadioError;

    fn enable(&mut self) -> Result<(), RadioError> {
        if block_on(RADIO_READY.wait()) {
            Ok(())
        } else {
            Err(RadioError::Unavailable)
        }
    }

    fn start_broadcast(
        &mut self,
        params: &BroadcastParams,
        record: &[u8],
        name: Option<&str>,
    ) -> Result<(), RadioError> {
        let mut stored = String::new();

        // Anything past a full frame can never be advertised.
        for c in name.unwrap_or_default().chars() {
            if stored.push(c).is_err() {
                break;
            }
        }

        info!("Broadcasting as {}", stored.as_str());

        self.session = Some(Session {
            params: *params,
            name: stored,
        });

        self.publish(record)
    }

    fn update_broadcast(&mut self, record: &[u8]) -> Result<(), RadioError> {
        self.publish(record)
    }
}
