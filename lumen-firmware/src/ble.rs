use bt_hci::cmd::SyncCmd;
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_nrf::{mode, pac, peripherals, rng};
use embassy_time::Duration;
use lumen_fmt::{error, info, unwrap};
use nrf_mpsl::MultiprotocolServiceLayer;
use nrf_sdc::vendor::ZephyrWriteBdAddr;
use static_cell::StaticCell;
use trouble_host::prelude::*;

use crate::{
    Irqs,
    constants::{LUMEN_BLE_TX_POWER, LUMEN_SDC_MEM},
    state::{BROADCAST, RADIO_READY},
};

#[embassy_executor::task]
async fn mpsl_task(mpsl: &'static MultiprotocolServiceLayer<'static>) -> ! {
    mpsl.run().await
}

fn build_sdc<'d, const N: usize>(
    p: nrf_sdc::Peripherals<'d>,
    rng: &'d mut rng::Rng<peripherals::RNG, mode::Async>,
    mpsl: &'d MultiprotocolServiceLayer,
    mem: &'d mut nrf_sdc::Mem<N>,
) -> Result<nrf_sdc::SoftdeviceController<'d>, nrf_sdc::Error> {
    nrf_sdc::Builder::new()?
        .support_adv()?
        .build(p, rng, mpsl, mem)
}

/// Static random address derived from the factory programmed device id.
fn build_addr() -> BdAddr {
    let ficr = pac::FICR;
    let high = u64::from(ficr.deviceid(1).read());
    let addr = high << 32 | u64::from(ficr.deviceid(0).read());
    let addr = addr | 0x0000_c000_0000_0000;
    BdAddr::new(unwrap!(addr.to_le_bytes()[..6].try_into()))
}

/// Brings up the controller and host, then advertises whatever frame the scheduler published
/// last.
#[embassy_executor::task]
pub async fn task(
    mpsl_p: nrf_mpsl::Peripherals<'static>,
    sdc_p: nrf_sdc::Peripherals<'static>,
    rng: peripherals::RNG,
) {
    static MPSL: StaticCell<MultiprotocolServiceLayer> = StaticCell::new();

    let lfclk_cfg = nrf_mpsl::raw::mpsl_clock_lfclk_cfg_t {
        source: nrf_mpsl::raw::MPSL_CLOCK_LF_SRC_RC as u8,
        rc_ctiv: nrf_mpsl::raw::MPSL_RECOMMENDED_RC_CTIV as u8,
        rc_temp_ctiv: nrf_mpsl::raw::MPSL_RECOMMENDED_RC_TEMP_CTIV as u8,
        accuracy_ppm: nrf_mpsl::raw::MPSL_DEFAULT_CLOCK_ACCURACY_PPM as u16,
        skip_wait_lfclk_started: nrf_mpsl::raw::MPSL_DEFAULT_SKIP_WAIT_LFCLK_STARTED != 0,
    };

    let mpsl = match MultiprotocolServiceLayer::new(mpsl_p, Irqs, lfclk_cfg) {
        Ok(mpsl) => MPSL.init(mpsl),
        Err(_) => {
            error!("MPSL init failed");
            RADIO_READY.signal(false);
            return;
        }
    };

    let spawner = Spawner::for_current_executor().await;
    spawner.must_spawn(mpsl_task(mpsl));

    let mut rng = rng::Rng::new(rng, Irqs);
    let mut sdc_mem = nrf_sdc::Mem::<LUMEN_SDC_MEM>::new();

    match build_sdc(sdc_p, &mut rng, mpsl, &mut sdc_mem) {
        Ok(controller) => run(controller).await,
        Err(_) => {
            error!("Softdevice controller init failed");
            RADIO_READY.signal(false);
        }
    }
}

async fn run(controller: nrf_sdc::SoftdeviceController<'_>) {
    let addr = build_addr();

    info!("Our address = {:?}", &addr);

    if ZephyrWriteBdAddr::new(addr).exec(&controller).await.is_err() {
        error!("Failed to set the bluetooth address");
        RADIO_READY.signal(false);
        return;
    }

    let mut resources: HostResources<DefaultPacketPool, 0, 0> = HostResources::new();
    let stack = trouble_host::new(controller, &mut resources);
    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    RADIO_READY.signal(true);

    let _ = join(runner.run(), async {
        let mut advertiser = None;

        loop {
            let broadcast = BROADCAST.wait().await;

            let params = AdvertisementParameters {
                interval_min: Duration::from_micros(broadcast.params.interval_min_us().into()),
                interval_max: Duration::from_micros(broadcast.params.interval_max_us().into()),
                tx_power: LUMEN_BLE_TX_POWER,
                ..Default::default()
            };

            // The running set has to stop before its data can be replaced.
            drop(advertiser.take());

            match peripheral
                .advertise(
                    &params,
                    Advertisement::NonconnectableNonscannableUndirected {
                        adv_data: &broadcast.frame,
                    },
                )
                .await
            {
                Ok(running) => advertiser = Some(running),
                Err(_) => error!("Failed to advertise"),
            }
        }
    })
    .await;
}
