#![feature(impl_trait_in_assoc_type)]
#![no_std]
#![no_main]

mod adc;
mod ble;
mod constants;
mod delay;
mod radio;
mod state;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use cortex_m_rt::entry;
use embassy_executor::InterruptExecutor;
use embassy_nrf::{
    bind_interrupts, interrupt,
    interrupt::{InterruptExt, Priority},
    peripherals, rng, saadc,
    twim::{self, Twim},
};
use lumen_fmt::{error, info, unwrap};
use lumen_telemetry::{BatteryMonitor, InitError, Scheduler};
use lumen_veml7700::Veml7700;

use crate::{
    adc::VddAdc,
    constants::{LUMEN_SENSOR_CONFIG, battery_channel, telemetry_config},
    delay::SleepDelay,
    radio::BleRadio,
};

bind_interrupts!(struct Irqs {
    RNG => rng::InterruptHandler<peripherals::RNG>;
    EGU0_SWI0 => nrf_mpsl::LowPrioInterruptHandler;
    CLOCK_POWER => nrf_mpsl::ClockInterruptHandler;
    RADIO => nrf_mpsl::HighPrioInterruptHandler;
    TIMER0 => nrf_mpsl::HighPrioInterruptHandler;
    RTC0 => nrf_mpsl::HighPrioInterruptHandler;
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    SAADC => saadc::InterruptHandler;
});

/// Runs the BLE host. The telemetry cycle blocks thread mode, so the radio needs its own
/// executor to make progress.
static BLE_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn EGU1_SWI1() {
    unsafe { BLE_EXECUTOR.on_interrupt() }
}

#[entry]
fn main() -> ! {
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;

    let p = embassy_nrf::init(config);

    // Priorities 0 and 1 are reserved for the MPSL.
    interrupt::TWISPI0.set_priority(Priority::P3);
    interrupt::SAADC.set_priority(Priority::P3);
    interrupt::EGU1_SWI1.set_priority(Priority::P5);

    let mpsl_p = nrf_mpsl::Peripherals::new(
        p.RTC0, p.TIMER0, p.TEMP, p.PPI_CH19, p.PPI_CH30, p.PPI_CH31,
    );
    let sdc_p = nrf_sdc::Peripherals::new(
        p.PPI_CH17, p.PPI_CH18, p.PPI_CH20, p.PPI_CH21, p.PPI_CH22, p.PPI_CH23, p.PPI_CH24,
        p.PPI_CH25, p.PPI_CH26, p.PPI_CH27, p.PPI_CH28, p.PPI_CH29,
    );

    let spawner = BLE_EXECUTOR.start(interrupt::EGU1_SWI1);
    spawner.must_spawn(ble::task(mpsl_p, sdc_p, p.RNG));

    let twi = Twim::new(p.TWISPI0, Irqs, p.P0_24, p.P0_13, twim::Config::default());
    let sensor = Veml7700::with_config(twi, LUMEN_SENSOR_CONFIG);

    let channel = battery_channel();
    let adc = unwrap!(VddAdc::new(p.SAADC, &channel), "Battery ADC setup failed");
    let battery = BatteryMonitor::new(adc, channel);

    let mut scheduler = Scheduler::new(
        sensor,
        battery,
        BleRadio::new(),
        SleepDelay,
        telemetry_config(),
    );

    if let Err(e) = scheduler.start() {
        match e {
            InitError::Sensor(_) => error!("Light sensor init failed"),
            InitError::Radio(e) => error!("Bluetooth init failed: {:?}", e),
        }

        panic!("Lumen init failed");
    }

    info!("Lumen beacon is go!");

    scheduler.run()
}
