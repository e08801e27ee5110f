use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use embedded_hal::{delay::DelayNs, i2c::ErrorKind};
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
use lumen_bthome::BATTERY_UNKNOWN;
use lumen_telemetry::{
    AdcChannel, BatteryAdc, BatteryMonitor, BroadcastParams, CyclePhase, InitError, Radio,
    Scheduler, TelemetryConfig,
};
use lumen_veml7700::{Error as SensorError, PowerState, Veml7700};

const ALS_ADDR: u8 = 0x10;
/// Raw VDD sample reading as 3100 mV.
const RAW_3100_MV: i16 = 3527;

#[derive(Debug, PartialEq, Clone)]
struct AdcFault;

/// ADC returning the same raw sample every time, or failing while it holds `None`.
struct FakeAdc(Rc<Cell<Option<i16>>>);

impl BatteryAdc for FakeAdc {
    type Error = AdcFault;

    fn read_raw(&mut self, _channel: &AdcChannel) -> Result<i16, AdcFault> {
        self.0.get().ok_or(AdcFault)
    }
}

#[derive(Debug, PartialEq, Clone)]
struct RadioFault;

#[derive(Default)]
struct RadioLog {
    fail_enable: bool,
    fail_start: bool,
    fail_updates: bool,
    enabled: bool,
    started: Option<(BroadcastParams, Vec<u8>, Option<String>)>,
    update_attempts: usize,
    published: Vec<Vec<u8>>,
}

struct FakeRadio(Rc<RefCell<RadioLog>>);

impl Radio for FakeRadio {
    type Error = RadioFault;

    fn enable(&mut self) -> Result<(), RadioFault> {
        let mut log = self.0.borrow_mut();

        if log.fail_enable {
            return Err(RadioFault);
        }

        log.enabled = true;
        Ok(())
    }

    fn start_broadcast(
        &mut self,
        params: &BroadcastParams,
        record: &[u8],
        name: Option<&str>,
    ) -> Result<(), RadioFault> {
        let mut log = self.0.borrow_mut();

        if log.fail_start {
            return Err(RadioFault);
        }

        log.started = Some((*params, record.to_vec(), name.map(String::from)));
        Ok(())
    }

    fn update_broadcast(&mut self, record: &[u8]) -> Result<(), RadioFault> {
        let mut log = self.0.borrow_mut();
        log.update_attempts += 1;

        if log.fail_updates {
            return Err(RadioFault);
        }

        log.published.push(record.to_vec());
        Ok(())
    }
}

/// Delay which only accumulates the requested time.
struct SimDelay(Rc<Cell<u64>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + u64::from(ns));
    }
}

struct Harness {
    scheduler: Scheduler<I2cMock, FakeAdc, FakeRadio, SimDelay>,
    i2c: I2cMock,
    battery_raw: Rc<Cell<Option<i16>>>,
    radio: Rc<RefCell<RadioLog>>,
    elapsed_ns: Rc<Cell<u64>>,
}

impl Harness {
    fn new(expectations: &[Transaction]) -> Self {
        let i2c = I2cMock::new(expectations);
        let battery_raw = Rc::new(Cell::new(Some(RAW_3100_MV)));
        let radio = Rc::new(RefCell::new(RadioLog::default()));
        let elapsed_ns = Rc::new(Cell::new(0));

        let config = TelemetryConfig {
            name: Some("light_sensor_proki"),
            ..TelemetryConfig::default()
        };

        let scheduler = Scheduler::new(
            Veml7700::new(i2c.clone()),
            BatteryMonitor::new(FakeAdc(battery_raw.clone()), AdcChannel::default()),
            FakeRadio(radio.clone()),
            SimDelay(elapsed_ns.clone()),
            config,
        );

        Self {
            scheduler,
            i2c,
            battery_raw,
            radio,
            elapsed_ns,
        }
    }

    fn started(expectations: &[Transaction]) -> Self {
        let mut harness = Self::new(expectations);
        harness.scheduler.start().unwrap();
        harness
    }

    fn done(mut self) {
        self.i2c.done();
    }
}

fn conf_write(value: u16) -> Transaction {
    let [lo, hi] = value.to_le_bytes();
    Transaction::write(ALS_ADDR, vec![0x00, lo, hi])
}

fn init() -> Vec<Transaction> {
    vec![
        Transaction::write_read(ALS_ADDR, vec![0x07], vec![0x81, 0xC4]),
        conf_write(0x0001),
        conf_write(0x0001),
        Transaction::write_read(ALS_ADDR, vec![0x00], vec![0x01, 0x00]),
    ]
}

fn als_read(counts: u16) -> Transaction {
    Transaction::write_read(ALS_ADDR, vec![0x04], counts.to_le_bytes().to_vec())
}

fn white_read() -> Transaction {
    Transaction::write_read(ALS_ADDR, vec![0x05], vec![0x00, 0x00])
}

/// A cycle where every sensor access succeeds.
fn cycle(counts: u16) -> Vec<Transaction> {
    vec![conf_write(0x0000), als_read(counts), white_read(), conf_write(0x0001)]
}

fn expectations(parts: &[Vec<Transaction>]) -> Vec<Transaction> {
    parts.concat()
}

/// 1000 counts at 0.0576 lx per count: 57.6 lx, 5760 centilux.
const LUX_1000_COUNTS: [u8; 3] = [0x80, 0x16, 0x00];

mod startup {
    use super::*;

    #[test]
    fn start_broadcasts_empty_record() {
        let harness = Harness::started(&init());

        let log = harness.radio.borrow();
        let (params, record, name) = log.started.clone().unwrap();

        assert!(log.enabled);
        assert_eq!(params, BroadcastParams::default());
        assert_eq!((params.interval_min, params.interval_max), (8000, 16000));
        assert_eq!(record, [0xD2, 0xFC, 0x40, 0x05, 0x00, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(name.as_deref(), Some("light_sensor_proki"));
        assert_eq!(harness.scheduler.sensor().state(), PowerState::Off);
        drop(log);

        harness.done();
    }

    #[test]
    fn unreachable_sensor_is_fatal() {
        let mut harness = Harness::new(&[Transaction::write_read(
            ALS_ADDR,
            vec![0x07],
            vec![0x00, 0x00],
        )
        .with_error(ErrorKind::Other)]);

        assert_eq!(
            harness.scheduler.start(),
            Err(InitError::Sensor(SensorError::NotReady))
        );
        assert!(!harness.radio.borrow().enabled);

        harness.done();
    }

    #[test]
    fn sensor_config_failure_is_fatal() {
        let mut harness = Harness::new(&[
            Transaction::write_read(ALS_ADDR, vec![0x07], vec![0x81, 0xC4]),
            conf_write(0x0001).with_error(ErrorKind::Other),
        ]);

        assert_eq!(
            harness.scheduler.start(),
            Err(InitError::Sensor(SensorError::ConfigFailed(ErrorKind::Other)))
        );

        harness.done();
    }

    #[test]
    fn radio_enable_failure_is_fatal() {
        let mut harness = Harness::new(&init());
        harness.radio.borrow_mut().fail_enable = true;

        assert_eq!(harness.scheduler.start(), Err(InitError::Radio(RadioFault)));
        assert!(harness.radio.borrow().started.is_none());

        harness.done();
    }

    #[test]
    fn broadcast_start_failure_is_fatal() {
        let mut harness = Harness::new(&init());
        harness.radio.borrow_mut().fail_start = true;

        assert_eq!(harness.scheduler.start(), Err(InitError::Radio(RadioFault)));

        harness.done();
    }
}

mod cycles {
    use super::*;

    #[test]
    fn full_round_trip() {
        let mut harness = Harness::started(&expectations(&[init(), cycle(0)]));

        let record = harness.scheduler.run_cycle();

        let expected = [0xD2, 0xFC, 0x40, 0x05, 0x00, 0x00, 0x00, 0x01, 0x64];
        assert_eq!(record.to_bytes(), expected);
        assert_eq!(harness.radio.borrow().published, [expected.to_vec()]);
        assert_eq!(harness.scheduler.phase(), CyclePhase::Idle);
        assert_eq!(harness.scheduler.sensor().state(), PowerState::Off);

        harness.done();
    }

    #[test]
    fn lux_is_published() {
        let mut harness = Harness::started(&expectations(&[init(), cycle(1000)]));

        let record = harness.scheduler.run_cycle();

        assert_eq!(record.lux().as_bytes(), LUX_1000_COUNTS);
        assert_eq!(harness.scheduler.last_lux().as_centilux(), 5760);

        harness.done();
    }

    #[test]
    fn sleep_follows_settle_time() {
        let mut harness = Harness::started(&expectations(&[init(), cycle(0), cycle(0)]));

        harness.scheduler.run_cycle();
        // 2.5 ms startup + 100 ms integration + 50 ms margin, then the 5 s period
        assert_eq!(harness.elapsed_ns.get(), 5_152_500_000);

        harness.scheduler.run_cycle();
        assert_eq!(harness.elapsed_ns.get(), 2 * 5_152_500_000);

        harness.done();
    }

    #[test]
    fn failed_fetch_keeps_previous_lux() {
        let mut harness = Harness::started(&expectations(&[
            init(),
            cycle(1000),
            vec![
                conf_write(0x0000),
                Transaction::write_read(ALS_ADDR, vec![0x04], vec![0x00, 0x00])
                    .with_error(ErrorKind::Other),
                conf_write(0x0001),
            ],
        ]));

        let first = harness.scheduler.run_cycle();
        let second = harness.scheduler.run_cycle();

        assert_eq!(first.lux().as_bytes(), LUX_1000_COUNTS);
        assert_eq!(second.lux().as_bytes(), first.lux().as_bytes());
        assert_eq!(second.to_bytes(), first.to_bytes());

        harness.done();
    }

    #[test]
    fn saturated_reading_keeps_previous_lux() {
        let mut harness = Harness::started(&expectations(&[
            init(),
            cycle(1000),
            cycle(u16::MAX),
        ]));

        let first = harness.scheduler.run_cycle();
        let second = harness.scheduler.run_cycle();

        assert_eq!(second.lux(), first.lux());

        harness.done();
    }

    #[test]
    fn failed_activation_skips_lux_sampling() {
        let mut harness = Harness::started(&expectations(&[
            init(),
            cycle(1000),
            vec![
                conf_write(0x0000).with_error(ErrorKind::Other),
                // Shutdown is still written at the end of the cycle.
                conf_write(0x0001),
            ],
            cycle(0),
        ]));

        let first = harness.scheduler.run_cycle();
        let elapsed = harness.elapsed_ns.get();

        let second = harness.scheduler.run_cycle();

        assert_eq!(second.lux(), first.lux());
        assert_eq!(second.battery(), 100);
        // No settle delays without a powered sensor, only the period.
        assert_eq!(harness.elapsed_ns.get() - elapsed, 5_000_000_000);

        let third = harness.scheduler.run_cycle();
        assert_eq!(third.lux().as_bytes(), [0, 0, 0]);

        harness.done();
    }

    #[test]
    fn failed_battery_read_publishes_unknown() {
        let mut harness = Harness::started(&expectations(&[init(), cycle(1000), cycle(1000)]));

        harness.battery_raw.set(None);
        let first = harness.scheduler.run_cycle();

        assert_eq!(first.battery(), BATTERY_UNKNOWN);
        assert_eq!(first.to_bytes()[8], 0xFF);
        assert_eq!(first.lux().as_bytes(), LUX_1000_COUNTS);

        harness.battery_raw.set(Some(RAW_3100_MV));
        let second = harness.scheduler.run_cycle();

        assert_eq!(second.battery(), 100);

        harness.done();
    }

    #[test]
    fn failed_publish_continues_next_cycle() {
        let mut harness = Harness::started(&expectations(&[init(), cycle(0), cycle(1000)]));

        harness.radio.borrow_mut().fail_updates = true;
        harness.scheduler.run_cycle();

        assert_eq!(harness.radio.borrow().update_attempts, 1);
        assert!(harness.radio.borrow().published.is_empty());
        assert_eq!(harness.scheduler.phase(), CyclePhase::Idle);

        harness.radio.borrow_mut().fail_updates = false;
        let record = harness.scheduler.run_cycle();

        assert_eq!(harness.radio.borrow().update_attempts, 2);
        assert_eq!(harness.radio.borrow().published, [record.to_bytes().to_vec()]);

        harness.done();
    }

    #[test]
    fn failed_shutdown_does_not_corrupt_next_cycle() {
        let mut harness = Harness::started(&expectations(&[
            init(),
            vec![
                conf_write(0x0000),
                als_read(0),
                white_read(),
                conf_write(0x0001).with_error(ErrorKind::Other),
            ],
            cycle(1000),
        ]));

        harness.scheduler.run_cycle();
        assert_eq!(harness.scheduler.sensor().cached_register(), 0x0000);

        let record = harness.scheduler.run_cycle();

        assert_eq!(record.lux().as_bytes(), LUX_1000_COUNTS);
        assert_eq!(harness.scheduler.sensor().state(), PowerState::Off);
        assert_eq!(harness.scheduler.sensor().cached_register(), 0x0001);

        harness.done();
    }
}
