use core::{
    future::Future,
    pin::pin,
    task::{Context, Waker},
};

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::delay::DelayNs;

/// Blocking delay which sleeps the core between time driver interrupts instead of spinning.
///
/// The pending timer arms an RTC alarm at the deadline, and every interrupt wakes the core
/// out of `wfe` to check it again.
pub struct SleepDelay;

impl SleepDelay {
    fn sleep_until(deadline: Instant) {
        let mut timer = pin!(Timer::at(deadline));
        let mut cx = Context::from_waker(Waker::noop());

        while timer.as_mut().poll(&mut cx).is_pending() {
            cortex_m::asm::wfe();
        }
    }

    #[inline]
    fn sleep_for(duration: Duration) {
        Self::sleep_until(Instant::now() + duration);
    }
}

impl DelayNs for SleepDelay {
    #[inline]
    fn delay_ns(&mut self, ns: u32) {
        Self::sleep_for(Duration::from_nanos(ns.into()));
    }

    #[inline]
    fn delay_us(&mut self, us: u32) {
        Self::sleep_for(Duration::from_micros(us.into()));
    }

    #[inline]
    fn delay_ms(&mut self, ms: u32) {
        Self::sleep_for(Duration::from_millis(ms.into()));
    }
}
