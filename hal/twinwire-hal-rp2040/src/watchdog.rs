//! Hardware watchdog

use embassy_rp::peripherals::WATCHDOG;
use embassy_rp::watchdog::Watchdog as RpWatchdog;
use embassy_rp::Peri;
use embassy_time::Duration;
use twinwire_hal::watchdog::Watchdog;

/// RP2040 watchdog fed from busy-wait loops
pub struct Rp2040Watchdog {
    inner: RpWatchdog,
}

impl Rp2040Watchdog {
    /// Take the watchdog peripheral without starting it
    pub fn new(peri: Peri<'static, WATCHDOG>) -> Self {
        Self {
            inner: RpWatchdog::new(peri),
        }
    }

    /// Start the countdown; the chip resets if not fed within `period`
    pub fn start(&mut self, period: Duration) {
        self.inner.start(period);
    }
}

impl Watchdog for Rp2040Watchdog {
    fn feed(&mut self) {
        self.inner.feed();
    }
}
