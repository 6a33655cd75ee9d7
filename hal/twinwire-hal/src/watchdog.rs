//! Watchdog feed hook
//!
//! Busy-wait loops that may run for milliseconds (e.g. waiting for a
//! clock-stretching peripheral during bus recovery) call [`Watchdog::feed`]
//! on every iteration so a hardware watchdog does not reset the chip.

/// Watchdog or scheduler yield hook
pub trait Watchdog {
    /// Feed the watchdog and give other work a chance to run
    fn feed(&mut self);
}

/// Hook for platforms without a watchdog
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWatchdog;

impl Watchdog for NoWatchdog {
    fn feed(&mut self) {}
}

impl<W: Watchdog + ?Sized> Watchdog for &mut W {
    fn feed(&mut self) {
        (**self).feed();
    }
}
