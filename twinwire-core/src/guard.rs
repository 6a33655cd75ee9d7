//! Bus mutual-exclusion guard
//!
//! A write that starts a measurement and a read that collects it later
//! must not be split by another device's traffic on the same bus. Callers
//! doing that take the bus guard around both steps. The guard releases on
//! drop, so every exit path (including `?`) gives the bus back.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::MutexGuard;

/// Exclusive claim on a bus, held until dropped
pub struct BusGuard<'a, M: RawMutex> {
    _inner: MutexGuard<'a, M, ()>,
}

impl<'a, M: RawMutex> BusGuard<'a, M> {
    pub(crate) fn new(inner: MutexGuard<'a, M, ()>) -> Self {
        trace!("i2c: bus guard taken");
        Self { _inner: inner }
    }
}

impl<M: RawMutex> Drop for BusGuard<'_, M> {
    fn drop(&mut self) {
        trace!("i2c: bus guard released");
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::{I2cBus, PortPool};
    use crate::config::BusConfig;
    use crate::testing::{MockLink, MockSetup, SharedRecorder};
    use crate::transfer::{ErrorCode, I2cResult};
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type TestBus = I2cBus<NoopRawMutex, MockLink>;

    fn guarded_step(bus: &TestBus, fail: bool) -> I2cResult<()> {
        let _guard = bus.try_lock().ok_or(ErrorCode::Unknown)?;
        if fail {
            return Err(ErrorCode::Timeout);
        }
        Ok(())
    }

    #[test]
    fn test_released_on_early_return() {
        let bus = TestBus::new(BusConfig::default());
        assert_eq!(guarded_step(&bus, true), Err(ErrorCode::Timeout));
        assert!(bus.try_lock().is_some());
        assert_eq!(guarded_step(&bus, false), Ok(()));
        assert!(bus.try_lock().is_some());
    }

    #[test]
    fn test_async_lock_waits_for_release() {
        let rec = SharedRecorder::default();
        let bus = TestBus::new(BusConfig::default());
        bus.initialize(&mut PortPool::<2>::new(), MockSetup::new(&rec))
            .unwrap();

        block_on(async {
            let guard = bus.lock().await;
            assert!(bus.try_lock().is_none());
            // Transfers are not blocked by the guard
            assert!(bus.write(0x42, &[0x01], true).is_ok());
            drop(guard);
            let _again = bus.lock().await;
        });
        assert_eq!(rec.borrow().transactions.len(), 1);
    }
}
