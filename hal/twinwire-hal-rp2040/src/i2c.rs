//! Controller role on the RP2040 I2C peripheral
//!
//! [`Rp2040Setup`] owns the peripheral and both pins until the bus is
//! initialized. It bit-bangs recovery on the raw pins, then builds the
//! interrupt-driven [`I2c`] driver and wraps it in an [`Rp2040Link`].
//!
//! The peripheral runs whole transactions only, so command lists go
//! through a [`CommandFolder`]: a write without STOP is held and replayed
//! in front of the next list for the same address, and the peripheral
//! issues the repeated START itself.
//!
//! Every transaction runs under the caller's wait bound. A transaction
//! that overruns it is dropped and reported as [`LinkError::Timeout`]; the
//! next transaction reprograms the target address, which aborts whatever
//! the peripheral was still doing.

use embassy_futures::block_on;
use embassy_rp::i2c::{Async, Config, Error, I2c, Instance, InterruptHandler, SclPin, SdaPin};
use embassy_rp::interrupt::typelevel::Binding;
use embassy_rp::Peri;
use embassy_time::{with_timeout, Delay, Duration};
use embedded_hal::i2c::{Error as _, ErrorKind, Operation};
use embedded_hal_async::i2c::I2c as AsyncI2c;
use twinwire_core::bus::recovery::BusRecovery;
use twinwire_core::bus::{CommandFolder, LinkSetup, PortId, RecoveryOutcome};
use twinwire_core::config::BusConfig;
use twinwire_hal::i2c::{Command, CommandLink, LinkError};
use twinwire_hal::watchdog::Watchdog;

use crate::gpio::OpenDrainLine;

/// Peripheral, pins and interrupt binding waiting for
/// [`I2cBus::initialize`](twinwire_core::I2cBus::initialize)
pub struct Rp2040Setup<'d, T: Instance, SCL: SclPin<T>, SDA: SdaPin<T>, I, W> {
    peri: Peri<'d, T>,
    scl: Peri<'d, SCL>,
    sda: Peri<'d, SDA>,
    irqs: I,
    watchdog: W,
}

impl<'d, T, SCL, SDA, I, W> Rp2040Setup<'d, T, SCL, SDA, I, W>
where
    T: Instance,
    SCL: SclPin<T>,
    SDA: SdaPin<T>,
    I: Binding<T::Interrupt, InterruptHandler<T>>,
    W: Watchdog,
{
    /// Collect the resources for one bus
    ///
    /// `watchdog` is fed while recovery waits on a stretched clock.
    pub fn new(peri: Peri<'d, T>, scl: Peri<'d, SCL>, sda: Peri<'d, SDA>, irqs: I, watchdog: W) -> Self {
        Self {
            peri,
            scl,
            sda,
            irqs,
            watchdog,
        }
    }
}

impl<'d, T, SCL, SDA, I, W> LinkSetup for Rp2040Setup<'d, T, SCL, SDA, I, W>
where
    T: Instance,
    SCL: SclPin<T>,
    SDA: SdaPin<T>,
    I: Binding<T::Interrupt, InterruptHandler<T>>,
    W: Watchdog,
{
    type Link = Rp2040Link<'d, T>;

    fn recover(&mut self) -> RecoveryOutcome {
        let sda = OpenDrainLine::new(self.sda.reborrow());
        let scl = OpenDrainLine::new(self.scl.reborrow());
        BusRecovery::new(sda, scl, Delay, &mut self.watchdog).run()
    }

    fn configure(self, port: PortId, config: &BusConfig) -> Result<Self::Link, LinkError> {
        let mut i2c_config = Config::default();
        i2c_config.frequency = config.frequency;
        i2c_config.sda_pullup = config.sda.pull_up;
        i2c_config.scl_pullup = config.scl.pull_up;

        debug!(
            "i2c port {}: SDA={} SCL={} at {} Hz",
            port.index(),
            config.sda.pin,
            config.scl.pin,
            config.frequency
        );

        Ok(Rp2040Link {
            i2c: I2c::new_async(self.peri, self.scl, self.sda, self.irqs, i2c_config),
            folder: CommandFolder::new(),
            timeout_us: 0,
        })
    }
}

/// Configured controller link
pub struct Rp2040Link<'d, T: Instance> {
    i2c: I2c<'d, T, Async>,
    folder: CommandFolder,
    timeout_us: u32,
}

impl<T: Instance> Rp2040Link<'_, T> {
    /// Timeout last requested through [`CommandLink::set_timeout`]
    pub fn timeout_us(&self) -> u32 {
        self.timeout_us
    }

    /// Send a write still waiting for its repeated START, with STOP
    pub fn flush(&mut self, wait_ms: u32) -> Result<(), LinkError> {
        let bound = self.bound(wait_ms);
        let i2c = &mut self.i2c;
        self.folder
            .flush(|address, ops| run_bounded(i2c, address, ops, bound))
    }

    /// The peripheral has no clock-stretch timeout of its own, so a longer
    /// stretch limit only widens the transaction bound.
    fn bound(&self, wait_ms: u32) -> Duration {
        Duration::from_millis(u64::from(wait_ms)).max(Duration::from_micros(u64::from(self.timeout_us)))
    }
}

fn link_error(e: Error) -> LinkError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => LinkError::Nack,
        _ => LinkError::Other,
    }
}

/// Run one transaction, giving up after `bound`
fn run_bounded<T: Instance>(
    i2c: &mut I2c<'_, T, Async>,
    address: u8,
    ops: &mut [Operation<'_>],
    bound: Duration,
) -> Result<(), LinkError> {
    let transfer = AsyncI2c::transaction(i2c, address, ops);
    match block_on(with_timeout(bound, transfer)) {
        Ok(result) => result.map_err(link_error),
        Err(_) => {
            warn!("i2c: transaction with 0x{:02x} exceeded {} ms", address, bound.as_millis());
            Err(LinkError::Timeout)
        }
    }
}

impl<T: Instance> CommandLink for Rp2040Link<'_, T> {
    fn set_timeout(&mut self, timeout_us: u32) -> Result<(), LinkError> {
        self.timeout_us = timeout_us;
        Ok(())
    }

    fn execute(&mut self, commands: &mut [Command<'_>], wait_ms: u32) -> Result<(), LinkError> {
        let bound = self.bound(wait_ms);
        let i2c = &mut self.i2c;
        self.folder
            .fold(commands, |address, ops| run_bounded(i2c, address, ops, bound))
    }
}
