//! Peripheral role on the RP2040 I2C slave driver
//!
//! The address is only known once the engine enables the endpoint, so
//! the peripheral and pins are held until [`TargetEndpoint::enable`]
//! builds the [`I2cSlave`].

use embassy_rp::i2c::{Instance, InterruptHandler, SclPin, SdaPin};
use embassy_rp::i2c_slave::{self, I2cSlave};
use embassy_rp::interrupt::typelevel::Binding;
use embassy_rp::Peri;
use embassy_time::{with_timeout, Duration};
use twinwire_hal::i2c::TargetEndpoint;

/// Byte clocked out once a reply runs short
const FILL_BYTE: u8 = 0x00;

/// Peripheral-mode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetError {
    /// `enable` has not been called
    NotEnabled,
    /// `enable` was already called
    AlreadyEnabled,
    /// The foreign controller did not clock the reply out in time
    Timeout,
    /// Bus error or aborted transfer
    Bus,
}

impl From<i2c_slave::Error> for TargetError {
    fn from(_: i2c_slave::Error) -> Self {
        TargetError::Bus
    }
}

/// What the foreign controller just did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetRequest {
    /// Wrote this many bytes
    Write(usize),
    /// Wrote this many bytes, then asked for a reply after a repeated START
    WriteRead(usize),
    /// Asked for a reply
    Read,
    /// General-call write, not addressed to this node
    GeneralCall(usize),
}

struct Parts<'d, T: Instance, SCL, SDA> {
    peri: Peri<'d, T>,
    scl: Peri<'d, SCL>,
    sda: Peri<'d, SDA>,
}

/// I2C peripheral answering a foreign controller
pub struct Rp2040Target<'d, T: Instance, SCL, SDA, I> {
    parts: Option<Parts<'d, T, SCL, SDA>>,
    irqs: I,
    pull_up: bool,
    slave: Option<I2cSlave<'d, T>>,
}

impl<'d, T, SCL, SDA, I> Rp2040Target<'d, T, SCL, SDA, I>
where
    T: Instance,
    SCL: SclPin<T>,
    SDA: SdaPin<T>,
    I: Binding<T::Interrupt, InterruptHandler<T>> + Copy,
{
    /// Collect the resources; nothing is configured yet
    pub fn new(peri: Peri<'d, T>, scl: Peri<'d, SCL>, sda: Peri<'d, SDA>, irqs: I, pull_up: bool) -> Self {
        Self {
            parts: Some(Parts { peri, scl, sda }),
            irqs,
            pull_up,
            slave: None,
        }
    }

    /// Endpoint has been enabled
    pub fn is_enabled(&self) -> bool {
        self.slave.is_some()
    }

    /// Wait for the next transfer addressed to this node
    ///
    /// Written bytes land in `buf`. After a [`TargetRequest::Read`] or
    /// [`TargetRequest::WriteRead`] the controller is clock-stretched until
    /// a reply is written.
    pub async fn listen(&mut self, buf: &mut [u8]) -> Result<TargetRequest, TargetError> {
        let slave = self.slave.as_mut().ok_or(TargetError::NotEnabled)?;
        let request = match slave.listen(buf).await? {
            i2c_slave::Command::Write(len) => TargetRequest::Write(len),
            i2c_slave::Command::WriteRead(len) => TargetRequest::WriteRead(len),
            i2c_slave::Command::Read => TargetRequest::Read,
            i2c_slave::Command::GeneralCall(len) => TargetRequest::GeneralCall(len),
        };
        Ok(request)
    }
}

impl<'d, T, SCL, SDA, I> TargetEndpoint for Rp2040Target<'d, T, SCL, SDA, I>
where
    T: Instance,
    SCL: SclPin<T>,
    SDA: SdaPin<T>,
    I: Binding<T::Interrupt, InterruptHandler<T>> + Copy,
{
    type Error = TargetError;

    fn enable(&mut self, address: u8) -> Result<(), TargetError> {
        let parts = self.parts.take().ok_or(TargetError::AlreadyEnabled)?;

        let mut config = i2c_slave::Config::default();
        config.addr = u16::from(address);
        config.sda_pullup = self.pull_up;
        config.scl_pullup = self.pull_up;

        self.slave = Some(I2cSlave::new(parts.peri, parts.scl, parts.sda, self.irqs, config));
        Ok(())
    }

    /// Reply to a pending read
    ///
    /// A controller that clocks past the end of `data` gets fill bytes; one
    /// that stops early leaves the rest unsent. Either way the reply is
    /// consumed whole.
    async fn write(&mut self, data: &[u8], timeout_ms: u32) -> Result<usize, TargetError> {
        let slave = self.slave.as_mut().ok_or(TargetError::NotEnabled)?;
        let reply = slave.respond_and_fill(data, FILL_BYTE);
        let status = with_timeout(Duration::from_millis(u64::from(timeout_ms)), reply)
            .await
            .map_err(|_| TargetError::Timeout)??;

        if let i2c_slave::ReadStatus::LeftoverBytes(left) = status {
            trace!("i2c target: controller stopped with {} bytes unsent", left);
        }

        Ok(data.len())
    }
}
