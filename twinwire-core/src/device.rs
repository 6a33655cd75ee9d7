//! Device and register proxies
//!
//! An [`I2cDevice`] binds a 7-bit address to a shared [`I2cBus`] and adds
//! register addressing on top of the raw transfers. 16-bit register
//! addresses go out big-endian.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use twinwire_hal::i2c::CommandLink;

use crate::bus::I2cBus;
use crate::config::DeviceConfig;
use crate::transfer::{I2cResult, ReadSegment, WriteSegment};

/// Host to wire order for a 16-bit register address
pub const fn htoi2cs(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Wire to host order for a 16-bit value
pub const fn i2ctohs(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Peripheral at a fixed address on a shared bus
pub struct I2cDevice<'b, M: RawMutex, L> {
    address: u8,
    bus: &'b I2cBus<M, L>,
}

impl<M: RawMutex, L> Clone for I2cDevice<'_, M, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex, L> Copy for I2cDevice<'_, M, L> {}

impl<'b, M: RawMutex, L: CommandLink> I2cDevice<'b, M, L> {
    /// Bind `address` on `bus`
    pub const fn new(bus: &'b I2cBus<M, L>, address: u8) -> Self {
        Self { address, bus }
    }

    /// Bind the address from a device config
    pub const fn from_config(bus: &'b I2cBus<M, L>, config: &DeviceConfig) -> Self {
        Self::new(bus, config.address)
    }

    /// Device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Change the device address
    pub fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    /// Owning bus
    pub fn bus(&self) -> &'b I2cBus<M, L> {
        self.bus
    }

    /// Read `data.len()` bytes
    pub fn read(&self, data: &mut [u8]) -> I2cResult<()> {
        self.bus.read(self.address, data)
    }

    /// Write `data`, optionally leaving the bus open for a repeated START
    pub fn write(&self, data: &[u8], send_stop: bool) -> I2cResult<()> {
        self.bus.write(self.address, data, send_stop)
    }

    /// Vectored read from this device
    pub fn readv(&self, segments: &mut [ReadSegment<'_>]) -> I2cResult<()> {
        self.bus.readv(self.address, segments)
    }

    /// Vectored write to this device
    pub fn writev(&self, segments: &[WriteSegment<'_>], send_stop: bool) -> I2cResult<()> {
        self.bus.writev(self.address, segments, send_stop)
    }

    /// Read from an 8-bit register
    ///
    /// Writes the register address (without STOP when `send_stop` is
    /// false) and then reads `data.len()` bytes.
    pub fn read_register(&self, register: u8, data: &mut [u8], send_stop: bool) -> I2cResult<()> {
        self.write(&[register], send_stop)?;
        self.read(data)
    }

    /// Read from a 16-bit register
    pub fn read_register16(&self, register: u16, data: &mut [u8], send_stop: bool) -> I2cResult<()> {
        self.write(&htoi2cs(register), send_stop)?;
        self.read(data)
    }

    /// Write to an 8-bit register
    ///
    /// Register address and payload go out in one transaction.
    pub fn write_register(&self, register: u8, data: &[u8], send_stop: bool) -> I2cResult<()> {
        self.writev(&[WriteSegment(&[register]), WriteSegment(data)], send_stop)
    }

    /// Write to a 16-bit register
    pub fn write_register16(&self, register: u16, data: &[u8], send_stop: bool) -> I2cResult<()> {
        let addr = htoi2cs(register);
        self.writev(&[WriteSegment(&addr), WriteSegment(data)], send_stop)
    }

    /// Read a single byte from an 8-bit register
    pub fn read_byte(&self, register: u8) -> I2cResult<u8> {
        let mut byte = [0u8; 1];
        self.read_register(register, &mut byte, true)?;
        Ok(byte[0])
    }

    /// Write a single byte to an 8-bit register
    pub fn write_byte(&self, register: u8, value: u8) -> I2cResult<()> {
        self.write_register(register, &[value], true)
    }

    /// Proxy for an 8-bit register
    pub fn reg(&self, register: u8) -> Register<'b, M, L> {
        Register {
            device: *self,
            register,
        }
    }

    /// Proxy for a 16-bit register
    pub fn reg16(&self, register: u16) -> Register16<'b, M, L> {
        Register16 {
            device: *self,
            register,
        }
    }

    /// Write a command, wait, then read the response
    ///
    /// Holds the bus guard from before the write until after the read so
    /// no other guarded caller can talk to the bus in between. The guard
    /// is released on every return path.
    pub async fn write_then_read_deferred<D: DelayNs>(
        &self,
        command: &[u8],
        delay: &mut D,
        wait_us: u32,
        buf: &mut [u8],
    ) -> I2cResult<()> {
        let _guard = self.bus.lock().await;
        self.write(command, true)?;
        delay.delay_us(wait_us).await;
        self.read(buf)
    }
}

/// 8-bit register of a device
pub struct Register<'b, M: RawMutex, L> {
    device: I2cDevice<'b, M, L>,
    register: u8,
}

impl<M: RawMutex, L: CommandLink> Register<'_, M, L> {
    /// Register address
    pub fn address(&self) -> u8 {
        self.register
    }

    /// Current value, 0 if the read fails
    ///
    /// Error detail is discarded; use [`I2cDevice::read_register`] when it
    /// matters.
    pub fn get(&self) -> u8 {
        self.device.read_byte(self.register).unwrap_or(0)
    }

    /// Write a new value
    pub fn set(&self, value: u8) -> I2cResult<()> {
        self.device.write_byte(self.register, value)
    }
}

/// 16-bit addressed register of a device
pub struct Register16<'b, M: RawMutex, L> {
    device: I2cDevice<'b, M, L>,
    register: u16,
}

impl<M: RawMutex, L: CommandLink> Register16<'_, M, L> {
    /// Register address
    pub fn address(&self) -> u16 {
        self.register
    }

    /// Current value, 0 if the read fails
    pub fn get(&self) -> u8 {
        let mut byte = [0u8; 1];
        match self.device.read_register16(self.register, &mut byte, true) {
            Ok(()) => byte[0],
            Err(_) => 0,
        }
    }

    /// Write a new value
    pub fn set(&self, value: u8) -> I2cResult<()> {
        self.device.write_register16(self.register, &[value], true)
    }
}
