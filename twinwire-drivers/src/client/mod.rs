//! Controller-role components
//!
//! Components here talk to a peer node through an
//! [`I2cDevice`](twinwire_core::I2cDevice) on a shared bus.

pub mod sensor;
pub mod switch;

pub use sensor::RemoteSensor;
pub use switch::{RemoteSwitch, SwitchKeys};

use embassy_sync::blocking_mutex::raw::RawMutex;
use twinwire_core::{I2cDevice, I2cResult};
use twinwire_hal::i2c::CommandLink;

/// Command code sent ahead of a request, 8 or 16 bits wide
pub trait CommandCode: Copy {
    /// Wire bytes, most significant first
    fn to_wire(self, buf: &mut [u8; 2]) -> &[u8];
}

impl CommandCode for u8 {
    fn to_wire(self, buf: &mut [u8; 2]) -> &[u8] {
        buf[0] = self;
        &buf[..1]
    }
}

impl CommandCode for u16 {
    fn to_wire(self, buf: &mut [u8; 2]) -> &[u8] {
        *buf = self.to_be_bytes();
        &buf[..]
    }
}

/// Send a bare command code to `device`
pub fn write_command<M, L, C>(device: &I2cDevice<'_, M, L>, command: C) -> I2cResult<()>
where
    M: RawMutex,
    L: CommandLink,
    C: CommandCode,
{
    let mut buf = [0u8; 2];
    device.write(command.to_wire(&mut buf), true)
}
