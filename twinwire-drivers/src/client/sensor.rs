//! Remote sensor client
//!
//! Reads a float published by a peer node's register table. Each update
//! selects the key, gives the peer time to prepare the reply, then reads
//! four bytes. The bus guard is held across the whole exchange so other
//! clients on the bus cannot select a different key in between.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use twinwire_core::slave::RegisterValue;
use twinwire_core::{ErrorCode, I2cDevice, I2cResult};
use twinwire_hal::i2c::CommandLink;

/// Time the peer needs between command and reply
pub const RESPONSE_DELAY_US: u32 = 10_000;

/// Client for one key of a peer's register table
pub struct RemoteSensor<'b, M: RawMutex, L> {
    device: I2cDevice<'b, M, L>,
    key: u8,
    value: Option<f32>,
    last_error: Option<ErrorCode>,
    warning: bool,
}

impl<'b, M: RawMutex, L: CommandLink> RemoteSensor<'b, M, L> {
    /// Create a client reading `key` from `device`
    pub fn new(device: I2cDevice<'b, M, L>, key: u8) -> Self {
        Self {
            device,
            key,
            value: None,
            last_error: None,
            warning: false,
        }
    }

    /// Fetch the current value from the peer
    pub async fn update<D: DelayNs>(&mut self, delay: &mut D) -> I2cResult<f32> {
        let mut buf = [0u8; 4];
        let result = self
            .device
            .write_then_read_deferred(&[self.key], delay, RESPONSE_DELAY_US, &mut buf)
            .await;

        match result {
            Ok(()) => {
                let value = RegisterValue::from_bytes(buf).as_f32();
                trace!(
                    "remote sensor: key 0x{:02x} = {=[u8]:02x}",
                    self.key,
                    &buf[..]
                );
                self.value = Some(value);
                self.last_error = None;
                self.warning = false;
                Ok(value)
            }
            Err(e) => {
                if !self.warning {
                    warn!(
                        "remote sensor: reading key 0x{:02x} from 0x{:02x} failed: {}",
                        self.key,
                        self.device.address(),
                        e
                    );
                }
                self.last_error = Some(e);
                self.warning = true;
                Err(e)
            }
        }
    }

    /// Last value read successfully
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    /// Error of the last update, if it failed
    pub fn last_error(&self) -> Option<ErrorCode> {
        self.last_error
    }

    /// Last update failed
    pub fn has_warning(&self) -> bool {
        self.warning
    }

    /// Registry key this client reads
    pub fn key(&self) -> u8 {
        self.key
    }

    /// Log the client configuration
    pub fn dump_config(&self) {
        info!("Remote sensor:");
        info!("  Address: 0x{:02x}", self.device.address());
        info!("  Registry key: 0x{:02x}", self.key);
        if let Some(e) = self.last_error {
            warn!("  Last error: {}", e);
        }
    }
}
