//! Remote switch client
//!
//! Drives an on/off switch held in a peer node's register table. The peer
//! exposes three keys: one reporting the state and one each for turning
//! the switch on and off. Selecting the on or off key is the command;
//! the peer runs the callback attached to it.
//!
//! Every exchange holds the bus guard, so a command never lands between
//! another client's key selection and its read.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use twinwire_core::slave::RegisterValue;
use twinwire_core::{ErrorCode, I2cDevice, I2cResult};
use twinwire_hal::i2c::CommandLink;

use super::sensor::RESPONSE_DELAY_US;

/// Keys of a switch in the peer's register table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchKeys {
    /// Reports the state, non-zero when on
    pub read: u8,
    /// Turns the switch on when selected
    pub turn_on: u8,
    /// Turns the switch off when selected
    pub turn_off: u8,
}

/// Client for a switch on a peer node
pub struct RemoteSwitch<'b, M: RawMutex, L> {
    device: I2cDevice<'b, M, L>,
    keys: SwitchKeys,
    state: Option<bool>,
    last_error: Option<ErrorCode>,
}

impl<'b, M: RawMutex, L: CommandLink> RemoteSwitch<'b, M, L> {
    pub fn new(device: I2cDevice<'b, M, L>, keys: SwitchKeys) -> Self {
        Self {
            device,
            keys,
            state: None,
            last_error: None,
        }
    }

    /// Turn the peer's switch on or off
    ///
    /// The local state follows only once the peer acknowledged the command.
    pub async fn set(&mut self, on: bool) -> I2cResult<()> {
        let key = if on { self.keys.turn_on } else { self.keys.turn_off };
        let result = {
            let _guard = self.device.bus().lock().await;
            self.device.write(&[key], true)
        };
        self.record(result.map(|()| on))?;
        debug!("remote switch: 0x{:02x} turned {}", self.device.address(), on);
        Ok(())
    }

    /// Read the switch state back from the peer
    pub async fn update<D: DelayNs>(&mut self, delay: &mut D) -> I2cResult<bool> {
        let mut buf = [0u8; 4];
        let result = self
            .device
            .write_then_read_deferred(&[self.keys.read], delay, RESPONSE_DELAY_US, &mut buf)
            .await
            .map(|()| RegisterValue::from_bytes(buf).as_f32() != 0.0);
        self.record(result)
    }

    fn record(&mut self, result: I2cResult<bool>) -> I2cResult<bool> {
        match result {
            Ok(on) => {
                self.state = Some(on);
                self.last_error = None;
            }
            Err(e) => {
                if self.last_error.is_none() {
                    warn!("remote switch at 0x{:02x} failed: {}", self.device.address(), e);
                }
                self.last_error = Some(e);
            }
        }
        result
    }

    /// Last known state
    pub fn state(&self) -> Option<bool> {
        self.state
    }

    pub fn last_error(&self) -> Option<ErrorCode> {
        self.last_error
    }

    pub fn keys(&self) -> SwitchKeys {
        self.keys
    }

    /// Log the client configuration
    pub fn dump_config(&self) {
        info!("Remote switch:");
        info!("  Address: 0x{:02x}", self.device.address());
        info!(
            "  Keys: read 0x{:02x}, on 0x{:02x}, off 0x{:02x}",
            self.keys.read,
            self.keys.turn_on,
            self.keys.turn_off
        );
        match self.state {
            Some(on) => info!("  State: {}", if on { "ON" } else { "OFF" }),
            None => info!("  State: unknown"),
        }
        if let Some(e) = self.last_error {
            warn!("  Last error: {}", e);
        }
    }
}
