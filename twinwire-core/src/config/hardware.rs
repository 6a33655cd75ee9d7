//! Hardware configuration types
//!
//! These types define the pins, clock and addresses of the controller
//! buses and peripheral targets a board wires up.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::limits::MAX_FREQUENCY_HZ;
use crate::transfer::{ErrorCode, I2cResult, MAX_ADDRESS};

/// Pin configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO pin number (0-29 for RP2040)
    pub pin: u8,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinConfig {
    /// Create a new pin config without pull-up
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            pull_up: false,
        }
    }

    /// Create a pin with pull-up enabled
    pub const fn with_pullup(pin: u8) -> Self {
        Self { pin, pull_up: true }
    }
}

/// Controller bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Data line
    pub sda: PinConfig,
    /// Clock line
    pub scl: PinConfig,
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Transfer timeout in microseconds (0 = hardware default)
    pub timeout_us: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new(PinConfig::with_pullup(4), PinConfig::with_pullup(5), 100_000)
    }
}

impl BusConfig {
    /// Create a bus config with the hardware default timeout
    pub const fn new(sda: PinConfig, scl: PinConfig, frequency: u32) -> Self {
        Self {
            sda,
            scl,
            frequency,
            timeout_us: 0,
        }
    }

    /// Set the transfer timeout
    pub const fn with_timeout_us(mut self, timeout_us: u32) -> Self {
        self.timeout_us = timeout_us;
        self
    }

    /// Check pins and frequency
    pub fn validate(&self) -> I2cResult<()> {
        validate_lines(&self.sda, &self.scl)?;
        if self.frequency == 0 || self.frequency > MAX_FREQUENCY_HZ {
            return Err(ErrorCode::InvalidArgument);
        }
        Ok(())
    }
}

/// Peripheral (target) configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetConfig {
    /// Data line
    pub sda: PinConfig,
    /// Clock line
    pub scl: PinConfig,
    /// 7-bit address this node answers
    pub address: u8,
}

impl TargetConfig {
    /// Create a target config
    pub const fn new(sda: PinConfig, scl: PinConfig, address: u8) -> Self {
        Self { sda, scl, address }
    }

    /// Check pins and address
    pub fn validate(&self) -> I2cResult<()> {
        validate_lines(&self.sda, &self.scl)?;
        validate_address(self.address)
    }
}

/// Device on a controller bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    /// 7-bit device address
    pub address: u8,
}

impl DeviceConfig {
    /// Create a device config
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    /// Check the address
    pub fn validate(&self) -> I2cResult<()> {
        validate_address(self.address)
    }
}

fn validate_lines(sda: &PinConfig, scl: &PinConfig) -> I2cResult<()> {
    if sda.pin == scl.pin {
        return Err(ErrorCode::InvalidArgument);
    }
    Ok(())
}

/// Reject addresses outside the 7-bit range
pub fn validate_address(address: u8) -> I2cResult<()> {
    if address > MAX_ADDRESS {
        return Err(ErrorCode::InvalidArgument);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bus_is_valid() {
        let cfg = BusConfig::default();
        assert_eq!(cfg.sda.pin, 4);
        assert_eq!(cfg.scl.pin, 5);
        assert_eq!(cfg.frequency, 100_000);
        assert_eq!(cfg.timeout_us, 0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_bus_rejects_bad_frequency() {
        let sda = PinConfig::with_pullup(4);
        let scl = PinConfig::with_pullup(5);
        assert!(BusConfig::new(sda, scl, 400_000).validate().is_ok());
        assert_eq!(
            BusConfig::new(sda, scl, 1_000_000).validate(),
            Err(ErrorCode::InvalidArgument)
        );
        assert_eq!(
            BusConfig::new(sda, scl, 0).validate(),
            Err(ErrorCode::InvalidArgument)
        );
    }

    #[test]
    fn test_shared_pin_rejected() {
        let pin = PinConfig::new(4);
        assert_eq!(
            BusConfig::new(pin, pin, 100_000).validate(),
            Err(ErrorCode::InvalidArgument)
        );
        assert_eq!(
            TargetConfig::new(pin, pin, 0x10).validate(),
            Err(ErrorCode::InvalidArgument)
        );
    }

    #[test]
    fn test_address_range() {
        assert!(DeviceConfig::new(0x7F).validate().is_ok());
        assert_eq!(
            DeviceConfig::new(0x80).validate(),
            Err(ErrorCode::InvalidArgument)
        );
        let target = TargetConfig::new(PinConfig::new(6), PinConfig::new(7), 0xA0);
        assert_eq!(target.validate(), Err(ErrorCode::InvalidArgument));
    }

    #[test]
    fn test_timeout_builder() {
        let cfg = BusConfig::default().with_timeout_us(5_000);
        assert_eq!(cfg.timeout_us, 5_000);
    }
}
