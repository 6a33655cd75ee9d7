//! Board-agnostic I2C controller and peripheral engine
//!
//! This crate contains all protocol logic that does not depend on a
//! specific chip:
//!
//! - Error taxonomy and vectored transfer segments
//! - Controller bus engine with port pool and bus recovery
//! - Device and register proxies (8-bit and 16-bit register addresses)
//! - Advisory bus guard for multi-step transactions
//! - Peripheral register engine fed by interrupt events
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod fmt;

pub mod bus;
pub mod config;
pub mod device;
pub mod guard;
pub mod slave;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use bus::{I2cBus, LinkSetup, PortId, PortPool, RecoveryOutcome};
pub use device::{I2cDevice, Register, Register16};
pub use guard::BusGuard;
pub use slave::{RegisterCallback, RegisterTable, SlaveEngine, SlaveEvent, SlaveState};
pub use transfer::{ErrorCode, I2cResult, ReadSegment, WriteSegment};
