//! RP2040 implementation of the Twinwire hardware seams
//!
//! - [`gpio::OpenDrainLine`] - SDA/SCL bit-banging for bus recovery
//! - [`i2c::Rp2040Setup`] / [`i2c::Rp2040Link`] - controller role on the
//!   interrupt-driven I2C peripheral, bounded per transaction
//! - [`target::Rp2040Target`] - peripheral role on the I2C slave driver
//! - [`watchdog::Rp2040Watchdog`] - hardware watchdog feed

#![no_std]
#![deny(unsafe_code)]

mod fmt;

pub mod gpio;
pub mod i2c;
pub mod target;
pub mod watchdog;

pub use gpio::OpenDrainLine;
pub use i2c::{Rp2040Link, Rp2040Setup};
pub use target::{Rp2040Target, TargetError, TargetRequest};
pub use watchdog::Rp2040Watchdog;
