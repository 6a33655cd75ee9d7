//! Twinwire Hardware Abstraction Layer
//!
//! This crate defines the hardware seams the protocol engine drives. Chip
//! specific HALs (RP2040, host mocks in tests) implement them so the same
//! controller and peripheral logic runs everywhere.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (twinwire-firmware, etc.)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twinwire-core (bus, device, slave)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twinwire-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ twinwire-hal- │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OpenDrainPin`] - Raw SDA/SCL line control for bus recovery
//! - [`i2c::CommandLink`] - Controller-mode command sequence execution
//! - [`i2c::TargetEndpoint`] - Peripheral-mode transmit path
//! - [`watchdog::Watchdog`] - Feed/yield hook for long busy-waits

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod watchdog;

// Re-export key traits at crate root for convenience
pub use gpio::{InputPin, OpenDrainPin, OutputPin};
pub use i2c::{AckMode, Command, CommandLink, LinkError, TargetEndpoint};
pub use watchdog::Watchdog;
