//! Board wiring and node identity
//!
//! I2C0 on GP4/GP5 drives the shared bus as controller. I2C1 on GP6/GP7
//! answers a foreign controller at [`TARGET`]'s address.

use twinwire_core::config::{BusConfig, DeviceConfig, PinConfig, TargetConfig};
use twinwire_drivers::client::SwitchKeys;
use twinwire_hal::i2c::I2cSpeed;

/// Controller bus
pub const BUS: BusConfig = BusConfig::new(
    PinConfig::with_pullup(4),
    PinConfig::with_pullup(5),
    I2cSpeed::STANDARD.frequency,
)
.with_timeout_us(1_000);

/// Peripheral endpoint
pub const TARGET: TargetConfig = TargetConfig::new(
    PinConfig::with_pullup(6),
    PinConfig::with_pullup(7),
    0x09,
);

/// Peer node read by the remote sensor
pub const PEER: DeviceConfig = DeviceConfig::new(0x08);

/// Key read from the peer
pub const PEER_SENSOR_KEY: u8 = 0x20;

/// Peer switch that follows this node's switch
pub const PEER_SWITCH: SwitchKeys = SwitchKeys {
    read: 0x30,
    turn_on: 0x32,
    turn_off: 0x33,
};

/// Key the peer's reading is republished under
pub const MIRROR_KEY: u8 = 0x20;

/// Switch state key
pub const SWITCH_STATE_KEY: u8 = 0x30;

/// Switch toggle key
pub const SWITCH_TOGGLE_KEY: u8 = 0x31;

/// Remote sensor poll period
pub const POLL_INTERVAL_MS: u64 = 1_000;

/// Watchdog period
pub const WATCHDOG_PERIOD_MS: u64 = 2_000;
