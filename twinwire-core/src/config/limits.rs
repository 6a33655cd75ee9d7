//! Fixed limits and timing constants

/// Ceiling the hardware accepts for the transfer timeout, in microseconds
pub const MAX_TIMEOUT_US: u32 = 13_000;

/// Bounded wait for one controller transaction, in milliseconds
///
/// Without it an unacknowledged transfer may block for up to a second.
pub const TRANSFER_WAIT_MS: u32 = 20;

/// Per-attempt wait for the peripheral transmit path, in milliseconds
pub const SEND_TIMEOUT_MS: u32 = 1000;

/// Half period of a recovery clock pulse, in microseconds (~60 kHz)
pub const RECOVERY_HALF_PERIOD_US: u32 = 7;

/// Clock pulses emitted during recovery
pub const RECOVERY_CLOCK_PULSES: u8 = 9;

/// Polls of a stretched SCL line before recovery gives up
pub const RECOVERY_STRETCH_POLLS: u16 = 250;

/// Depth of the peripheral event queue
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// Length of the zero-filled reply to a read of an unknown key
pub const MISS_RESPONSE_LEN: usize = 32;

/// Number of controller ports on the chip
pub const MAX_PORTS: usize = 2;

/// Highest clock frequency accepted (fast mode)
pub const MAX_FREQUENCY_HZ: u32 = twinwire_hal::i2c::I2cSpeed::FAST.frequency;

/// Clamp a requested transfer timeout to [`MAX_TIMEOUT_US`]
///
/// Returns the effective timeout and whether it was reduced.
pub const fn clamp_timeout(timeout_us: u32) -> (u32, bool) {
    if timeout_us > MAX_TIMEOUT_US {
        (MAX_TIMEOUT_US, true)
    } else {
        (timeout_us, false)
    }
}
