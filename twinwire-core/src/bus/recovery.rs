//! Bus recovery
//!
//! A controller reset in the middle of a read can leave a peripheral
//! holding SDA low while it waits for clock edges that never come. Before
//! the I2C peripheral takes the pins over, the lines are bit-banged: up
//! to nine clock pulses let the peripheral finish its byte, then a START
//! followed by a STOP resets every peripheral's protocol state.

use embedded_hal::delay::DelayNs;
use twinwire_hal::gpio::OpenDrainPin;
use twinwire_hal::watchdog::Watchdog;

use crate::config::{
    RECOVERY_CLOCK_PULSES, RECOVERY_HALF_PERIOD_US, RECOVERY_STRETCH_POLLS,
};

/// Result of a recovery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecoveryOutcome {
    /// Bus released and reset with START+STOP
    Completed,
    /// A device holds SCL low
    FailedSclLow,
    /// SDA still low after all clock pulses
    FailedSdaLow,
}

impl RecoveryOutcome {
    /// Bus was recovered
    pub fn is_completed(&self) -> bool {
        matches!(self, RecoveryOutcome::Completed)
    }

    /// Human-readable description for diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            RecoveryOutcome::Completed => "bus recovered",
            RecoveryOutcome::FailedSclLow => "SCL held low by a device",
            RecoveryOutcome::FailedSdaLow => "SDA held low after clock pulses",
        }
    }
}

/// Bit-banged recovery over raw SDA/SCL lines
pub struct BusRecovery<SDA, SCL, D, W> {
    sda: SDA,
    scl: SCL,
    delay: D,
    watchdog: W,
}

impl<SDA, SCL, D, W> BusRecovery<SDA, SCL, D, W>
where
    SDA: OpenDrainPin,
    SCL: OpenDrainPin,
    D: DelayNs,
    W: Watchdog,
{
    /// Create a recovery procedure over the given lines
    pub fn new(sda: SDA, scl: SCL, delay: D, watchdog: W) -> Self {
        Self {
            sda,
            scl,
            delay,
            watchdog,
        }
    }

    /// Hand the lines back, e.g. to build the I2C peripheral from them
    pub fn release(self) -> (SDA, SCL, D, W) {
        (self.sda, self.scl, self.delay, self.watchdog)
    }

    /// Run the recovery sequence
    pub fn run(&mut self) -> RecoveryOutcome {
        self.sda.set_open_drain(true);
        self.scl.set_open_drain(true);
        self.sda.set_high();
        self.scl.set_high();
        self.half_period();

        if self.scl.is_low() {
            error!("i2c recovery: SCL is held low, cannot recover");
            return RecoveryOutcome::FailedSclLow;
        }

        for pulse in 0..RECOVERY_CLOCK_PULSES {
            self.scl.set_low();
            self.half_period();
            self.scl.set_high();
            self.half_period();

            if !self.wait_scl_released() {
                error!(
                    "i2c recovery: SCL stretched past the wait window on pulse {}",
                    pulse
                );
                return RecoveryOutcome::FailedSclLow;
            }
        }

        if self.sda.is_low() {
            error!("i2c recovery: SDA still held low after clock pulses");
            return RecoveryOutcome::FailedSdaLow;
        }

        // START (SDA falls while SCL is high) then STOP (SDA rises while SCL is high)
        self.sda.set_low();
        self.half_period();
        self.sda.set_high();
        self.half_period();

        debug!("i2c recovery: bus released");
        RecoveryOutcome::Completed
    }

    /// Poll SCL until a clock-stretching device lets go
    fn wait_scl_released(&mut self) -> bool {
        let mut polls = 0u16;
        while self.scl.is_low() {
            if polls >= RECOVERY_STRETCH_POLLS {
                return false;
            }
            self.delay.delay_us(RECOVERY_HALF_PERIOD_US * 2);
            self.watchdog.feed();
            polls += 1;
        }
        true
    }

    fn half_period(&mut self) {
        self.delay.delay_us(RECOVERY_HALF_PERIOD_US);
    }
}
