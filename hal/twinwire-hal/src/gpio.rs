//! GPIO line abstractions
//!
//! I2C lines are open-drain: a device may only pull a line low or let go
//! of it. "High" on an [`OutputPin`] therefore means *released*, and the
//! level actually seen on the wire must be read back through
//! [`InputPin`], because another device may still be holding it low.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Release the line (open-drain) or drive it high
    fn set_high(&mut self);

    /// Drive the line low
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// Digital input pin
///
/// Implementations should handle the actual hardware register reading
/// for the specific chip.
pub trait InputPin {
    /// Check if the line reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the line reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Bidirectional open-drain line
///
/// Used while bit-banging bus recovery, before the I2C peripheral takes
/// the pins over.
pub trait OpenDrainPin: OutputPin + InputPin {
    /// Reconfigure the pin as open-drain input/output
    ///
    /// # Arguments
    /// * `pull_up` - Enable the internal pull-up resistor
    fn set_open_drain(&mut self, pull_up: bool);
}
