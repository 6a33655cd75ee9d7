//! Open-drain line emulation
//!
//! The RP2040 pads have no open-drain mode. A line is driven low by
//! enabling the output with a low level, and released by switching the
//! pad back to input so the pull-up (internal or external) takes it high.

use embassy_rp::gpio::{Flex, Pin, Pull};
use embassy_rp::Peri;
use twinwire_hal::gpio::{InputPin, OpenDrainPin, OutputPin};

/// One I2C line under software control
pub struct OpenDrainLine<'d> {
    flex: Flex<'d>,
}

impl<'d> OpenDrainLine<'d> {
    /// Take over `pin`, initially released
    pub fn new(pin: Peri<'d, impl Pin>) -> Self {
        let mut flex = Flex::new(pin);
        flex.set_low();
        flex.set_as_input();
        Self { flex }
    }
}

impl OutputPin for OpenDrainLine<'_> {
    fn set_high(&mut self) {
        self.flex.set_as_input();
    }

    fn set_low(&mut self) {
        self.flex.set_low();
        self.flex.set_as_output();
    }
}

impl InputPin for OpenDrainLine<'_> {
    fn is_high(&self) -> bool {
        self.flex.is_high()
    }
}

impl OpenDrainPin for OpenDrainLine<'_> {
    fn set_open_drain(&mut self, pull_up: bool) {
        self.flex.set_pull(if pull_up { Pull::Up } else { Pull::None });
        self.flex.set_low();
        self.flex.set_as_input();
    }
}
