//! Toggle switch
//!
//! Exposes an on/off switch through two keys:
//!
//! - the *state* key reports the current state (1.0 on, 0.0 off)
//! - the *toggle* key has a callback attached; a foreign controller
//!   selecting it flips the switch, and reading it back returns the new
//!   state
//!
//! Both keys are re-published whenever the switch changes so they never
//! disagree.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use twinwire_core::slave::{RegisterCallback, RegisterTable, SlaveEngine};
use twinwire_core::{ErrorCode, I2cResult};

fn encode(on: bool) -> f32 {
    if on {
        1.0
    } else {
        0.0
    }
}

/// Switch mirrored into a state key and a toggle key
#[derive(Debug)]
pub struct ToggleSwitch {
    state_key: u8,
    toggle_key: u8,
    on: AtomicBool,
}

impl ToggleSwitch {
    /// Create a switch, initially off
    pub const fn new(state_key: u8, toggle_key: u8) -> Self {
        Self {
            state_key,
            toggle_key,
            on: AtomicBool::new(false),
        }
    }

    /// Key reporting the state
    pub fn state_key(&self) -> u8 {
        self.state_key
    }

    /// Key that flips the switch
    pub fn toggle_key(&self) -> u8 {
        self.toggle_key
    }

    /// Switch is on
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }

    /// Change the switch locally
    ///
    /// The table catches up on the next [`update`](Self::update).
    pub fn set(&self, on: bool) {
        self.on.store(on, Ordering::Relaxed);
    }

    /// Publish both keys and attach the toggle callback
    ///
    /// Keys must exist before the callback can be attached, so they are
    /// upserted first.
    pub fn setup<M: RawMutex, const N: usize>(
        &'static self,
        engine: &SlaveEngine<M, N>,
    ) -> I2cResult<()> {
        self.publish(engine)?;
        if !engine.set_callback(self.toggle_key, self) {
            warn!("toggle switch: key 0x{:02x} missing, callback not attached", self.toggle_key);
            return Err(ErrorCode::Unknown);
        }
        Ok(())
    }

    /// Re-publish both keys if the switch changed locally
    ///
    /// Returns whether the table was updated.
    pub fn update(&self, table: &dyn RegisterTable) -> I2cResult<bool> {
        let on = encode(self.is_on());
        if table.read(self.state_key) == on && table.read(self.toggle_key) == on {
            return Ok(false);
        }
        self.publish(table)?;
        Ok(true)
    }

    fn publish(&self, table: &dyn RegisterTable) -> I2cResult<()> {
        let on = encode(self.is_on());
        table.upsert(self.state_key, on)?;
        table.upsert(self.toggle_key, on)
    }

    /// Log the switch configuration
    pub fn dump_config(&self) {
        info!("Toggle switch:");
        info!("  State key: 0x{:02x}", self.state_key);
        info!("  Toggle key: 0x{:02x}", self.toggle_key);
        info!("  State: {}", if self.is_on() { "ON" } else { "OFF" });
    }
}

impl RegisterCallback for ToggleSwitch {
    fn on_write(&self, _key: u8, table: &dyn RegisterTable) {
        let on = !self.is_on();
        self.set(on);
        debug!("toggle switch: key 0x{:02x} flipped to {}", self.toggle_key, on);
        if self.publish(table).is_err() {
            warn!("toggle switch: publishing state failed");
        }
    }
}
