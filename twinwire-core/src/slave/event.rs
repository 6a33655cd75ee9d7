//! Peripheral events and engine lifecycle

/// Bus event raised by the peripheral interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlaveEvent {
    /// The foreign controller wrote; carries the command byte (registry key)
    Rx(u8),
    /// The foreign controller wants to read the last selected key
    Tx,
}

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlaveState {
    /// Not set up yet
    Uninitialized,
    /// Endpoint enabled and serving
    Running,
    /// Setup failed; terminal
    Failed,
}

impl SlaveState {
    /// Next state after a setup attempt
    ///
    /// `Failed` is terminal and a running engine stays running.
    pub fn after_setup(self, ok: bool) -> Self {
        match (self, ok) {
            (SlaveState::Uninitialized, true) => SlaveState::Running,
            (SlaveState::Uninitialized, false) => SlaveState::Failed,
            (SlaveState::Running, false) => SlaveState::Failed,
            (state, _) => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_transitions() {
        assert_eq!(
            SlaveState::Uninitialized.after_setup(true),
            SlaveState::Running
        );
        assert_eq!(
            SlaveState::Uninitialized.after_setup(false),
            SlaveState::Failed
        );
        assert_eq!(SlaveState::Running.after_setup(false), SlaveState::Failed);
    }

    #[test]
    fn test_failed_is_terminal() {
        assert_eq!(SlaveState::Failed.after_setup(true), SlaveState::Failed);
        assert_eq!(SlaveState::Failed.after_setup(false), SlaveState::Failed);
    }
}
