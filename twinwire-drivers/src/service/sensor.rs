//! Sensor mirror
//!
//! Publishes a local reading under one key so a foreign controller can
//! read it.

use twinwire_core::slave::RegisterTable;
use twinwire_core::I2cResult;

/// Mirrors a local sensor value into the register table
#[derive(Debug, Clone, Copy)]
pub struct SensorMirror {
    key: u8,
}

impl SensorMirror {
    /// Create a mirror for `key`
    pub const fn new(key: u8) -> Self {
        Self { key }
    }

    /// Registry key
    pub fn key(&self) -> u8 {
        self.key
    }

    /// Register the key with an initial 0.0
    pub fn setup(&self, table: &dyn RegisterTable) -> I2cResult<()> {
        table.upsert(self.key, 0.0)
    }

    /// Publish the latest reading
    pub fn update(&self, table: &dyn RegisterTable, value: f32) -> I2cResult<()> {
        table.upsert(self.key, value)
    }

    /// Log the mirror configuration
    pub fn dump_config(&self, table: &dyn RegisterTable) {
        info!("Sensor mirror:");
        info!("  Registry key: 0x{:02x}", self.key);
        info!("  Registry value: {}", table.read(self.key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use twinwire_core::slave::Registry;

    #[test]
    fn test_setup_registers_zero() {
        let registry = Registry::<NoopRawMutex, 4>::new();
        let mirror = SensorMirror::new(0x20);
        mirror.setup(&registry).unwrap();

        assert!(registry.contains(0x20));
        assert_eq!(registry.read(0x20), 0.0);
    }

    #[test]
    fn test_update_publishes_value() {
        let registry = Registry::<NoopRawMutex, 4>::new();
        let mirror = SensorMirror::new(0x20);
        mirror.setup(&registry).unwrap();
        mirror.update(&registry, 3.14).unwrap();
        assert_eq!(registry.get(0x20).unwrap().to_bytes(), 3.14f32.to_le_bytes());
        mirror.dump_config(&registry);
    }
}
