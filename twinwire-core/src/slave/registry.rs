//! Keyed register table
//!
//! Maps a one-byte key (the command byte a foreign controller sends) to a
//! four-byte value and an optional write callback. Values travel as
//! little-endian IEEE-754 `f32`. The table has its own lock so the
//! service task and application pollers can both update it.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use heapless::FnvIndexMap;

use crate::transfer::{ErrorCode, I2cResult};

/// Raw four-byte register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterValue([u8; 4]);

impl RegisterValue {
    /// Value reported for missing keys
    pub const ZERO: Self = Self([0; 4]);

    /// Encode a float
    pub fn from_f32(value: f32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Decode as a float
    pub fn as_f32(&self) -> f32 {
        f32::from_le_bytes(self.0)
    }

    /// Wrap wire bytes
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Bytes as sent on the wire
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0
    }

    /// Borrow the wire bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<f32> for RegisterValue {
    fn from(value: f32) -> Self {
        Self::from_f32(value)
    }
}

/// Read/write access to a register table
///
/// Handed to callbacks so they can re-publish dependent keys.
pub trait RegisterTable {
    /// Update or insert a value
    fn upsert(&self, key: u8, value: f32) -> I2cResult<()>;

    /// Value for `key`, 0.0 if absent
    fn read(&self, key: u8) -> f32;
}

/// Reaction to a foreign controller selecting a key
pub trait RegisterCallback: Sync {
    /// Called by the application after the key was written
    fn on_write(&self, key: u8, table: &dyn RegisterTable);
}

/// One slot of the table
#[derive(Clone, Copy)]
pub struct RegistryEntry {
    /// Current value
    pub value: RegisterValue,
    /// Attached callback, if any
    pub callback: Option<&'static dyn RegisterCallback>,
}

impl RegistryEntry {
    fn new(value: RegisterValue) -> Self {
        Self {
            value,
            callback: None,
        }
    }

    /// Entry has a callback attached
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

impl core::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("value", &self.value)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Lock-protected register table with room for `N` keys
///
/// `N` must be a power of two.
pub struct Registry<M: RawMutex, const N: usize> {
    table: BlockingMutex<M, RefCell<FnvIndexMap<u8, RegistryEntry, N>>>,
}

impl<M: RawMutex, const N: usize> Default for Registry<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> Registry<M, N> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            table: BlockingMutex::new(RefCell::new(FnvIndexMap::new())),
        }
    }

    /// Update a value in place or insert a new entry
    ///
    /// An existing callback is kept. Fails with [`ErrorCode::TooLarge`]
    /// when the key is new and the table is full.
    pub fn upsert(&self, key: u8, value: f32) -> I2cResult<()> {
        self.upsert_raw(key, RegisterValue::from_f32(value))
    }

    /// [`upsert`](Self::upsert) with wire bytes
    pub fn upsert_raw(&self, key: u8, value: RegisterValue) -> I2cResult<()> {
        self.with_table(|table| {
            if let Some(entry) = table.get_mut(&key) {
                entry.value = value;
                return Ok(());
            }
            table
                .insert(key, RegistryEntry::new(value))
                .map(|_| ())
                .map_err(|_| {
                    warn!("i2c slave: registry full, dropping key 0x{:02x}", key);
                    ErrorCode::TooLarge
                })
        })
    }

    /// Value for `key`, or 0.0 if the key was never upserted
    ///
    /// A 0.0 result does not prove the key exists; use
    /// [`get_entry`](Self::get_entry) for that. Never inserts.
    pub fn read(&self, key: u8) -> f32 {
        self.get(key).map(|v| v.as_f32()).unwrap_or(0.0)
    }

    /// Wire bytes for `key`, if present
    pub fn get(&self, key: u8) -> Option<RegisterValue> {
        self.get_entry(key).map(|e| e.value)
    }

    /// Full entry for `key`, including its callback
    pub fn get_entry(&self, key: u8) -> Option<RegistryEntry> {
        self.with_table(|table| table.get(&key).copied())
    }

    /// Attach a callback to an existing key
    ///
    /// Does nothing if the key has not been upserted yet; a later upsert
    /// does not pick the callback up. Returns whether it was attached.
    pub fn set_callback(&self, key: u8, callback: &'static dyn RegisterCallback) -> bool {
        self.with_table(|table| match table.get_mut(&key) {
            Some(entry) => {
                entry.callback = Some(callback);
                true
            }
            None => {
                debug!("i2c slave: no key 0x{:02x} to attach callback to", key);
                false
            }
        })
    }

    /// Key is present
    pub fn contains(&self, key: u8) -> bool {
        self.with_table(|table| table.contains_key(&key))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.with_table(|table| table.len())
    }

    /// Table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Room for `N` keys
    pub const fn capacity(&self) -> usize {
        N
    }

    fn with_table<R>(&self, f: impl FnOnce(&mut FnvIndexMap<u8, RegistryEntry, N>) -> R) -> R {
        self.table.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

impl<M: RawMutex, const N: usize> RegisterTable for Registry<M, N> {
    fn upsert(&self, key: u8, value: f32) -> I2cResult<()> {
        Registry::upsert(self, key, value)
    }

    fn read(&self, key: u8) -> f32 {
        Registry::read(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    type TestRegistry = Registry<NoopRawMutex, 8>;

    struct Counter(AtomicU8);

    impl RegisterCallback for Counter {
        fn on_write(&self, _key: u8, _table: &dyn RegisterTable) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    static COUNTER: Counter = Counter(AtomicU8::new(0));

    #[test]
    fn test_upsert_then_read() {
        let reg = TestRegistry::new();
        reg.upsert(0x20, 3.14).unwrap();
        assert_eq!(reg.read(0x20), 3.14);
        reg.upsert(0x20, -1.5).unwrap();
        assert_eq!(reg.read(0x20), -1.5);
        reg.upsert(0x20, -1.5).unwrap();
        assert_eq!(reg.read(0x20), -1.5);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_missing_key_reads_zero_without_insert() {
        let reg = TestRegistry::new();
        assert_eq!(reg.read(0x42), 0.0);
        assert!(reg.get_entry(0x42).is_none());
        assert!(!reg.contains(0x42));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_callback_requires_existing_key() {
        let reg = TestRegistry::new();
        assert!(!reg.set_callback(0x30, &COUNTER));
        reg.upsert(0x30, 1.0).unwrap();
        assert!(!reg.get_entry(0x30).unwrap().has_callback());

        assert!(reg.set_callback(0x30, &COUNTER));
        assert!(reg.get_entry(0x30).unwrap().has_callback());
    }

    #[test]
    fn test_upsert_keeps_callback() {
        let reg = TestRegistry::new();
        reg.upsert(0x31, 0.0).unwrap();
        reg.set_callback(0x31, &COUNTER);
        reg.upsert(0x31, 1.0).unwrap();

        let entry = reg.get_entry(0x31).unwrap();
        assert_eq!(entry.value.as_f32(), 1.0);
        assert!(entry.has_callback());
    }

    #[test]
    fn test_full_table() {
        let reg = Registry::<NoopRawMutex, 2>::new();
        reg.upsert(1, 1.0).unwrap();
        reg.upsert(2, 2.0).unwrap();
        assert_eq!(reg.upsert(3, 3.0), Err(ErrorCode::TooLarge));
        // Existing keys still update
        assert!(reg.upsert(1, 5.0).is_ok());
        assert_eq!(reg.read(1), 5.0);
        assert_eq!(reg.capacity(), 2);
    }

    #[test]
    fn test_value_encoding_is_little_endian() {
        let value = RegisterValue::from_f32(3.14);
        assert_eq!(value.to_bytes(), 3.14f32.to_le_bytes());
        assert_eq!(value.to_bytes(), [0xC3, 0xF5, 0x48, 0x40]);
        assert_eq!(RegisterValue::from_bytes(value.to_bytes()).as_f32(), 3.14);
        assert_eq!(RegisterValue::ZERO.as_f32(), 0.0);
    }

    #[test]
    fn test_table_trait_object() {
        let reg = TestRegistry::new();
        let table: &dyn RegisterTable = &reg;
        table.upsert(0x01, 2.5).unwrap();
        assert_eq!(table.read(0x01), 2.5);
        assert_eq!(table.read(0x02), 0.0);
    }

    proptest! {
        #[test]
        fn prop_upsert_read_round_trip(key in any::<u8>(), value in any::<f32>(), other in any::<f32>()) {
            let reg = TestRegistry::new();
            reg.upsert(key, other).unwrap();
            reg.upsert(key, value).unwrap();
            prop_assert_eq!(reg.read(key).to_bits(), value.to_bits());
            prop_assert_eq!(reg.len(), 1);
        }
    }
}
