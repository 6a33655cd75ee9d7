//! Slave register engine
//!
//! Lets this node answer a foreign controller from a keyed register
//! table. The peripheral interrupt (or the task that stands in for it)
//! feeds [`SlaveEvent`]s through a bounded queue; a single service task
//! drains the queue and answers reads from the table.
//!
//! ```text
//!  interrupt                     service task                 application
//!  ─────────                     ────────────                 ───────────
//!  on_receive(cmd) ──Rx(cmd)──►  remember cmd ──key──►        next_write()
//!                                                             dispatch(key)
//!  on_request()    ──Tx──────►   look up cmd, write reply
//! ```
//!
//! Callbacks are never run by the engine itself. Keys with a callback
//! attached are forwarded to the application, which calls
//! [`SlaveEngine::dispatch`] from its own context.

pub mod event;
pub mod registry;

pub use event::{SlaveEvent, SlaveState};
pub use registry::{
    RegisterCallback, RegisterTable, RegisterValue, Registry, RegistryEntry,
};

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::channel::Channel;
use twinwire_hal::i2c::TargetEndpoint;

use crate::config::{validate_address, EVENT_QUEUE_DEPTH, MISS_RESPONSE_LEN, SEND_TIMEOUT_MS};
use crate::transfer::{ErrorCode, I2cResult};

/// Default register table size
pub const DEFAULT_REGISTRY_SIZE: usize = 32;

#[derive(Debug, Clone, Copy)]
struct EngineStatus {
    state: SlaveState,
    address: Option<u8>,
    last_command: Option<u8>,
    dropped: u32,
}

/// Peripheral-side register engine with room for `N` keys
pub struct SlaveEngine<M: RawMutex, const N: usize = DEFAULT_REGISTRY_SIZE> {
    status: BlockingMutex<M, RefCell<EngineStatus>>,
    events: Channel<M, SlaveEvent, EVENT_QUEUE_DEPTH>,
    writes: Channel<M, u8, EVENT_QUEUE_DEPTH>,
    registry: Registry<M, N>,
}

impl<M: RawMutex, const N: usize> Default for SlaveEngine<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> SlaveEngine<M, N> {
    /// Create an engine in the `Uninitialized` state
    pub const fn new() -> Self {
        Self {
            status: BlockingMutex::new(RefCell::new(EngineStatus {
                state: SlaveState::Uninitialized,
                address: None,
                last_command: None,
                dropped: 0,
            })),
            events: Channel::new(),
            writes: Channel::new(),
            registry: Registry::new(),
        }
    }

    /// Enable the endpoint at `address` and start serving
    ///
    /// Any failure is terminal: the engine moves to `Failed` and never
    /// retries.
    pub fn setup<E: TargetEndpoint>(&self, endpoint: &mut E, address: u8) -> I2cResult<()> {
        match self.state() {
            SlaveState::Running => return Ok(()),
            SlaveState::Failed => return Err(ErrorCode::NotInitialized),
            SlaveState::Uninitialized => {}
        }

        if let Err(e) = validate_address(address) {
            error!("i2c slave: invalid address 0x{:02x}", address);
            self.transition(false);
            return Err(e);
        }

        if endpoint.enable(address).is_err() {
            error!("i2c slave: enabling endpoint at 0x{:02x} failed", address);
            self.transition(false);
            return Err(ErrorCode::Unknown);
        }

        self.with_status(|s| s.address = Some(address));
        self.transition(true);
        info!("i2c slave: serving at 0x{:02x}", address);
        Ok(())
    }

    /// Record a failure after setup, e.g. the service task could not start
    pub fn mark_failed(&self) {
        error!("i2c slave: marked failed");
        self.transition(false);
    }

    /// Current lifecycle state
    pub fn state(&self) -> SlaveState {
        self.with_status(|s| s.state)
    }

    /// Engine is serving
    pub fn is_running(&self) -> bool {
        self.state() == SlaveState::Running
    }

    /// `Ok` while running, [`ErrorCode::NotInitialized`] otherwise
    pub fn ensure_running(&self) -> I2cResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(ErrorCode::NotInitialized)
        }
    }

    /// Address the endpoint answers, once set up
    pub fn address(&self) -> Option<u8> {
        self.with_status(|s| s.address)
    }

    /// Events lost to a full queue
    pub fn dropped_events(&self) -> u32 {
        self.with_status(|s| s.dropped)
    }

    // ---- interrupt side ----

    /// The foreign controller wrote `data`
    ///
    /// Only the first byte (the command) is kept. Never blocks.
    pub fn on_receive(&self, data: &[u8]) {
        if let Some(&command) = data.first() {
            self.enqueue(SlaveEvent::Rx(command));
        }
    }

    /// The foreign controller wants to read. Never blocks.
    pub fn on_request(&self) {
        self.enqueue(SlaveEvent::Tx);
    }

    fn enqueue(&self, event: SlaveEvent) {
        if !self.is_running() {
            return;
        }
        if self.events.try_send(event).is_err() {
            self.with_status(|s| s.dropped = s.dropped.saturating_add(1));
            warn!("i2c slave: event queue full, dropped {}", event);
        }
    }

    // ---- service task side ----

    /// Wait for one event and handle it
    pub async fn service<E: TargetEndpoint>(&self, endpoint: &mut E) {
        let event = self.events.receive().await;
        self.handle(event, endpoint).await;
    }

    /// Handle every queued event without waiting for new ones
    ///
    /// Returns the number of events handled.
    pub async fn process_pending<E: TargetEndpoint>(&self, endpoint: &mut E) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_receive() {
            self.handle(event, endpoint).await;
            handled += 1;
        }
        handled
    }

    /// Serve forever
    pub async fn run<E: TargetEndpoint>(&self, endpoint: &mut E) -> ! {
        loop {
            self.service(endpoint).await;
        }
    }

    async fn handle<E: TargetEndpoint>(&self, event: SlaveEvent, endpoint: &mut E) {
        match event {
            SlaveEvent::Rx(command) => {
                trace!("i2c slave: RX command 0x{:02x}", command);
                self.with_status(|s| s.last_command = Some(command));
                let notify = self
                    .registry
                    .get_entry(command)
                    .is_some_and(|e| e.has_callback());
                if notify && self.writes.try_send(command).is_err() {
                    warn!("i2c slave: write queue full, key 0x{:02x} dropped", command);
                }
            }
            SlaveEvent::Tx => {
                let command = self.with_status(|s| s.last_command);
                match command.and_then(|key| self.registry.get(key)) {
                    Some(value) => {
                        trace!(
                            "i2c slave: TX key 0x{:02x} = {=[u8]:02x}",
                            command.unwrap_or(0),
                            &value.as_bytes()[..]
                        );
                        self.send_all(endpoint, value.as_bytes()).await;
                    }
                    None => {
                        warn!(
                            "i2c slave: read of unknown key {}, sending zeros",
                            command
                        );
                        self.send_all(endpoint, &[0u8; MISS_RESPONSE_LEN]).await;
                    }
                }
            }
        }
    }

    /// Push `data` into the transmit path, retrying partial writes
    ///
    /// Gives up on the first write that accepts nothing or fails.
    async fn send_all<E: TargetEndpoint>(&self, endpoint: &mut E, data: &[u8]) -> bool {
        let mut sent = 0;
        while sent < data.len() {
            match endpoint.write(&data[sent..], SEND_TIMEOUT_MS).await {
                Ok(n) if n > 0 => sent += n,
                _ => {
                    error!(
                        "i2c slave: write error or timeout after {}/{} bytes",
                        sent,
                        data.len()
                    );
                    return false;
                }
            }
        }
        true
    }

    // ---- application side ----

    /// Wait for the next key written by the foreign controller that has a
    /// callback attached
    pub async fn next_write(&self) -> u8 {
        self.writes.receive().await
    }

    /// Next written key with a callback, if one is pending
    pub fn try_next_write(&self) -> Option<u8> {
        self.writes.try_receive().ok()
    }

    /// Run the callback attached to `key`
    ///
    /// The callback runs in the caller's context with the table unlocked,
    /// so it may upsert freely. Returns whether a callback ran.
    pub fn dispatch(&self, key: u8) -> bool {
        match self.registry.get_entry(key).and_then(|e| e.callback) {
            Some(callback) => {
                callback.on_write(key, &self.registry);
                true
            }
            None => false,
        }
    }

    /// Update or insert a value
    pub fn upsert(&self, key: u8, value: f32) -> I2cResult<()> {
        self.registry.upsert(key, value)
    }

    /// Value for `key`, 0.0 if absent
    pub fn read(&self, key: u8) -> f32 {
        self.registry.read(key)
    }

    /// Value for `key`, telling apart a stopped engine and a missing key
    pub fn try_read(&self, key: u8) -> I2cResult<Option<f32>> {
        self.ensure_running()?;
        Ok(self.registry.get(key).map(|v| v.as_f32()))
    }

    /// Full entry for `key`
    pub fn get_entry(&self, key: u8) -> Option<RegistryEntry> {
        self.registry.get_entry(key)
    }

    /// Attach a callback to an existing key; no-op for unknown keys
    pub fn set_callback(&self, key: u8, callback: &'static dyn RegisterCallback) -> bool {
        self.registry.set_callback(key, callback)
    }

    /// The register table
    pub fn registry(&self) -> &Registry<M, N> {
        &self.registry
    }

    /// Log address, state and table size
    pub fn dump_config(&self) {
        let status = self.with_status(|s| *s);
        info!("I2C slave:");
        match status.address {
            Some(address) => info!("  Address: 0x{:02x}", address),
            None => info!("  Address: unset"),
        }
        info!("  State: {}", status.state);
        info!("  Registry: {}/{} keys", self.registry.len(), N);
        if status.dropped > 0 {
            warn!("  Dropped events: {}", status.dropped);
        }
    }

    fn transition(&self, ok: bool) {
        self.with_status(|s| s.state = s.state.after_setup(ok));
    }

    fn with_status<R>(&self, f: impl FnOnce(&mut EngineStatus) -> R) -> R {
        self.status.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

impl<M: RawMutex, const N: usize> RegisterTable for SlaveEngine<M, N> {
    fn upsert(&self, key: u8, value: f32) -> I2cResult<()> {
        self.registry.upsert(key, value)
    }

    fn read(&self, key: u8) -> f32 {
        self.registry.read(key)
    }
}
