//! Master bus engine
//!
//! One [`I2cBus`] owns one physical controller port. Setup allocates the
//! port from a [`PortPool`], runs [`BusRecovery`] and then configures the
//! peripheral through a platform-provided [`LinkSetup`]. Afterwards
//! [`I2cBus::readv`] and [`I2cBus::writev`] turn an address and a list of
//! buffers into a START / address / data / STOP command sequence and
//! execute it with a bounded wait.
//!
//! Transport failures are returned to the caller and never retried here.

pub mod fold;
pub mod pool;
pub mod recovery;

pub use fold::CommandFolder;
pub use pool::{PortId, PortPool};
pub use recovery::{BusRecovery, RecoveryOutcome};

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use heapless::Vec;
use twinwire_hal::i2c::{AckMode, Command, CommandLink, LinkError};

use crate::config::{clamp_timeout, BusConfig, TRANSFER_WAIT_MS};
use crate::guard::BusGuard;
use crate::transfer::{
    address_byte, last_non_empty, Direction, ErrorCode, I2cResult, ReadSegment, WriteSegment,
    MAX_SEGMENTS,
};

/// START, address byte and STOP around the data segments
const COMMAND_CAPACITY: usize = MAX_SEGMENTS + 3;

type CommandList<'a> = Vec<Command<'a>, COMMAND_CAPACITY>;

/// Platform hook that brings a controller port up
///
/// The platform owns the pins: it bit-bangs them for recovery and then
/// hands them to the I2C peripheral. [`I2cBus::initialize`] calls
/// [`recover`](LinkSetup::recover) first and
/// [`configure`](LinkSetup::configure) second.
pub trait LinkSetup {
    /// Configured controller link
    type Link: CommandLink;

    /// Run bus recovery on the raw lines
    fn recover(&mut self) -> RecoveryOutcome;

    /// Configure the peripheral for `port` and return the link
    fn configure(self, port: PortId, config: &BusConfig) -> Result<Self::Link, LinkError>;
}

struct BusState<L> {
    link: Option<L>,
    port: Option<PortId>,
    failed: bool,
    recovery: Option<RecoveryOutcome>,
    timeout_us: u32,
}

/// Snapshot of a bus for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStatus {
    /// Configuration the bus was created with
    pub config: BusConfig,
    /// Allocated port, if setup got that far
    pub port: Option<PortId>,
    /// Ready for transfers
    pub initialized: bool,
    /// Setup failed permanently
    pub failed: bool,
    /// Recovery result, if recovery ran
    pub recovery: Option<RecoveryOutcome>,
    /// Effective transfer timeout after clamping (0 = hardware default)
    pub timeout_us: u32,
}

/// Controller-side I2C bus
///
/// Transfers take `&self`, so the bus can be shared between any number of
/// [`I2cDevice`](crate::device::I2cDevice) handles. Each transfer is
/// atomic; callers that need several transfers to run back to back take
/// the advisory [`BusGuard`] with [`lock`](Self::lock).
pub struct I2cBus<M: RawMutex, L> {
    config: BusConfig,
    state: BlockingMutex<M, RefCell<BusState<L>>>,
    guard: Mutex<M, ()>,
}

impl<M: RawMutex, L: CommandLink> I2cBus<M, L> {
    /// Create an uninitialized bus
    pub const fn new(config: BusConfig) -> Self {
        Self {
            config,
            state: BlockingMutex::new(RefCell::new(BusState {
                link: None,
                port: None,
                failed: false,
                recovery: None,
                timeout_us: 0,
            })),
            guard: Mutex::new(()),
        }
    }

    /// Bring the bus up
    ///
    /// Allocates a port, runs recovery, configures the peripheral and
    /// applies the timeout. Recovery failure is recorded but does not stop
    /// setup. Any other failure marks the bus unusable for good: every
    /// later transfer returns [`ErrorCode::NotInitialized`].
    pub fn initialize<S, const N: usize>(&self, pool: &mut PortPool<N>, mut setup: S) -> I2cResult<()>
    where
        S: LinkSetup<Link = L>,
    {
        if self.is_initialized() {
            return Ok(());
        }
        if self.is_failed() {
            return Err(ErrorCode::NotInitialized);
        }

        if let Err(e) = self.config.validate() {
            error!("i2c: invalid bus configuration {}", self.config);
            return self.fail(e);
        }

        let Some(port) = pool.allocate() else {
            error!("i2c: no free controller port");
            return self.fail(ErrorCode::TooLarge);
        };
        self.with_state(|s| s.port = Some(port));

        let (timeout_us, clamped) = clamp_timeout(self.config.timeout_us);
        if clamped {
            warn!(
                "i2c: timeout {} us exceeds limit, clamped to {} us",
                self.config.timeout_us,
                timeout_us
            );
        }

        let outcome = setup.recover();
        self.with_state(|s| s.recovery = Some(outcome));
        if !outcome.is_completed() {
            error!("i2c: recovery failed ({}), configuring anyway", outcome.describe());
        }

        let mut link = match setup.configure(port, &self.config) {
            Ok(link) => link,
            Err(e) => {
                error!("i2c: port {} configuration failed: {}", port, e);
                return self.fail(e.into());
            }
        };

        if timeout_us != 0 {
            if let Err(e) = link.set_timeout(timeout_us) {
                error!("i2c: setting timeout failed: {}", e);
                return self.fail(e.into());
            }
        }

        self.with_state(|s| {
            s.timeout_us = timeout_us;
            s.link = Some(link);
        });

        info!(
            "i2c: port {} ready (SDA {}, SCL {}, {} Hz)",
            port,
            self.config.sda.pin,
            self.config.scl.pin,
            self.config.frequency
        );
        Ok(())
    }

    /// Read into one or more buffers in a single transaction
    ///
    /// Every byte is ACKed except the final byte of the last non-empty
    /// segment, which is NACKed to release the bus. Zero-length segments
    /// are skipped.
    pub fn readv(&self, address: u8, segments: &mut [ReadSegment<'_>]) -> I2cResult<()> {
        if !self.is_initialized() {
            return Err(ErrorCode::NotInitialized);
        }
        if segments.len() > MAX_SEGMENTS {
            return Err(ErrorCode::TooLarge);
        }
        let addr = address_byte(address, Direction::Read)?;
        let last = last_non_empty(segments);

        let result = self.with_link(|link| {
            let mut commands = CommandList::new();
            push(&mut commands, Command::Start, "start")?;
            push(
                &mut commands,
                Command::WriteByte {
                    byte: addr,
                    ack_check: true,
                },
                "address",
            )?;
            for (i, segment) in segments.iter_mut().enumerate() {
                if segment.is_empty() {
                    continue;
                }
                let ack = if Some(i) == last {
                    AckMode::LastNack
                } else {
                    AckMode::Ack
                };
                push(
                    &mut commands,
                    Command::Read {
                        buf: &mut *segment.0,
                        ack,
                    },
                    "read",
                )?;
            }
            push(&mut commands, Command::Stop, "stop")?;
            link.execute(&mut commands, TRANSFER_WAIT_MS)
                .map_err(ErrorCode::from)
        });

        if let Err(e) = result {
            trace!("i2c: read from 0x{:02x} failed: {}", address, e);
        }
        result
    }

    /// Write one or more buffers in a single transaction
    ///
    /// With `send_stop` false the bus is left open so an immediately
    /// following read starts with a repeated START.
    pub fn writev(&self, address: u8, segments: &[WriteSegment<'_>], send_stop: bool) -> I2cResult<()> {
        if !self.is_initialized() {
            return Err(ErrorCode::NotInitialized);
        }
        if segments.len() > MAX_SEGMENTS {
            return Err(ErrorCode::TooLarge);
        }
        let addr = address_byte(address, Direction::Write)?;

        let result = self.with_link(|link| {
            let mut commands = CommandList::new();
            push(&mut commands, Command::Start, "start")?;
            push(
                &mut commands,
                Command::WriteByte {
                    byte: addr,
                    ack_check: true,
                },
                "address",
            )?;
            for segment in segments.iter().filter(|s| !s.is_empty()) {
                push(
                    &mut commands,
                    Command::Write {
                        data: segment.0,
                        ack_check: true,
                    },
                    "write",
                )?;
            }
            if send_stop {
                push(&mut commands, Command::Stop, "stop")?;
            }
            link.execute(&mut commands, TRANSFER_WAIT_MS)
                .map_err(ErrorCode::from)
        });

        if let Err(e) = result {
            trace!("i2c: write to 0x{:02x} failed: {}", address, e);
            for segment in segments {
                trace!("  {=[u8]:02x}", segment.0);
            }
        }
        result
    }

    /// Read into a single buffer
    pub fn read(&self, address: u8, buf: &mut [u8]) -> I2cResult<()> {
        self.readv(address, &mut [ReadSegment(buf)])
    }

    /// Write a single buffer
    pub fn write(&self, address: u8, data: &[u8], send_stop: bool) -> I2cResult<()> {
        self.writev(address, &[WriteSegment(data)], send_stop)
    }

    /// Wait for exclusive use of the bus
    ///
    /// Transfers do not check the guard themselves; it only orders callers
    /// that all take it.
    pub async fn lock(&self) -> BusGuard<'_, M> {
        BusGuard::new(self.guard.lock().await)
    }

    /// Take the guard if nobody holds it
    pub fn try_lock(&self) -> Option<BusGuard<'_, M>> {
        self.guard.try_lock().ok().map(BusGuard::new)
    }

    /// Bus is ready for transfers
    pub fn is_initialized(&self) -> bool {
        self.with_state(|s| s.link.is_some())
    }

    /// Setup failed permanently
    pub fn is_failed(&self) -> bool {
        self.with_state(|s| s.failed)
    }

    /// Recovery result, if setup ran recovery
    pub fn recovery_outcome(&self) -> Option<RecoveryOutcome> {
        self.with_state(|s| s.recovery)
    }

    /// Allocated port, if any
    pub fn port(&self) -> Option<PortId> {
        self.with_state(|s| s.port)
    }

    /// Configuration the bus was created with
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Diagnostic snapshot
    pub fn status(&self) -> BusStatus {
        self.with_state(|s| BusStatus {
            config: self.config,
            port: s.port,
            initialized: s.link.is_some(),
            failed: s.failed,
            recovery: s.recovery,
            timeout_us: s.timeout_us,
        })
    }

    /// Log the bus configuration and setup results
    pub fn dump_config(&self) {
        let status = self.status();
        info!("I2C bus:");
        info!("  SDA pin: {}", status.config.sda.pin);
        info!("  SCL pin: {}", status.config.scl.pin);
        info!("  Frequency: {} Hz", status.config.frequency);
        if status.timeout_us != 0 {
            info!("  Timeout: {} us", status.timeout_us);
        }
        match status.recovery {
            Some(outcome) => info!("  Recovery: {}", outcome.describe()),
            None => info!("  Recovery: not run"),
        }
        if status.failed {
            error!("  Setup failed, bus unusable");
        }
    }

    fn fail(&self, e: ErrorCode) -> I2cResult<()> {
        self.with_state(|s| {
            s.failed = true;
            s.link = None;
        });
        Err(e)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BusState<L>) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    fn with_link<R>(&self, f: impl FnOnce(&mut L) -> I2cResult<R>) -> I2cResult<R> {
        self.with_state(|s| match s.link.as_mut() {
            Some(link) => f(link),
            None => Err(ErrorCode::NotInitialized),
        })
    }
}

fn push<'a>(commands: &mut CommandList<'a>, command: Command<'a>, step: &'static str) -> I2cResult<()> {
    commands.push(command).map_err(|_| {
        trace!("i2c: command list full at {} step", step);
        ErrorCode::Unknown
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PinConfig, MAX_TIMEOUT_US};
    use crate::testing::{MockLink, MockSetup, SetupStep, SharedRecorder, Wire};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use proptest::prelude::*;
    use std::vec::Vec;

    type TestBus = I2cBus<NoopRawMutex, MockLink>;

    fn config() -> BusConfig {
        BusConfig::new(PinConfig::with_pullup(4), PinConfig::with_pullup(5), 100_000)
    }

    fn ready_bus() -> (TestBus, SharedRecorder) {
        let rec = SharedRecorder::default();
        let bus = TestBus::new(config());
        let mut pool = PortPool::<2>::new();
        bus.initialize(&mut pool, MockSetup::new(&rec)).unwrap();
        rec.borrow_mut().steps.clear();
        (bus, rec)
    }

    #[test]
    fn test_initialize_order() {
        let rec = SharedRecorder::default();
        let bus = TestBus::new(config().with_timeout_us(5_000));
        let mut pool = PortPool::<2>::new();

        assert!(bus.initialize(&mut pool, MockSetup::new(&rec)).is_ok());
        assert!(bus.is_initialized());
        assert_eq!(bus.port().map(PortId::index), Some(0));
        assert_eq!(bus.recovery_outcome(), Some(RecoveryOutcome::Completed));
        assert_eq!(
            rec.borrow().steps,
            [
                SetupStep::Recover,
                SetupStep::Configure(0),
                SetupStep::SetTimeout(5_000)
            ]
        );
    }

    #[test]
    fn test_zero_timeout_not_applied() {
        let rec = SharedRecorder::default();
        let bus = TestBus::new(config());
        let mut pool = PortPool::<2>::new();
        bus.initialize(&mut pool, MockSetup::new(&rec)).unwrap();
        assert!(!rec
            .borrow()
            .steps
            .iter()
            .any(|s| matches!(s, SetupStep::SetTimeout(_))));
    }

    #[test]
    fn test_timeout_clamped() {
        let rec = SharedRecorder::default();
        let bus = TestBus::new(config().with_timeout_us(100_000));
        let mut pool = PortPool::<2>::new();
        bus.initialize(&mut pool, MockSetup::new(&rec)).unwrap();
        assert!(rec
            .borrow()
            .steps
            .contains(&SetupStep::SetTimeout(MAX_TIMEOUT_US)));
        assert_eq!(bus.status().timeout_us, MAX_TIMEOUT_US);
    }

    #[test]
    fn test_pool_exhaustion_is_permanent() {
        let rec = SharedRecorder::default();
        let mut pool = PortPool::<1>::new();
        let first = TestBus::new(config());
        let second = TestBus::new(config());

        first.initialize(&mut pool, MockSetup::new(&rec)).unwrap();
        assert_eq!(
            second.initialize(&mut pool, MockSetup::new(&rec)),
            Err(ErrorCode::TooLarge)
        );
        assert!(second.is_failed());
        assert_eq!(second.read(0x42, &mut [0u8; 1]), Err(ErrorCode::NotInitialized));

        // No retry, even with a fresh pool
        let mut fresh = PortPool::<1>::new();
        assert_eq!(
            second.initialize(&mut fresh, MockSetup::new(&rec)),
            Err(ErrorCode::NotInitialized)
        );
        assert_eq!(fresh.remaining(), 1);
    }

    #[test]
    fn test_recovery_failure_does_not_abort_setup() {
        let rec = SharedRecorder::default();
        let bus = TestBus::new(config());
        let mut pool = PortPool::<2>::new();
        let mut setup = MockSetup::new(&rec);
        setup.outcome = RecoveryOutcome::FailedSdaLow;

        assert!(bus.initialize(&mut pool, setup).is_ok());
        assert!(bus.is_initialized());
        assert_eq!(bus.recovery_outcome(), Some(RecoveryOutcome::FailedSdaLow));
    }

    #[test]
    fn test_configure_failure_marks_unusable() {
        let rec = SharedRecorder::default();
        let bus = TestBus::new(config());
        let mut pool = PortPool::<2>::new();
        let mut setup = MockSetup::new(&rec);
        setup.configure_result = Err(LinkError::Other);

        assert_eq!(bus.initialize(&mut pool, setup), Err(ErrorCode::Unknown));
        assert!(bus.is_failed());
        assert!(!bus.is_initialized());
        assert_eq!(bus.write(0x42, &[1], true), Err(ErrorCode::NotInitialized));
        assert!(rec.borrow().transactions.is_empty());
    }

    #[test]
    fn test_timeout_failure_marks_unusable() {
        let rec = SharedRecorder::default();
        let bus = TestBus::new(config().with_timeout_us(1_000));
        let mut pool = PortPool::<2>::new();
        let mut setup = MockSetup::new(&rec);
        setup.timeout_result = Err(LinkError::Other);

        assert!(bus.initialize(&mut pool, setup).is_err());
        assert!(bus.is_failed());
        assert_eq!(bus.read(0x42, &mut [0u8; 2]), Err(ErrorCode::NotInitialized));
    }

    #[test]
    fn test_invalid_config_marks_unusable() {
        let rec = SharedRecorder::default();
        let pin = PinConfig::with_pullup(4);
        let bus = TestBus::new(BusConfig::new(pin, pin, 100_000));
        let mut pool = PortPool::<2>::new();

        assert_eq!(
            bus.initialize(&mut pool, MockSetup::new(&rec)),
            Err(ErrorCode::InvalidArgument)
        );
        assert!(bus.is_failed());
        assert_eq!(pool.remaining(), 2);
        assert!(rec.borrow().steps.is_empty());
    }

    #[test]
    fn test_uninitialized_bus_short_circuits() {
        let bus = TestBus::new(config());
        assert_eq!(bus.read(0x42, &mut [0u8; 1]), Err(ErrorCode::NotInitialized));
        assert_eq!(bus.write(0x42, &[1], true), Err(ErrorCode::NotInitialized));
        assert!(!bus.is_failed());
    }

    #[test]
    fn test_write_framing() {
        let (bus, rec) = ready_bus();
        bus.writev(
            0x42,
            &[WriteSegment(&[0x10]), WriteSegment(&[]), WriteSegment(&[0x01, 0x02])],
            true,
        )
        .unwrap();

        let rec = rec.borrow();
        assert_eq!(
            rec.transactions[0],
            [
                Wire::Start,
                Wire::Write(0x84),
                Wire::Write(0x10),
                Wire::Write(0x01),
                Wire::Write(0x02),
                Wire::Stop
            ]
        );
        assert_eq!(rec.waits, [TRANSFER_WAIT_MS]);
    }

    #[test]
    fn test_write_without_stop() {
        let (bus, rec) = ready_bus();
        bus.write(0x42, &[0x10], false).unwrap();
        assert_eq!(
            rec.borrow().transactions[0],
            [Wire::Start, Wire::Write(0x84), Wire::Write(0x10)]
        );
    }

    #[test]
    fn test_read_ack_pattern_and_data() {
        let (bus, rec) = ready_bus();
        rec.borrow_mut().responses.extend([1, 2, 3, 4]);

        let mut a = [0u8; 2];
        let mut b = [0u8; 0];
        let mut c = [0u8; 2];
        bus.readv(
            0x42,
            &mut [ReadSegment(&mut a), ReadSegment(&mut b), ReadSegment(&mut c)],
        )
        .unwrap();

        assert_eq!(a, [1, 2]);
        assert_eq!(c, [3, 4]);
        assert_eq!(
            rec.borrow().transactions[0],
            [
                Wire::Start,
                Wire::Write(0x85),
                Wire::Read { ack: true },
                Wire::Read { ack: true },
                Wire::Read { ack: true },
                Wire::Read { ack: false },
                Wire::Stop
            ]
        );
    }

    #[test]
    fn test_link_errors_are_mapped_not_retried() {
        let (bus, rec) = ready_bus();
        rec.borrow_mut().results.extend([
            Err(LinkError::Nack),
            Err(LinkError::Timeout),
            Err(LinkError::Other),
        ]);

        assert_eq!(bus.write(0x42, &[1], true), Err(ErrorCode::NotAcknowledged));
        assert_eq!(bus.read(0x42, &mut [0u8; 1]), Err(ErrorCode::Timeout));
        assert_eq!(bus.write(0x42, &[1], true), Err(ErrorCode::Unknown));
        assert_eq!(rec.borrow().transactions.len(), 3);
    }

    #[test]
    fn test_argument_checks() {
        let (bus, rec) = ready_bus();
        assert_eq!(bus.write(0x80, &[1], true), Err(ErrorCode::InvalidArgument));

        let data = [0u8; 1];
        let segments = [WriteSegment(&data); MAX_SEGMENTS + 1];
        assert_eq!(bus.writev(0x42, &segments, true), Err(ErrorCode::TooLarge));
        assert!(rec.borrow().transactions.is_empty());
    }

    #[test]
    fn test_guard_is_exclusive() {
        let (bus, _) = ready_bus();
        let guard = bus.try_lock();
        assert!(guard.is_some());
        assert!(bus.try_lock().is_none());
        drop(guard);
        assert!(bus.try_lock().is_some());
    }

    #[test]
    fn test_status_snapshot() {
        let (bus, _) = ready_bus();
        bus.dump_config();
        let status = bus.status();
        assert!(status.initialized);
        assert!(!status.failed);
        assert_eq!(status.config, config());
        assert_eq!(status.recovery, Some(RecoveryOutcome::Completed));
    }

    proptest! {
        #[test]
        fn prop_write_stream_is_concatenation(
            address in 0u8..=0x7F,
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..6), 1..=MAX_SEGMENTS),
            send_stop in any::<bool>(),
        ) {
            prop_assume!(chunks.iter().any(|c| !c.is_empty()));
            let (bus, rec) = ready_bus();
            let segments: Vec<WriteSegment<'_>> = chunks.iter().map(|c| WriteSegment(c.as_slice())).collect();
            bus.writev(address, &segments, send_stop).unwrap();

            let mut expected = vec![Wire::Start, Wire::Write(address << 1)];
            expected.extend(chunks.iter().flatten().map(|b| Wire::Write(*b)));
            if send_stop {
                expected.push(Wire::Stop);
            }
            prop_assert_eq!(&rec.borrow().transactions[0], &expected);
        }

        #[test]
        fn prop_only_final_read_byte_is_nacked(
            lens in proptest::collection::vec(0usize..5, 1..=MAX_SEGMENTS),
        ) {
            let total: usize = lens.iter().sum();
            prop_assume!(total > 0);
            let (bus, rec) = ready_bus();

            let mut buffers: Vec<Vec<u8>> = lens.iter().map(|l| vec![0u8; *l]).collect();
            let mut segments: Vec<ReadSegment<'_>> =
                buffers.iter_mut().map(|b| ReadSegment(b.as_mut_slice())).collect();
            bus.readv(0x42, &mut segments).unwrap();

            let acks: Vec<bool> = rec.borrow().transactions[0]
                .iter()
                .filter_map(|w| match w {
                    Wire::Read { ack } => Some(*ack),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(acks.len(), total);
            prop_assert!(acks[..total - 1].iter().all(|a| *a));
            prop_assert!(!acks[total - 1]);
        }
    }
}
