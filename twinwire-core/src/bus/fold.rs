//! Command lists for transaction-only controllers
//!
//! Some controller peripherals can only run a whole transaction (START,
//! operations, STOP) and cannot leave the bus open between two calls.
//! [`CommandFolder`] turns the engine's command lists into `embedded-hal`
//! operation lists for such hardware:
//!
//! - A write list without STOP is held and replayed in front of the next
//!   list for the same address, so the hardware puts a repeated START
//!   between them. Consecutive held writes to one address append.
//! - A held write is flushed as a transaction of its own when a list for
//!   another address arrives.
//! - A held write that would outgrow its buffer completes at once,
//!   together with the list that overflowed it.
//! - A list containing a read always completes the transaction, with or
//!   without a trailing STOP.
//!
//! Nothing reaches the wire while a write is held. A NACK on a held write
//! is reported by the call that completes it.

use embedded_hal::i2c::Operation;
use heapless::Vec;
use twinwire_hal::i2c::{Command, LinkError};

use crate::transfer::MAX_SEGMENTS;

/// Default bytes a write without STOP may leave pending
pub const HELD_WRITE_CAPACITY: usize = 32;

/// Segments plus the replayed held write
const MAX_OPERATIONS: usize = MAX_SEGMENTS + 1;

struct HeldWrite<const CAP: usize> {
    address: u8,
    bytes: Vec<u8, CAP>,
}

/// Folds command lists into complete transactions
pub struct CommandFolder<const CAP: usize = HELD_WRITE_CAPACITY> {
    held: Option<HeldWrite<CAP>>,
}

impl<const CAP: usize> Default for CommandFolder<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> CommandFolder<CAP> {
    /// Create a folder with nothing held
    pub const fn new() -> Self {
        Self { held: None }
    }

    /// Address and bytes of the write waiting for its repeated START
    pub fn held(&self) -> Option<(u8, &[u8])> {
        self.held.as_ref().map(|h| (h.address, &h.bytes[..]))
    }

    /// Fold `commands` and run whatever transactions are due
    ///
    /// `run` executes one complete transaction against a 7-bit address.
    /// Each call runs at most two: a flush of a write held for another
    /// address, then the transaction `commands` completes.
    pub fn fold<F>(&mut self, commands: &mut [Command<'_>], mut run: F) -> Result<(), LinkError>
    where
        F: FnMut(u8, &mut [Operation<'_>]) -> Result<(), LinkError>,
    {
        let address = header_address(commands)?;
        let completes = commands
            .iter()
            .any(|c| matches!(c, Command::Stop | Command::Read { .. }));

        if self.held.as_ref().is_some_and(|h| h.address != address) {
            self.flush(&mut run)?;
        }

        if !completes && self.append(address, commands) {
            trace!("i2c: holding write to 0x{:02x} for a repeated START", address);
            return Ok(());
        }

        let result = {
            let mut ops: Vec<Operation<'_>, MAX_OPERATIONS> = Vec::new();
            if let Some(held) = self.held.as_ref() {
                ops.push(Operation::Write(&held.bytes))
                    .map_err(|_| LinkError::Other)?;
            }
            for command in body(commands) {
                let op = match command {
                    Command::WriteByte { byte, .. } => Operation::Write(core::slice::from_ref(&*byte)),
                    Command::Write { data, .. } => Operation::Write(*data),
                    Command::Read { buf, .. } => Operation::Read(&mut buf[..]),
                    Command::Start | Command::Stop => continue,
                };
                ops.push(op).map_err(|_| LinkError::Other)?;
            }
            if ops.is_empty() {
                ops.push(Operation::Write(&[])).map_err(|_| LinkError::Other)?;
            }
            run(address, &mut ops)
        };

        self.held = None;
        result
    }

    /// Run a held write on its own, with STOP
    pub fn flush<F>(&mut self, mut run: F) -> Result<(), LinkError>
    where
        F: FnMut(u8, &mut [Operation<'_>]) -> Result<(), LinkError>,
    {
        match self.held.take() {
            Some(held) => {
                warn!(
                    "i2c: held write to 0x{:02x} flushed without a repeated START",
                    held.address
                );
                run(held.address, &mut [Operation::Write(&held.bytes)])
            }
            None => Ok(()),
        }
    }

    /// Add the write bytes of `commands` to the held write
    ///
    /// Returns false, leaving the held write untouched, if they do not fit.
    fn append(&mut self, address: u8, commands: &mut [Command<'_>]) -> bool {
        let held_len = self.held.as_ref().map_or(0, |h| h.bytes.len());
        let body_len: usize = body(commands).map(|c| c.data_len()).sum();
        if held_len + body_len > CAP {
            debug!(
                "i2c: write to 0x{:02x} exceeds {} held bytes, sending with STOP",
                address,
                CAP
            );
            return false;
        }

        let held = self.held.get_or_insert_with(|| HeldWrite {
            address,
            bytes: Vec::new(),
        });
        for command in body(commands) {
            let data: &[u8] = match command {
                Command::WriteByte { byte, .. } => core::slice::from_ref(&*byte),
                Command::Write { data, .. } => *data,
                _ => continue,
            };
            // Length checked above
            let _ = held.bytes.extend_from_slice(data);
        }
        true
    }
}

/// Address carried by the first byte written, the address byte
fn header_address(commands: &[Command<'_>]) -> Result<u8, LinkError> {
    commands
        .iter()
        .find_map(|c| match c {
            Command::WriteByte { byte, .. } => Some(*byte >> 1),
            _ => None,
        })
        .ok_or(LinkError::Other)
}

/// Everything after the address byte
fn body<'c, 'a>(commands: &'c mut [Command<'a>]) -> impl Iterator<Item = &'c mut Command<'a>> {
    commands
        .iter_mut()
        .skip_while(|c| !matches!(c, Command::WriteByte { .. }))
        .skip(1)
}
