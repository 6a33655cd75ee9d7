//! Host-side test doubles shared by the unit tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use twinwire_hal::i2c::{Command, CommandLink, LinkError, TargetEndpoint};

use crate::bus::{LinkSetup, PortId, RecoveryOutcome};
use crate::config::BusConfig;

/// One bit-level event seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Start,
    /// Byte shifted out by the controller
    Write(u8),
    /// Byte shifted in, followed by ACK (`true`) or NACK (`false`)
    Read { ack: bool },
    Stop,
}

/// Setup call seen by the link factory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Recover,
    Configure(u8),
    SetTimeout(u32),
}

/// Shared record of everything a [`MockLink`] did
#[derive(Debug, Default)]
pub struct Recorder {
    pub transactions: Vec<Vec<Wire>>,
    pub waits: Vec<u32>,
    pub steps: Vec<SetupStep>,
    /// Bytes returned by reads, in order; 0 once exhausted
    pub responses: VecDeque<u8>,
    /// Results of successive `execute` calls; `Ok` once exhausted
    pub results: VecDeque<Result<(), LinkError>>,
}

pub type SharedRecorder = Rc<RefCell<Recorder>>;

/// Command link that records transactions instead of driving hardware
pub struct MockLink {
    pub recorder: SharedRecorder,
    pub timeout_result: Result<(), LinkError>,
}

impl CommandLink for MockLink {
    fn set_timeout(&mut self, timeout_us: u32) -> Result<(), LinkError> {
        self.recorder
            .borrow_mut()
            .steps
            .push(SetupStep::SetTimeout(timeout_us));
        self.timeout_result
    }

    fn execute(&mut self, commands: &mut [Command<'_>], wait_ms: u32) -> Result<(), LinkError> {
        let mut rec = self.recorder.borrow_mut();
        let mut wire = Vec::new();
        for command in commands.iter_mut() {
            match command {
                Command::Start => wire.push(Wire::Start),
                Command::WriteByte { byte, .. } => wire.push(Wire::Write(*byte)),
                Command::Write { data, .. } => wire.extend(data.iter().map(|b| Wire::Write(*b))),
                Command::Read { buf, ack } => {
                    let len = buf.len();
                    for (i, byte) in buf.iter_mut().enumerate() {
                        *byte = rec.responses.pop_front().unwrap_or(0);
                        wire.push(Wire::Read {
                            ack: ack.acks(i, len),
                        });
                    }
                }
                Command::Stop => wire.push(Wire::Stop),
            }
        }
        rec.transactions.push(wire);
        rec.waits.push(wait_ms);
        rec.results.pop_front().unwrap_or(Ok(()))
    }
}

/// Link factory with scripted recovery and configuration outcomes
pub struct MockSetup {
    pub recorder: SharedRecorder,
    pub outcome: RecoveryOutcome,
    pub configure_result: Result<(), LinkError>,
    pub timeout_result: Result<(), LinkError>,
}

impl MockSetup {
    pub fn new(recorder: &SharedRecorder) -> Self {
        Self {
            recorder: recorder.clone(),
            outcome: RecoveryOutcome::Completed,
            configure_result: Ok(()),
            timeout_result: Ok(()),
        }
    }
}

impl LinkSetup for MockSetup {
    type Link = MockLink;

    fn recover(&mut self) -> RecoveryOutcome {
        self.recorder.borrow_mut().steps.push(SetupStep::Recover);
        self.outcome
    }

    fn configure(self, port: PortId, _config: &BusConfig) -> Result<MockLink, LinkError> {
        self.recorder
            .borrow_mut()
            .steps
            .push(SetupStep::Configure(port.index()));
        self.configure_result?;
        Ok(MockLink {
            recorder: self.recorder,
            timeout_result: self.timeout_result,
        })
    }
}

/// Target endpoint that records every transmit call
#[derive(Debug, Default)]
pub struct MockEndpoint {
    pub address: Option<u8>,
    pub enable_fails: bool,
    /// Bytes sent, one entry per logical response
    pub sent: Vec<Vec<u8>>,
    /// Maximum bytes accepted per `write` call (0 = unlimited)
    pub chunk: usize,
    /// Results of successive `write` calls overriding the default behaviour
    pub scripted: VecDeque<Result<usize, ()>>,
    pub timeouts: Vec<u32>,
    pub calls: usize,
}

impl TargetEndpoint for MockEndpoint {
    type Error = ();

    fn enable(&mut self, address: u8) -> Result<(), ()> {
        if self.enable_fails {
            return Err(());
        }
        self.address = Some(address);
        Ok(())
    }

    async fn write(&mut self, data: &[u8], timeout_ms: u32) -> Result<usize, ()> {
        self.calls += 1;
        self.timeouts.push(timeout_ms);
        let accepted = match self.scripted.pop_front() {
            Some(result) => result?.min(data.len()),
            None if self.chunk == 0 => data.len(),
            None => self.chunk.min(data.len()),
        };
        if accepted > 0 {
            self.sent.push(data[..accepted].to_vec());
        }
        Ok(accepted)
    }
}

impl MockEndpoint {
    /// All bytes transmitted, concatenated
    pub fn bytes(&self) -> Vec<u8> {
        self.sent.concat()
    }
}
