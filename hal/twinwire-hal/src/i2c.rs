//! I2C bus abstractions
//!
//! Two roles are modelled separately, because a node is either the
//! controller or a peripheral on a given bus:
//!
//! - [`CommandLink`]: controller side. The engine builds a command
//!   sequence (START, address byte, data bursts, optional STOP) and hands
//!   it to the hardware for execution with a bounded wait.
//! - [`TargetEndpoint`]: peripheral side. The engine pushes response bytes
//!   into the transmit path when a foreign controller reads.

/// Acknowledge policy for a read burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckMode {
    /// ACK every byte, more data follows in a later burst
    Ack,
    /// NACK every byte
    Nack,
    /// ACK every byte except the last one, which is NACKed to release the bus
    LastNack,
}

impl AckMode {
    /// Whether the byte at `index` of a `len` byte burst is ACKed
    pub fn acks(self, index: usize, len: usize) -> bool {
        match self {
            AckMode::Ack => true,
            AckMode::Nack => false,
            AckMode::LastNack => index + 1 < len,
        }
    }
}

/// One step of a controller transaction
///
/// Buffers are borrowed for the duration of a single
/// [`CommandLink::execute`] call.
#[derive(Debug)]
pub enum Command<'a> {
    /// START (or repeated START) condition
    Start,
    /// A single byte, typically the address byte
    WriteByte {
        /// Byte to shift out
        byte: u8,
        /// Fail the transaction if the byte is not ACKed
        ack_check: bool,
    },
    /// A burst of data bytes
    Write {
        /// Bytes to shift out
        data: &'a [u8],
        /// Fail the transaction if any byte is not ACKed
        ack_check: bool,
    },
    /// A burst of bytes read into `buf`
    Read {
        /// Destination buffer
        buf: &'a mut [u8],
        /// ACK policy for the burst
        ack: AckMode,
    },
    /// STOP condition
    Stop,
}

impl Command<'_> {
    /// Number of data bytes moved by this step
    pub fn data_len(&self) -> usize {
        match self {
            Command::Start | Command::Stop => 0,
            Command::WriteByte { .. } => 1,
            Command::Write { data, .. } => data.len(),
            Command::Read { buf, .. } => buf.len(),
        }
    }
}

/// Hardware outcome of a failed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// A byte that required an ACK was NACKed
    Nack,
    /// The bounded wait elapsed
    Timeout,
    /// Any other driver failure
    Other,
}

/// Controller-mode I2C peripheral
pub trait CommandLink {
    /// Program the hardware transfer timeout
    ///
    /// # Arguments
    /// * `timeout_us` - Timeout in microseconds, already clamped by the caller
    fn set_timeout(&mut self, timeout_us: u32) -> Result<(), LinkError>;

    /// Execute a command sequence
    ///
    /// Blocks the caller until the sequence completes or `wait_ms`
    /// elapses. Read buffers are filled in place.
    fn execute(&mut self, commands: &mut [Command<'_>], wait_ms: u32) -> Result<(), LinkError>;
}

/// Peripheral-mode I2C endpoint
#[allow(async_fn_in_trait)]
pub trait TargetEndpoint {
    /// Error type for endpoint operations
    type Error;

    /// Start answering the given 7-bit address
    fn enable(&mut self, address: u8) -> Result<(), Self::Error>;

    /// Queue bytes for the foreign controller to read
    ///
    /// Returns how many bytes were accepted before `timeout_ms` elapsed,
    /// which may be fewer than `data.len()`.
    async fn write(&mut self, data: &[u8], timeout_ms: u32) -> Result<usize, Self::Error>;
}

/// I2C bus speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cSpeed {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cSpeed {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl I2cSpeed {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self { frequency: 400_000 };
}
