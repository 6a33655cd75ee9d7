//! Transfer primitives
//!
//! The error taxonomy every bus and device operation reports, and the
//! vectored buffer descriptors a transaction is built from.

use twinwire_hal::i2c::LinkError;

/// Maximum number of segments in one vectored transaction
pub const MAX_SEGMENTS: usize = 8;

/// Largest valid 7-bit address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Failure kinds of a bus or device operation
///
/// Success is `Ok(())`; the numeric code 0 is reserved for it (see
/// [`ErrorCode::raw`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorCode {
    /// Bad address, segment or configuration value
    InvalidArgument = 1,
    /// The addressed peripheral did not ACK
    NotAcknowledged = 2,
    /// The bounded wait elapsed
    Timeout = 3,
    /// The bus or engine was never set up successfully
    NotInitialized = 4,
    /// A fixed-capacity structure is full
    TooLarge = 5,
    /// Any other failure
    Unknown = 6,
    /// Checksum mismatch reported by a collaborator
    Crc = 7,
}

/// Result of a bus or device operation
pub type I2cResult<T> = Result<T, ErrorCode>;

impl ErrorCode {
    /// Numeric code of this failure
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Numeric code of an operation result, 0 for success
    pub fn raw<T>(result: &I2cResult<T>) -> u8 {
        match result {
            Ok(_) => 0,
            Err(e) => e.code(),
        }
    }

    /// Parse a numeric code
    ///
    /// Returns `Some(Ok(()))` for 0 and `None` for codes outside the set.
    pub const fn from_raw(raw: u8) -> Option<I2cResult<()>> {
        match raw {
            0 => Some(Ok(())),
            1 => Some(Err(ErrorCode::InvalidArgument)),
            2 => Some(Err(ErrorCode::NotAcknowledged)),
            3 => Some(Err(ErrorCode::Timeout)),
            4 => Some(Err(ErrorCode::NotInitialized)),
            5 => Some(Err(ErrorCode::TooLarge)),
            6 => Some(Err(ErrorCode::Unknown)),
            7 => Some(Err(ErrorCode::Crc)),
            _ => None,
        }
    }

    /// Short name for log output
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::NotAcknowledged => "not acknowledged",
            ErrorCode::Timeout => "timeout",
            ErrorCode::NotInitialized => "not initialized",
            ErrorCode::TooLarge => "too large",
            ErrorCode::Unknown => "unknown",
            ErrorCode::Crc => "crc",
        }
    }
}

impl From<LinkError> for ErrorCode {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::Nack => ErrorCode::NotAcknowledged,
            LinkError::Timeout => ErrorCode::Timeout,
            LinkError::Other => ErrorCode::Unknown,
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl embedded_hal::i2c::Error for ErrorCode {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

        match self {
            ErrorCode::NotAcknowledged => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            _ => ErrorKind::Other,
        }
    }
}

/// Destination buffer of a vectored read
#[derive(Debug)]
pub struct ReadSegment<'a>(pub &'a mut [u8]);

impl<'a> ReadSegment<'a> {
    /// Wrap a buffer
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self(buf)
    }

    /// Number of bytes to read
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Zero-length segments are skipped on the wire
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> From<&'a mut [u8]> for ReadSegment<'a> {
    fn from(buf: &'a mut [u8]) -> Self {
        Self(buf)
    }
}

/// Source buffer of a vectored write
#[derive(Debug, Clone, Copy)]
pub struct WriteSegment<'a>(pub &'a [u8]);

impl<'a> WriteSegment<'a> {
    /// Wrap a buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self(data)
    }

    /// Number of bytes to write
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Zero-length segments are skipped on the wire
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> From<&'a [u8]> for WriteSegment<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self(data)
    }
}

/// Index of the last read segment that carries data
///
/// This segment's final byte is the one answered with NACK.
pub fn last_non_empty(segments: &[ReadSegment<'_>]) -> Option<usize> {
    segments.iter().rposition(|s| !s.is_empty())
}

/// Transfer direction encoded in the R/W bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Controller writes (R/W = 0)
    Write,
    /// Controller reads (R/W = 1)
    Read,
}

/// Build the address byte for a 7-bit address
pub fn address_byte(address: u8, direction: Direction) -> I2cResult<u8> {
    if address > MAX_ADDRESS {
        return Err(ErrorCode::InvalidArgument);
    }
    let rw = match direction {
        Direction::Write => 0,
        Direction::Read => 1,
    };
    Ok((address << 1) | rw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_codes() {
        assert_eq!(ErrorCode::raw(&Ok::<(), ErrorCode>(())), 0);
        assert_eq!(ErrorCode::raw::<()>(&Err(ErrorCode::InvalidArgument)), 1);
        assert_eq!(ErrorCode::raw::<()>(&Err(ErrorCode::NotAcknowledged)), 2);
        assert_eq!(ErrorCode::raw::<()>(&Err(ErrorCode::Timeout)), 3);
        assert_eq!(ErrorCode::raw::<()>(&Err(ErrorCode::NotInitialized)), 4);
        assert_eq!(ErrorCode::raw::<()>(&Err(ErrorCode::TooLarge)), 5);
        assert_eq!(ErrorCode::raw::<()>(&Err(ErrorCode::Unknown)), 6);
        assert_eq!(ErrorCode::raw::<()>(&Err(ErrorCode::Crc)), 7);
    }

    #[test]
    fn test_from_raw_inverts_code() {
        for raw in 0..=7u8 {
            let parsed = ErrorCode::from_raw(raw).unwrap();
            assert_eq!(ErrorCode::raw(&parsed), raw);
        }
        assert!(ErrorCode::from_raw(8).is_none());
    }

    #[test]
    fn test_link_error_mapping() {
        assert_eq!(ErrorCode::from(LinkError::Nack), ErrorCode::NotAcknowledged);
        assert_eq!(ErrorCode::from(LinkError::Timeout), ErrorCode::Timeout);
        assert_eq!(ErrorCode::from(LinkError::Other), ErrorCode::Unknown);
    }

    #[test]
    fn test_embedded_hal_kind() {
        use embedded_hal::i2c::{Error, ErrorKind, NoAcknowledgeSource};

        assert_eq!(
            ErrorCode::NotAcknowledged.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown)
        );
        assert_eq!(ErrorCode::Timeout.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_address_byte() {
        assert_eq!(address_byte(0x42, Direction::Write), Ok(0x84));
        assert_eq!(address_byte(0x42, Direction::Read), Ok(0x85));
        assert_eq!(address_byte(0x7F, Direction::Read), Ok(0xFF));
        assert_eq!(
            address_byte(0x80, Direction::Write),
            Err(ErrorCode::InvalidArgument)
        );
    }

    #[test]
    fn test_last_non_empty_skips_trailing_empties() {
        let mut a = [0u8; 2];
        let mut b = [0u8; 0];
        let mut c = [0u8; 3];
        let mut d = [0u8; 0];
        let segments = [
            ReadSegment(&mut a),
            ReadSegment(&mut b),
            ReadSegment(&mut c),
            ReadSegment(&mut d),
        ];
        assert_eq!(last_non_empty(&segments), Some(2));
    }

    #[test]
    fn test_last_non_empty_all_empty() {
        let mut a = [0u8; 0];
        let segments = [ReadSegment(&mut a)];
        assert_eq!(last_non_empty(&segments), None);
        assert_eq!(last_non_empty(&[]), None);
    }
}
