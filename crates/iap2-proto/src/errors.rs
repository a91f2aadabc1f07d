//! Error types for frame and synchronisation-payload decoding.

use thiserror::Error;

/// Errors produced while decoding link-layer wire structures.
///
/// These are all recoverable at the protocol level: a caller that gets one of
/// these back should drop the offending bytes and keep reading, not tear down
/// the connection. Fatal handling (bailout) lives one layer up, in
/// `iap2-core`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than the minimum header size.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Header `start` field did not match `0xFF5A`.
    #[error("invalid start marker: {0:#06x}")]
    InvalidStart(u16),

    /// Header or payload checksum did not validate.
    #[error("checksum mismatch")]
    BadChecksum,

    /// `length` field claimed more bytes than were supplied.
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload bytes the header promised.
        expected: usize,
        /// Payload bytes actually available.
        actual: usize,
    },

    /// `length` field was less than the minimum header size (9).
    #[error("invalid length field: {0}")]
    InvalidLength(u16),

    /// Synchronisation payload declared an unsupported version.
    #[error("unsupported sync payload version: {0}")]
    InvalidVersion(u8),

    /// Synchronisation payload's session list was not a whole number of
    /// 3-byte descriptors.
    #[error("truncated session descriptor list: {0} trailing bytes")]
    TruncatedSessionList(usize),
}

/// Convenience alias for results of this crate's decode functions.
pub type Result<T> = std::result::Result<T, ProtocolError>;
