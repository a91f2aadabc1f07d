//! Errors surfaced by the CSM codec.

use thiserror::Error;

/// Errors decoding or encoding a Control Session Message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsmError {
    /// Fewer bytes than the fixed 6-byte CSM header.
    #[error("message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// The 2-byte start marker did not read `0x4040`.
    #[error("invalid CSM start marker: {0:#06x}")]
    InvalidStart(u16),

    /// `length` claimed more bytes than were supplied.
    #[error("message truncated: header claims {expected} bytes, got {actual}")]
    MessageTruncated {
        /// Bytes the header's `length` field claims.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// A parameter's `param_len` ran past the end of the message.
    #[error("parameter {param_id:#06x} truncated: claims {expected} bytes, {actual} remain")]
    ParameterTruncated {
        /// Parameter id.
        param_id: u16,
        /// Bytes the parameter's length claims.
        expected: usize,
        /// Bytes actually remaining in the message.
        actual: usize,
    },

    /// A parameter's `param_len` was too small to hold its own header.
    #[error("parameter {0:#06x} has a length shorter than the parameter header")]
    ParameterHeaderTooShort(u16),

    /// No handler is registered for this message id.
    #[error("unknown message id {0:#06x}")]
    UnknownMessageId(u16),

    /// A required parameter was absent from a decoded message.
    #[error("message {msg_id:#06x} is missing required parameter {param_id:#06x} ({field})")]
    MissingRequiredParameter {
        /// Message id being decoded.
        msg_id: u16,
        /// Missing parameter id.
        param_id: u16,
        /// Field name, for diagnostics.
        field: &'static str,
    },

    /// A parameter's payload had the wrong length for its declared type.
    #[error("parameter {param_id:#06x} ({field}) has invalid length: expected {expected}, got {actual}")]
    InvalidParameterLength {
        /// Parameter id.
        param_id: u16,
        /// Field name, for diagnostics.
        field: &'static str,
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// A string parameter was not valid UTF-8, or was missing its
    /// terminating NUL.
    #[error("parameter {param_id:#06x} ({field}) is not a valid NUL-terminated UTF-8 string")]
    InvalidString {
        /// Parameter id.
        param_id: u16,
        /// Field name, for diagnostics.
        field: &'static str,
    },

    /// An enum-typed parameter held a value with no known variant.
    #[error("parameter {param_id:#06x} ({field}) has unrecognised enum value {value}")]
    InvalidEnumValue {
        /// Parameter id.
        param_id: u16,
        /// Field name, for diagnostics.
        field: &'static str,
        /// The unrecognised raw value.
        value: u8,
    },
}

/// Convenience alias for CSM codec results.
pub type Result<T> = std::result::Result<T, CsmError>;
