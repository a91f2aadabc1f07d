//! Error types for the link engine and session streams.

use thiserror::Error;

use crate::engine::LinkState;

/// Errors surfaced by the link engine.
///
/// Only [`LinkError::Protocol`] and [`LinkError::UnsupportedSyncVersion`] are
/// transient in the sense of "drop and keep going" — every other variant
/// reaches the caller only as the `reason` of a `bailout`, i.e. the engine is
/// already dead by the time it is observed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A received frame failed to decode (bad checksum, bad start marker).
    /// Non-fatal: the frame is dropped and the byte stream is re-synced.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A `SYN` payload failed to decode during negotiation. Non-fatal.
    #[error("unsupported or malformed sync payload: {0}")]
    UnsupportedSyncVersion(String),

    /// The peer did not present the iAP2 detection marker.
    #[error("iAP2 not supported by peer")]
    NotSupported,

    /// The peer sent a frame with the `RST` bit set.
    #[error("device sent reset")]
    PeerReset,

    /// An in-flight packet was retransmitted `max_retransmissions` times
    /// without being acknowledged.
    #[error("max retransmissions exceeded for psn {psn}")]
    MaxRetransmissionsExceeded {
        /// Packet sequence number that was never acknowledged.
        psn: u8,
    },

    /// The transport reached EOF or raised an I/O error.
    #[error("transport error: {0}")]
    Transport(String),

    /// An operation was attempted in a state that does not support it.
    #[error("invalid operation {operation} in state {state:?}")]
    InvalidState {
        /// State the engine was in.
        state: LinkState,
        /// Operation that was attempted.
        operation: &'static str,
    },
}

impl LinkError {
    /// True for errors that are recovered locally (frame dropped, link
    /// otherwise unaffected) rather than fatal to the connection.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::UnsupportedSyncVersion(_))
    }
}

impl From<iap2_proto::ProtocolError> for LinkError {
    fn from(err: iap2_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Errors surfaced by [`crate::stream::SessionStream`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// `read_exactly` hit EOF before `n` bytes were available.
    #[error("incomplete read: wanted {expected} bytes, got {partial}")]
    IncompleteRead {
        /// Bytes requested.
        expected: usize,
        /// Bytes actually buffered when EOF arrived.
        partial: usize,
    },

    /// `write`/`drain` was called on a stream that is already closed.
    #[error("write to closed stream")]
    Closed,

    /// A second reader attempted to register while one was already pending.
    #[error("stream already has an outstanding reader")]
    ReaderAlreadyPending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_transient() {
        assert!(LinkError::Protocol("bad checksum".into()).is_transient());
        assert!(LinkError::UnsupportedSyncVersion("version 2".into()).is_transient());
    }

    #[test]
    fn teardown_causes_are_not_transient() {
        assert!(!LinkError::PeerReset.is_transient());
        assert!(!LinkError::MaxRetransmissionsExceeded { psn: 7 }.is_transient());
        assert!(!LinkError::NotSupported.is_transient());
        assert!(!LinkError::Transport("eof".into()).is_transient());
    }
}
