//! Link synchronisation payload (the body of a `SYN` frame).

use crate::errors::{ProtocolError, Result};

/// One advertised session in a [`SyncPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDescriptor {
    /// Session id.
    pub id: u8,
    /// Session type (0 = control, 2 = external accessory).
    pub session_type: u8,
    /// Session protocol version.
    pub version: u8,
}

impl SessionDescriptor {
    /// Wire size of a single descriptor.
    pub const SIZE: usize = 3;

    fn to_bytes(self) -> [u8; Self::SIZE] {
        [self.id, self.session_type, self.version]
    }
}

/// Negotiation parameters carried in a `SYN` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPayload {
    /// Sender's sliding-window size, in packets.
    pub max_outgoing: u8,
    /// Maximum frame length the sender accepts.
    pub max_len: u16,
    /// Retransmission timeout, in milliseconds.
    pub retransmission_timeout_ms: u16,
    /// Delayed-ACK timeout, in milliseconds.
    pub ack_timeout_ms: u16,
    /// Maximum retransmissions before the link is considered dead.
    pub max_retransmissions: u8,
    /// Cumulative-ACK threshold.
    pub max_ack: u8,
    /// Advertised sessions (control and EA, at minimum).
    pub sessions: Vec<SessionDescriptor>,
}

impl SyncPayload {
    /// The only version this codec understands.
    pub const VERSION: u8 = 1;

    /// Session type tag for the control session.
    pub const SESSION_TYPE_CONTROL: u8 = 0;

    /// Session type tag for the external-accessory session.
    pub const SESSION_TYPE_EA: u8 = 2;

    /// Fixed header size before the session descriptor list.
    const HEADER_SIZE: usize = 10;

    /// Encodes the payload to its wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_SIZE + self.sessions.len() * SessionDescriptor::SIZE);
        out.push(Self::VERSION);
        out.push(self.max_outgoing);
        out.extend_from_slice(&self.max_len.to_be_bytes());
        out.extend_from_slice(&self.retransmission_timeout_ms.to_be_bytes());
        out.extend_from_slice(&self.ack_timeout_ms.to_be_bytes());
        out.push(self.max_retransmissions);
        out.push(self.max_ack);
        for session in &self.sessions {
            out.extend_from_slice(&session.to_bytes());
        }
        out
    }

    /// Decodes a payload from its wire form.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if fewer than 10 bytes are given.
    /// - [`ProtocolError::InvalidVersion`] if the version byte is not 1.
    /// - [`ProtocolError::TruncatedSessionList`] if the trailing bytes are
    ///   not a whole number of 3-byte descriptors.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort {
                expected: Self::HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let version = bytes[0];
        if version != Self::VERSION {
            return Err(ProtocolError::InvalidVersion(version));
        }

        let max_outgoing = bytes[1];
        let max_len = u16::from_be_bytes([bytes[2], bytes[3]]);
        let retransmission_timeout_ms = u16::from_be_bytes([bytes[4], bytes[5]]);
        let ack_timeout_ms = u16::from_be_bytes([bytes[6], bytes[7]]);
        let max_retransmissions = bytes[8];
        let max_ack = bytes[9];

        let session_bytes = &bytes[Self::HEADER_SIZE..];
        if session_bytes.len() % SessionDescriptor::SIZE != 0 {
            return Err(ProtocolError::TruncatedSessionList(
                session_bytes.len() % SessionDescriptor::SIZE,
            ));
        }

        let sessions = session_bytes
            .chunks_exact(SessionDescriptor::SIZE)
            .map(|chunk| SessionDescriptor { id: chunk[0], session_type: chunk[1], version: chunk[2] })
            .collect();

        Ok(Self {
            max_outgoing,
            max_len,
            retransmission_timeout_ms,
            ack_timeout_ms,
            max_retransmissions,
            max_ack,
            sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arb_session() -> impl Strategy<Value = SessionDescriptor> {
        (any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(id, session_type, version)| SessionDescriptor { id, session_type, version })
    }

    fn arb_payload() -> impl Strategy<Value = SyncPayload> {
        (
            any::<u8>(),
            any::<u16>(),
            any::<u16>(),
            any::<u16>(),
            any::<u8>(),
            any::<u8>(),
            prop::collection::vec(arb_session(), 0..8),
        )
            .prop_map(
                |(
                    max_outgoing,
                    max_len,
                    retransmission_timeout_ms,
                    ack_timeout_ms,
                    max_retransmissions,
                    max_ack,
                    sessions,
                )| SyncPayload {
                    max_outgoing,
                    max_len,
                    retransmission_timeout_ms,
                    ack_timeout_ms,
                    max_retransmissions,
                    max_ack,
                    sessions,
                },
            )
    }

    proptest! {
        #[test]
        fn round_trip(payload in arb_payload()) {
            let encoded = payload.encode();
            let decoded = SyncPayload::decode(&encoded).expect("should decode");
            prop_assert_eq!(payload, decoded);
        }
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = vec![2u8; SyncPayload::HEADER_SIZE];
        bytes[0] = 2;
        assert_eq!(SyncPayload::decode(&bytes), Err(ProtocolError::InvalidVersion(2)));
    }

    #[test]
    fn rejects_truncated_session_list() {
        let mut bytes = vec![0u8; SyncPayload::HEADER_SIZE];
        bytes[0] = SyncPayload::VERSION;
        bytes.extend_from_slice(&[10, 0, 1, 11]); // 4 trailing bytes, not a multiple of 3
        assert_eq!(SyncPayload::decode(&bytes), Err(ProtocolError::TruncatedSessionList(1)));
    }

    #[test]
    fn default_accessory_sessions() {
        let payload = SyncPayload {
            max_outgoing: 4,
            max_len: 4096,
            retransmission_timeout_ms: 1035,
            ack_timeout_ms: 23,
            max_retransmissions: 3,
            max_ack: 3,
            sessions: vec![
                SessionDescriptor { id: 10, session_type: SyncPayload::SESSION_TYPE_CONTROL, version: 1 },
                SessionDescriptor { id: 11, session_type: SyncPayload::SESSION_TYPE_EA, version: 1 },
            ],
        };
        let encoded = payload.encode();
        assert_eq!(encoded.len(), SyncPayload::HEADER_SIZE + 2 * SessionDescriptor::SIZE);
        assert_eq!(SyncPayload::decode(&encoded), Ok(payload));
    }
}
