//! Link frame type combining header and payload.
//!
//! A [`LinkFrame`] is the wire unit the link engine reads and writes:
//! `[header: 9 bytes] + [payload: variable] + [payload checksum: 1 byte]`
//! (the last two are absent when `header.length() == 9`).

use bytes::Bytes;

use crate::{
    checksum,
    errors::{ProtocolError, Result},
    header::{ControlFlags, LinkHeader},
};

/// A complete link-layer frame: header plus optional payload.
///
/// # Invariants
///
/// `header.length()` always matches `payload.len() + 10` when a payload is
/// present, or `9` when it is not — [`LinkFrame::new`] enforces this by
/// deriving `length` from the payload rather than accepting it separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    /// Frame header.
    pub header: LinkHeader,
    /// Payload bytes, empty for header-only frames (e.g. bare ACKs).
    pub payload: Bytes,
}

impl LinkFrame {
    /// Builds a frame, computing `length` from the payload and the header
    /// checksum over the finished header.
    #[must_use]
    pub fn new(control: ControlFlags, seq: u8, ack: u8, session_id: u8, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let length = if payload.is_empty() {
            LinkHeader::SIZE as u16
        } else {
            (LinkHeader::SIZE + 1 + payload.len()) as u16
        };
        let header = LinkHeader::new(length, control, seq, ack, session_id);
        Self { header, payload }
    }

    /// Encodes the frame to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.length() as usize);
        out.extend_from_slice(&self.header.to_bytes());
        if !self.payload.is_empty() {
            out.extend_from_slice(&self.payload);
            out.push(checksum::generate(&self.payload));
        }
        out
    }

    /// Decodes a frame from wire bytes.
    ///
    /// # Errors
    ///
    /// Propagates [`LinkHeader::from_bytes`] errors, plus
    /// [`ProtocolError::FrameTruncated`] if the buffer is shorter than the
    /// header's claimed `length`, and [`ProtocolError::BadChecksum`] if the
    /// trailing payload checksum does not validate.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = LinkHeader::from_bytes(bytes)?;
        let total_len = header.length() as usize;

        if bytes.len() < total_len {
            return Err(ProtocolError::FrameTruncated {
                expected: total_len - LinkHeader::SIZE,
                actual: bytes.len().saturating_sub(LinkHeader::SIZE),
            });
        }

        if header.payload_len() == 0 {
            return Ok(Self { header, payload: Bytes::new() });
        }

        let payload_with_checksum = &bytes[LinkHeader::SIZE..total_len];
        if !checksum::verify(payload_with_checksum) {
            return Err(ProtocolError::BadChecksum);
        }

        let payload = Bytes::copy_from_slice(&payload_with_checksum[..payload_with_checksum.len() - 1]);
        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arb_frame() -> impl Strategy<Value = LinkFrame> {
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>(), prop::collection::vec(any::<u8>(), 0..64))
            .prop_map(|(control, seq, ack, session_id, payload)| {
                LinkFrame::new(ControlFlags::from_byte(control), seq, ack, session_id, payload)
            })
    }

    proptest! {
        #[test]
        fn frame_round_trip(frame in arb_frame()) {
            let wire = frame.encode();
            let parsed = LinkFrame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, parsed);
        }
    }

    #[test]
    fn header_only_frame_has_length_nine() {
        let frame =
            LinkFrame::new(ControlFlags::new(ControlFlags::ACK), 1, 0, LinkHeader::CONTROL_SESSION_ID, Bytes::new());
        assert_eq!(frame.header.length(), 9);
        assert_eq!(frame.encode().len(), 9);
    }

    #[test]
    fn reject_truncated_payload() {
        let frame = LinkFrame::new(
            ControlFlags::new(ControlFlags::ACK),
            1,
            0,
            LinkHeader::CONTROL_SESSION_ID,
            b"hello world!".to_vec(),
        );
        let wire = frame.encode();
        let result = LinkFrame::decode(&wire[..wire.len() - 3]);
        assert!(matches!(result, Err(ProtocolError::FrameTruncated { .. })));
    }

    #[test]
    fn reject_bad_payload_checksum() {
        let frame = LinkFrame::new(
            ControlFlags::new(ControlFlags::ACK),
            1,
            0,
            LinkHeader::CONTROL_SESSION_ID,
            b"life".to_vec(),
        );
        let mut wire = frame.encode();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;
        assert_eq!(LinkFrame::decode(&wire), Err(ProtocolError::BadChecksum));
    }
}
