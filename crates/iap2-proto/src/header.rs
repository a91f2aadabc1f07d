//! Link frame header: zero-copy parsing of the 9-byte wire header.
//!
//! The header is fixed-size and fixed-layout, so it is represented as a
//! `#[repr(C, packed)]` struct with `zerocopy` traits and cast directly from
//! network bytes rather than parsed field by field.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    checksum,
    errors::{ProtocolError, Result},
};

/// Control-bit flags carried in [`LinkHeader::control`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFlags(u8);

impl ControlFlags {
    /// Synchronisation frame (carries a [`crate::SyncPayload`]).
    pub const SYN: u8 = 0x80;
    /// Cumulative acknowledgement.
    pub const ACK: u8 = 0x40;
    /// Extended (selective) acknowledgement.
    pub const EAK: u8 = 0x20;
    /// Reset: peer is tearing down the link.
    pub const RST: u8 = 0x10;

    /// Builds flags from a raw control byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Raw control byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// Combines flags, e.g. `ControlFlags::new(ControlFlags::SYN)`.
    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Whether the `SYN` bit is set.
    #[must_use]
    pub const fn is_syn(self) -> bool {
        self.0 & Self::SYN != 0
    }

    /// Whether the `ACK` bit is set.
    #[must_use]
    pub const fn is_ack(self) -> bool {
        self.0 & Self::ACK != 0
    }

    /// Whether the `EAK` bit is set.
    #[must_use]
    pub const fn is_eak(self) -> bool {
        self.0 & Self::EAK != 0
    }

    /// Whether the `RST` bit is set.
    #[must_use]
    pub const fn is_rst(self) -> bool {
        self.0 & Self::RST != 0
    }

    /// True for a frame whose only relevant bit is (optionally) `ACK` — i.e.
    /// a data-carrying frame rather than a control frame.
    #[must_use]
    pub const fn is_data_eligible(self) -> bool {
        self.0 & !Self::ACK == 0
    }
}

/// Fixed 9-byte link frame header (big-endian wire order).
///
/// Layout: `start(2) | length(2) | control(1) | seq(1) | ack(1) |
/// session_id(1) | header_checksum(1)`.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct LinkHeader {
    start: [u8; 2],
    length: [u8; 2],
    control: u8,
    seq: u8,
    ack: u8,
    session_id: u8,
    header_checksum: u8,
}

impl LinkHeader {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 9;

    /// Fixed start-of-frame marker.
    pub const START: u16 = 0xFF5A;

    /// Control session id, fixed by the protocol.
    pub const CONTROL_SESSION_ID: u8 = 10;

    /// External-accessory session id, fixed by the protocol.
    pub const EA_SESSION_ID: u8 = 11;

    /// Builds a header, computing the header checksum over the first 8 bytes.
    #[must_use]
    pub fn new(length: u16, control: ControlFlags, seq: u8, ack: u8, session_id: u8) -> Self {
        let mut header = Self {
            start: Self::START.to_be_bytes(),
            length: length.to_be_bytes(),
            control: control.to_byte(),
            seq,
            ack,
            session_id,
            header_checksum: 0,
        };
        let unchecked = IntoBytes::as_bytes(&header);
        header.header_checksum = checksum::generate(&unchecked[..Self::SIZE - 1]);
        header
    }

    /// Parses a header from the first [`Self::SIZE`] bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if fewer than 9 bytes are supplied.
    /// - [`ProtocolError::BadChecksum`] if the header checksum does not
    ///   validate.
    /// - [`ProtocolError::InvalidStart`] if the start marker does not match
    ///   `0xFF5A`.
    /// - [`ProtocolError::InvalidLength`] if `length < 9`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() });
        }
        let slice = &bytes[..Self::SIZE];
        if !checksum::verify(slice) {
            return Err(ProtocolError::BadChecksum);
        }

        let header = Self::ref_from_prefix(slice)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        let start = u16::from_be_bytes(header.start);
        if start != Self::START {
            return Err(ProtocolError::InvalidStart(start));
        }

        let length = u16::from_be_bytes(header.length);
        if length < Self::SIZE as u16 {
            return Err(ProtocolError::InvalidLength(length));
        }

        Ok(*header)
    }

    /// Serializes the header to its 9-byte wire form.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(&self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Start-of-frame marker (always `0xFF5A` on a validly-parsed header).
    #[must_use]
    pub fn start(&self) -> u16 {
        u16::from_be_bytes(self.start)
    }

    /// Total frame length, including both checksums.
    #[must_use]
    pub fn length(&self) -> u16 {
        u16::from_be_bytes(self.length)
    }

    /// Control bitmask.
    #[must_use]
    pub fn control(&self) -> ControlFlags {
        ControlFlags::from_byte(self.control)
    }

    /// Sender's packet sequence number.
    #[must_use]
    pub fn seq(&self) -> u8 {
        self.seq
    }

    /// Last in-order packet sequence number received by the sender.
    #[must_use]
    pub fn ack(&self) -> u8 {
        self.ack
    }

    /// Session id this frame's payload belongs to.
    #[must_use]
    pub fn session_id(&self) -> u8 {
        self.session_id
    }

    /// Number of payload bytes implied by `length` (excludes the payload
    /// checksum byte). Zero when `length == 9`.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        (self.length() as usize).saturating_sub(Self::SIZE)
    }
}

impl std::fmt::Debug for LinkHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkHeader")
            .field("start", &format!("{:#06x}", self.start()))
            .field("length", &self.length())
            .field("control", &format!("{:#04x}", self.control))
            .field("seq", &self.seq())
            .field("ack", &self.ack())
            .field("session_id", &self.session_id())
            .finish()
    }
}

impl PartialEq for LinkHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for LinkHeader {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for LinkHeader {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            (9u16..=65535, any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
                .prop_map(|(length, control, seq, ack, session_id)| {
                    Self::new(length, ControlFlags::from_byte(control), seq, ack, session_id)
                })
                .boxed()
        }
    }

    #[test]
    fn header_size() {
        assert_eq!(std::mem::size_of::<LinkHeader>(), LinkHeader::SIZE);
    }

    proptest! {
        #[test]
        fn header_round_trip(header in any::<LinkHeader>()) {
            let bytes = header.to_bytes();
            let parsed = LinkHeader::from_bytes(&bytes).expect("should parse");
            prop_assert_eq!(header, parsed);
        }

        #[test]
        fn encoded_header_sums_to_zero(header in any::<LinkHeader>()) {
            prop_assert!(checksum::verify(&header.to_bytes()));
        }

        #[test]
        fn single_bit_flip_rejected(header in any::<LinkHeader>(), bit in 0u32..64) {
            let mut bytes = header.to_bytes();
            let byte_index = (bit / 8) as usize;
            let bit_index = bit % 8;
            bytes[byte_index] ^= 1 << bit_index;
            prop_assert!(LinkHeader::from_bytes(&bytes).is_err());
        }
    }

    #[test]
    fn control_flags_decode() {
        let flags = ControlFlags::new(ControlFlags::SYN | ControlFlags::ACK);
        assert!(flags.is_syn());
        assert!(flags.is_ack());
        assert!(!flags.is_eak());
        assert!(!flags.is_rst());
    }

    #[test]
    fn reject_bad_start() {
        let header = LinkHeader::new(9, ControlFlags::default(), 0, 0, 10);
        let mut bytes = header.to_bytes();
        // Flip both bytes of `start` and recompute the checksum so only the
        // start marker is wrong, isolating InvalidStart from BadChecksum.
        bytes[0] ^= 0xFF;
        bytes[1] ^= 0xFF;
        bytes[8] = checksum::generate(&bytes[..8]);
        assert_eq!(LinkHeader::from_bytes(&bytes), Err(ProtocolError::InvalidStart(0x00A5)));
    }

    #[test]
    fn reject_short_buffer() {
        let result = LinkHeader::from_bytes(&[0u8; 5]);
        assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: 9, actual: 5 }));
    }
}
