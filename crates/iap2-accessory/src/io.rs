//! Frames a [`ByteTransport`] against the link layer's wire format.
//!
//! [`FrameIo`] owns the read-side buffering the link engine itself has no
//! business knowing about: accumulating bytes until a detection marker or a
//! full frame is available, and re-synchronising byte by byte when a 9-byte
//! window fails to validate as a frame header.

use bytes::{Buf, BytesMut};
use iap2_core::{LinkState, engine::DETECT_MARKER};
use iap2_proto::{LinkFrame, LinkHeader};

use crate::{error::AccessoryError, transport::ByteTransport};

/// What [`FrameIo::read_next`] read off the wire, tagged by what the link
/// engine was expecting when it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// The fixed-size detection marker, read while the engine was in
    /// [`LinkState::Detect`].
    DetectMarker([u8; DETECT_MARKER.len()]),
    /// A fully decoded frame, read while the engine was past detection.
    Frame(LinkFrame),
}

/// Buffers reads from `T` and frames them against the iAP2 link wire
/// format.
pub struct FrameIo<T> {
    transport: T,
    buf: BytesMut,
    scratch: [u8; 4096],
}

impl<T: ByteTransport> FrameIo<T> {
    /// Wraps `transport`.
    pub fn new(transport: T) -> Self {
        Self { transport, buf: BytesMut::new(), scratch: [0u8; 4096] }
    }

    /// Writes raw bytes to the transport, bypassing framing. Used only for
    /// the detection marker, which predates framing.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), AccessoryError<T::Error>> {
        self.transport.write_all(bytes).await.map_err(AccessoryError::Transport)
    }

    /// Encodes and writes a frame.
    pub async fn write_frame(&mut self, frame: &LinkFrame) -> Result<(), AccessoryError<T::Error>> {
        self.write_raw(&frame.encode()).await
    }

    /// Reads the next unit of input appropriate to the engine's current
    /// `state`.
    pub async fn read_next(&mut self, state: LinkState) -> Result<Input, AccessoryError<T::Error>> {
        if state == LinkState::Detect {
            Ok(Input::DetectMarker(self.read_detect_marker().await?))
        } else {
            Ok(Input::Frame(self.read_frame().await?))
        }
    }

    /// Reads exactly the 6-byte detection marker.
    async fn read_detect_marker(&mut self) -> Result<[u8; DETECT_MARKER.len()], AccessoryError<T::Error>> {
        self.fill(DETECT_MARKER.len()).await?;
        let mut marker = [0u8; DETECT_MARKER.len()];
        marker.copy_from_slice(&self.buf[..DETECT_MARKER.len()]);
        self.buf.advance(DETECT_MARKER.len());
        Ok(marker)
    }

    /// Reads a complete frame, re-synchronising byte by byte if the current
    /// window does not begin with a valid header.
    async fn read_frame(&mut self) -> Result<LinkFrame, AccessoryError<T::Error>> {
        let header = loop {
            self.fill(LinkHeader::SIZE).await?;
            match LinkHeader::from_bytes(&self.buf[..LinkHeader::SIZE]) {
                Ok(header) => break header,
                Err(_) => self.buf.advance(1),
            }
        };

        let total = header.length() as usize;
        self.fill(total).await?;
        let frame_bytes = self.buf.split_to(total);
        Ok(LinkFrame::decode(&frame_bytes)?)
    }

    /// Ensures at least `n` bytes are buffered, reading from the transport
    /// as needed.
    async fn fill(&mut self, n: usize) -> Result<(), AccessoryError<T::Error>> {
        while self.buf.len() < n {
            let read = self.transport.read(&mut self.scratch).await.map_err(AccessoryError::Transport)?;
            if read == 0 {
                return Err(AccessoryError::TransportEof);
            }
            self.buf.extend_from_slice(&self.scratch[..read]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use iap2_proto::ControlFlags;

    use super::*;
    use crate::transport::MemoryTransport;

    #[tokio::test]
    async fn reads_detect_marker() {
        let (mut a, b) = MemoryTransport::pair(64);
        a.write_all(&DETECT_MARKER).await.expect("write");
        let mut io = FrameIo::new(b);
        let input = io.read_next(LinkState::Detect).await.expect("read");
        assert_eq!(input, Input::DetectMarker(DETECT_MARKER));
    }

    #[tokio::test]
    async fn resyncs_past_garbage_prefix() {
        let (mut a, b) = MemoryTransport::pair(256);
        let frame =
            LinkFrame::new(ControlFlags::new(ControlFlags::ACK), 1, 0, LinkHeader::CONTROL_SESSION_ID, b"hi".to_vec());
        let mut wire = vec![0xAA, 0xBB, 0xCC];
        wire.extend_from_slice(&frame.encode());
        a.write_all(&wire).await.expect("write");
        drop(a);

        let mut io = FrameIo::new(b);
        let input = io.read_next(LinkState::Normal).await.expect("read");
        assert_eq!(input, Input::Frame(frame));
    }
}
