//! Byte transport abstraction and the in-memory transport used by tests and
//! the demo binary.
//!
//! Production transports (Bluetooth RFCOMM, USB HID, USB bulk) are external
//! collaborators implementing the same [`ByteTransport`] trait; this crate
//! only ships [`MemoryTransport`], a duplex in-memory pipe.

use std::future::Future;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Minimal async byte-transport interface the link layer reads and writes
/// through.
///
/// Mirrors `tokio::io::AsyncRead`/`AsyncWrite` in spirit but is kept as its
/// own trait so non-Tokio transports (a raw RFCOMM socket, a USB bulk
/// endpoint) can implement it without adopting Tokio's I/O traits wholesale.
pub trait ByteTransport: Send + 'static {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads at least one byte into `buf`, returning the number of bytes
    /// read, or `0` on EOF.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Writes the entirety of `buf`.
    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// One end of an in-memory duplex pipe.
///
/// [`MemoryTransport::pair`] produces two ends wired to each other, useful
/// for the demo binary (standing in for the real accessory-device link) and
/// for integration tests that drive the full stack without hardware.
pub struct MemoryTransport {
    inner: DuplexStream,
}

impl MemoryTransport {
    /// Builds a connected pair of in-memory transports, each side's writes
    /// visible to the other side's reads. `capacity` bounds how many bytes
    /// can be buffered before a writer blocks.
    #[must_use]
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a, b) = tokio::io::duplex(capacity);
        (Self { inner: a }, Self { inner: b })
    }
}

impl ByteTransport for MemoryTransport {
    type Error = std::io::Error;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.inner.read(buf).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_carries_bytes_in_both_directions() {
        let (mut a, mut b) = MemoryTransport::pair(64);

        a.write_all(b"ping").await.expect("write");
        let mut buf = [0u8; 4];
        b.read(&mut buf).await.expect("read");
        assert_eq!(&buf, b"ping");

        b.write_all(b"pong").await.expect("write");
        let mut buf = [0u8; 4];
        a.read(&mut buf).await.expect("read");
        assert_eq!(&buf, b"pong");
    }

    #[tokio::test]
    async fn read_returns_zero_after_peer_drop() {
        let (a, mut b) = MemoryTransport::pair(64);
        drop(a);
        let mut buf = [0u8; 4];
        assert_eq!(b.read(&mut buf).await.expect("read"), 0);
    }
}
