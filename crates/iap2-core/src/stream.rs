//! Session streams: the byte-stream abstraction built on top of the link
//! engine's packet exchange.
//!
//! Two session streams exist per connection: the control stream
//! (`session_id == 10`, created automatically) and zero or more
//! external-accessory streams (`session_id == 11`, demultiplexed by a
//! 2-byte `stream_id` prefix the stream itself manages). Both share this
//! same implementation; only the EA variant carries a `stream_id`.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicBool, Ordering},
};

use bytes::{Bytes, BytesMut};
use iap2_proto::LinkHeader;
use tokio::sync::{Mutex, Notify};

use crate::error::StreamError;

struct Inner {
    session_id: u8,
    stream_id: Option<u16>,
    max_len: usize,
    in_buffer: Mutex<VecDeque<u8>>,
    out_buffer: Mutex<Vec<u8>>,
    read_ready: Notify,
    write_allowed: Notify,
    closed: AtomicBool,
    reader_pending: AtomicBool,
}

/// A single session's byte stream: buffered writes, a blocking
/// `read_exactly`, and EOF propagation when the link dies.
///
/// Cloning shares the underlying buffers — this is a cheap handle, not a
/// deep copy, mirroring how the link engine and its driver both need to
/// reach the same stream state.
#[derive(Clone)]
pub struct SessionStream {
    inner: std::sync::Arc<Inner>,
}

impl SessionStream {
    /// Creates the fixed control-session stream. `max_len` bounds the size
    /// of each chunk [`Self::drain`] hands back.
    #[must_use]
    pub fn control(max_len: usize) -> Self {
        Self::new(LinkHeader::CONTROL_SESSION_ID, None, max_len)
    }

    /// Creates an external-accessory stream multiplexed under `stream_id`.
    /// `max_len` bounds the size of each chunk [`Self::drain`] hands back,
    /// including the 2-byte `stream_id` prefix every chunk carries.
    #[must_use]
    pub fn external_accessory(stream_id: u16, max_len: usize) -> Self {
        Self::new(LinkHeader::EA_SESSION_ID, Some(stream_id), max_len)
    }

    fn new(session_id: u8, stream_id: Option<u16>, max_len: usize) -> Self {
        Self {
            inner: std::sync::Arc::new(Inner {
                session_id,
                stream_id,
                max_len,
                in_buffer: Mutex::new(VecDeque::new()),
                out_buffer: Mutex::new(Vec::new()),
                read_ready: Notify::new(),
                write_allowed: Notify::new(),
                closed: AtomicBool::new(false),
                reader_pending: AtomicBool::new(false),
            }),
        }
    }

    /// The link session this stream is carried on (10 or 11).
    #[must_use]
    pub fn session_id(&self) -> u8 {
        self.inner.session_id
    }

    /// This stream's multiplexing id, for external-accessory streams.
    #[must_use]
    pub fn stream_id(&self) -> Option<u16> {
        self.inner.stream_id
    }

    /// Bytes of `stream_id` prefix every chunk [`Self::drain`] produces
    /// must carry ahead of payload data.
    fn prefix_len(&self) -> usize {
        if self.inner.stream_id.is_some() { 2 } else { 0 }
    }

    /// Appends `data` to the outbound buffer. Does not block and does not
    /// itself cause a packet to be sent — call [`Self::drain`] for that.
    ///
    /// # Errors
    ///
    /// [`StreamError::Closed`] if the stream has already been closed by
    /// [`Self::feed_eof`].
    pub async fn write(&self, data: &[u8]) -> Result<(), StreamError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(StreamError::Closed);
        }
        let mut out = self.inner.out_buffer.lock().await;
        out.extend_from_slice(data);
        Ok(())
    }

    /// Waits until the link engine signals that a write is allowed, then
    /// takes one chunk of at most `max_len` bytes off the outbound buffer
    /// (prefixed with the stream's `stream_id`, for EA streams) for the
    /// caller to hand to [`crate::engine::LinkEngine::send_packet`].
    ///
    /// A buffer larger than `max_len` requires repeated `drain` calls to
    /// fully flush; every chunk produced carries its own `stream_id`
    /// prefix so the peer can demultiplex each packet independently.
    ///
    /// Returns `None` immediately if the outbound buffer is currently
    /// empty — there is nothing to drain.
    pub async fn drain(&self) -> Option<Bytes> {
        {
            let out = self.inner.out_buffer.lock().await;
            if out.is_empty() {
                return None;
            }
        }
        self.inner.write_allowed.notified().await;

        let mut out = self.inner.out_buffer.lock().await;
        let prefix_len = self.prefix_len();
        let chunk_len = out.len().min(self.inner.max_len.saturating_sub(prefix_len)).max(1);
        let payload: Vec<u8> = out.drain(..chunk_len).collect();

        let mut taken = BytesMut::with_capacity(prefix_len + payload.len());
        if let Some(id) = self.inner.stream_id {
            taken.extend_from_slice(&id.to_be_bytes());
        }
        taken.extend_from_slice(&payload);
        Some(taken.freeze())
    }

    /// Signals that the link engine's send window has opened, waking the
    /// stream currently suspended in [`Self::drain`]. Called by the
    /// driver, never by the engine core directly.
    ///
    /// Uses a single stored permit rather than broadcasting to waiters, so
    /// a driver that signals before a `drain` call has parked — the
    /// common case when flushing inline — does not lose the wakeup.
    pub fn signal_write_allowed(&self) {
        self.inner.write_allowed.notify_one();
    }

    /// Appends received payload bytes and wakes a pending reader if enough
    /// data is now available. Called by the driver when the engine emits a
    /// `DeliverData` action for this stream.
    pub async fn push_inbound(&self, data: &[u8]) {
        let mut buffer = self.inner.in_buffer.lock().await;
        buffer.extend(data.iter().copied());
        drop(buffer);
        self.inner.read_ready.notify_waiters();
    }

    /// Reads exactly `n` bytes, suspending until they are available.
    ///
    /// # Errors
    ///
    /// - [`StreamError::ReaderAlreadyPending`] if another call to
    ///   `read_exactly` is already suspended on this stream.
    /// - [`StreamError::IncompleteRead`] if the stream is closed before `n`
    ///   bytes accumulate.
    pub async fn read_exactly(&self, n: usize) -> Result<Bytes, StreamError> {
        if self.inner.reader_pending.swap(true, Ordering::AcqRel) {
            return Err(StreamError::ReaderAlreadyPending);
        }
        let result = self.read_exactly_inner(n).await;
        self.inner.reader_pending.store(false, Ordering::Release);
        result
    }

    async fn read_exactly_inner(&self, n: usize) -> Result<Bytes, StreamError> {
        loop {
            let mut buffer = self.inner.in_buffer.lock().await;
            if buffer.len() >= n {
                let out: Vec<u8> = buffer.drain(..n).collect();
                return Ok(Bytes::from(out));
            }
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(StreamError::IncompleteRead { expected: n, partial: buffer.len() });
            }
            drop(buffer);
            self.inner.read_ready.notified().await;
        }
    }

    /// Marks the stream closed and wakes any pending reader so it observes
    /// EOF instead of hanging. Called when the link engine signals teardown.
    pub fn feed_eof(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.read_ready.notify_waiters();
    }

    /// True once [`Self::feed_eof`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_drain_returns_buffered_bytes() {
        let stream = SessionStream::control(4096);
        stream.write(b"hello").await.expect("write");

        let handle = stream.clone();
        let drain_task = tokio::spawn(async move { handle.drain().await });
        tokio::task::yield_now().await;
        stream.signal_write_allowed();

        let drained = drain_task.await.expect("task join").expect("some bytes");
        assert_eq!(drained.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn drain_is_none_when_buffer_empty() {
        let stream = SessionStream::control(4096);
        assert!(stream.drain().await.is_none());
    }

    #[tokio::test]
    async fn ea_stream_drain_carries_stream_id_prefix() {
        let stream = SessionStream::external_accessory(0x0102, 4096);
        stream.write(b"hi").await.expect("write");
        let handle = stream.clone();
        let drain_task = tokio::spawn(async move { handle.drain().await });
        tokio::task::yield_now().await;
        stream.signal_write_allowed();
        let drained = drain_task.await.expect("task join").expect("some bytes");
        assert_eq!(drained.as_ref(), &[0x01, 0x02, b'h', b'i']);
    }

    #[tokio::test]
    async fn drain_chunks_to_max_len_with_prefix_on_every_chunk() {
        let stream = SessionStream::external_accessory(0x0001, 4);
        stream.write(b"abcdef").await.expect("write");

        stream.signal_write_allowed();
        let first = stream.drain().await.expect("first chunk");
        assert_eq!(first.as_ref(), &[0x00, 0x01, b'a', b'b']);

        stream.signal_write_allowed();
        let second = stream.drain().await.expect("second chunk");
        assert_eq!(second.as_ref(), &[0x00, 0x01, b'c', b'd']);

        stream.signal_write_allowed();
        let third = stream.drain().await.expect("third chunk");
        assert_eq!(third.as_ref(), &[0x00, 0x01, b'e', b'f']);

        assert!(stream.drain().await.is_none());
    }

    #[tokio::test]
    async fn write_after_eof_fails_closed() {
        let stream = SessionStream::control(4096);
        stream.feed_eof();
        let err = stream.write(b"too late").await.unwrap_err();
        assert_eq!(err, StreamError::Closed);
    }

    #[tokio::test]
    async fn read_exactly_suspends_until_enough_data() {
        let stream = SessionStream::control(4096);
        let handle = stream.clone();
        let reader = tokio::spawn(async move { handle.read_exactly(5).await });

        tokio::task::yield_now().await;
        stream.push_inbound(b"hel").await;
        tokio::task::yield_now().await;
        stream.push_inbound(b"lo").await;

        let data = reader.await.expect("task join").expect("read succeeded");
        assert_eq!(data.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn read_exactly_rejects_second_concurrent_reader() {
        let stream = SessionStream::control(4096);
        let handle = stream.clone();
        let first = tokio::spawn(async move { handle.read_exactly(1).await });
        tokio::task::yield_now().await;

        let err = stream.read_exactly(1).await.unwrap_err();
        assert_eq!(err, StreamError::ReaderAlreadyPending);

        stream.push_inbound(b"x").await;
        first.await.expect("task join").expect("read succeeded");
    }

    #[tokio::test]
    async fn feed_eof_wakes_pending_reader_with_incomplete_read() {
        let stream = SessionStream::control(4096);
        let handle = stream.clone();
        let reader = tokio::spawn(async move { handle.read_exactly(5).await });
        tokio::task::yield_now().await;

        stream.push_inbound(b"ab").await;
        stream.feed_eof();

        let err = reader.await.expect("task join").unwrap_err();
        assert_eq!(err, StreamError::IncompleteRead { expected: 5, partial: 2 });
    }
}
