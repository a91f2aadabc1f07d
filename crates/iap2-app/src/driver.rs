//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from the specific
//! transport and clock that drive it. An implementation owns the link
//! engine, the byte transport, and the authentication coprocessor; the
//! generic [`crate::Runtime`] only ever sees [`AppEvent`]s and [`Message`]s.
//!
//! # Implementations
//!
//! - **accessory**: a real (or in-memory) byte transport driving an
//!   `iap2-core` link engine and session streams.
//! - **test doubles**: an in-memory queue of events and sent messages, for
//!   exercising [`crate::App`]/[`crate::Runtime`] without any I/O.

use std::{future::Future, ops::Sub, time::Duration};

use bytes::Bytes;
use iap2_messages::{Message, catalogue::vehicle_status::VehicleStatusUpdate};

use crate::AppEvent;

/// Abstracts I/O for the application runtime.
///
/// Implementations provide the platform-specific transport and clock while
/// the generic [`crate::Runtime`] handles orchestration. This lets the same
/// orchestration code run over a real link and over an in-memory one in
/// tests.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in tests.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Polls for the next input event.
    ///
    /// Returns `None` if the link has nothing further to deliver and the
    /// runtime should stop.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Encodes and sends `message` on the control session stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is closed or the send fails.
    fn send_message(&mut self, message: Message) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Hands `challenge` to the authentication coprocessor and returns its
    /// signed response.
    ///
    /// # Errors
    ///
    /// Returns an error if the coprocessor is unreachable or refuses.
    fn challenge_response(&mut self, challenge: Bytes) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;

    /// Surfaces a vehicle telemetry report. The real persistence or display
    /// of the value is an external collaborator's concern.
    fn report_vehicle_status(&mut self, update: VehicleStatusUpdate);

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Tears down the link and releases any held resources.
    fn stop(&mut self);
}
