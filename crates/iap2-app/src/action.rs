//! Application side-effects and intents.
//!
//! This module defines [`AppAction`], instructions produced by the
//! [`crate::App`] state machine for the driver to execute.

use bytes::Bytes;
use iap2_messages::{Message, catalogue::vehicle_status::VehicleStatusUpdate};

/// Severity of an [`AppAction::Log`], kept independent of `tracing` so the
/// pure state machine has no dependency on how the driver actually logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Diagnostic detail, off by default.
    Debug,
    /// Normal handshake progress.
    Info,
    /// Recoverable anomaly.
    Warn,
    /// Unrecoverable; the link is about to be torn down.
    Error,
}

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Encode and send this message on the control stream.
    SendMessage(Message),

    /// Hand `challenge` to the authentication coprocessor; its response
    /// should be delivered back as [`crate::AppEvent::ChallengeResponseReady`].
    RequestChallengeResponse(Bytes),

    /// A vehicle telemetry report arrived; the real persistence/UI side
    /// effect is an external collaborator, this only surfaces the value.
    VehicleStatusChanged(VehicleStatusUpdate),

    /// Emit a log line.
    Log(LogLevel, String),

    /// Authentication or identification failed; tear down the link.
    Disconnect,
}
