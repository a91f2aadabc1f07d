//! Application input events.
//!
//! Events originate from two sources: the link reaching or leaving
//! `NORMAL` state, and decoded control-session messages arriving from the
//! device; plus the asynchronous result of handing a challenge to the
//! authentication coprocessor.

use bytes::Bytes;
use iap2_messages::Message;

/// Events processed by the [`crate::App`] state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The link engine reached `NORMAL` state; the control stream can now
    /// be written to.
    LinkNormal,

    /// The link engine died; `reason` is a human-readable description.
    LinkDead(String),

    /// A control session message was decoded and routed to this layer.
    MessageReceived(Message),

    /// The authentication coprocessor finished signing a challenge.
    ChallengeResponseReady(Bytes),
}
