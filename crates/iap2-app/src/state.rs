//! Observable application state types.
//!
//! These structures hold the subset of protocol state the orchestration
//! layer needs to decide what to do next; they are not a general-purpose
//! model of everything an accessory might know about itself.

use bytes::Bytes;
use iap2_messages::catalogue::identification::IdentificationInformation;

/// Where the orchestration is in the auth/identification handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the link to reach `NORMAL` state.
    AwaitingLink,
    /// Link is up; waiting for the device to request authentication.
    AwaitingAuthentication,
    /// A challenge was sent to the authentication coprocessor; waiting for
    /// its response.
    AwaitingChallengeResponse,
    /// Authenticated; waiting for the device to request identification.
    AwaitingIdentification,
    /// Identification accepted; steady-state operation.
    Ready,
    /// Authentication or identification failed; the link should be torn
    /// down.
    Failed,
}

/// The accessory's static self-description, supplied once at startup and
/// sent verbatim in [`IdentificationInformation`] whenever the device asks.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryIdentity {
    /// The full identification payload this accessory advertises.
    pub information: IdentificationInformation,
    /// MFi certificate bytes, supplied by the authentication coprocessor.
    pub certificate: Bytes,
}
