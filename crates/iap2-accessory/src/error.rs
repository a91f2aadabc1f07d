//! Accessory driver error type.

use thiserror::Error;

/// Errors surfaced by [`crate::driver::AccessoryDriver`].
///
/// Generic over the transport's own error type `TE`; the authentication
/// coprocessor's error is folded into [`Self::Coprocessor`] as a string
/// since `AccessoryDriver` does not otherwise need to match on it.
#[derive(Error, Debug)]
pub enum AccessoryError<TE>
where
    TE: std::error::Error + Send + Sync + 'static,
{
    /// The underlying byte transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] TE),

    /// The transport reached EOF while a full frame or CSM message was
    /// expected.
    #[error("transport closed unexpectedly")]
    TransportEof,

    /// A link-layer frame failed to decode past what `FrameIo`'s byte-shift
    /// re-sync already handles.
    #[error(transparent)]
    Protocol(#[from] iap2_proto::ProtocolError),

    /// A control-session message failed to decode.
    #[error(transparent)]
    Message(#[from] iap2_messages::CsmError),

    /// The authentication coprocessor could not produce a response.
    #[error("coprocessor error: {0}")]
    Coprocessor(String),

    /// The link engine reported an unrecoverable state (surfaced here only
    /// when the driver cannot instead fold it into an `AppEvent::LinkDead`).
    #[error("link error: {0}")]
    Link(#[from] iap2_core::LinkError),

    /// A session stream read failed.
    #[error(transparent)]
    Stream(#[from] iap2_core::StreamError),
}
