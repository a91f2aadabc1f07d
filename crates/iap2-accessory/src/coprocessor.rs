//! Authentication coprocessor abstraction.
//!
//! The real MFi coprocessor is reached over I2C and is an external
//! collaborator; this crate only defines the trait the [`crate::driver`]
//! calls through and a [`DemoCoprocessor`] for the demo binary and tests.

use std::future::Future;

use bytes::Bytes;

/// Produces a signed response to an authentication challenge.
///
/// The accessory's certificate is fetched once at startup (into
/// `iap2_app::AccessoryIdentity::certificate`) and is not part of this
/// trait; only the per-session challenge/response exchange is.
pub trait ChallengeCoprocessor: Send + 'static {
    /// Coprocessor-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Signs `challenge`, returning the response bytes to send back as
    /// `AuthenticationResponse`.
    fn respond(&mut self, challenge: Bytes) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;
}

/// A coprocessor stand-in for the demo binary and tests.
///
/// Not cryptographically meaningful: it returns the challenge bytes
/// reversed, which is enough to exercise the handshake without real MFi
/// hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoCoprocessor;

impl ChallengeCoprocessor for DemoCoprocessor {
    type Error = std::convert::Infallible;

    async fn respond(&mut self, challenge: Bytes) -> Result<Bytes, Self::Error> {
        let mut response: Vec<u8> = challenge.to_vec();
        response.reverse();
        Ok(Bytes::from(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_coprocessor_reverses_challenge() {
        let mut coprocessor = DemoCoprocessor;
        let response = coprocessor.respond(Bytes::from_static(b"abc")).await.expect("respond");
        assert_eq!(response.as_ref(), b"cba");
    }
}
