//! Authentication messages (`0xAA00`-`0xAA05`): the MFi certificate/
//! challenge-response exchange accessories must complete before control
//! session messages beyond identification are trusted.

use bytes::Bytes;

use crate::{
    errors::Result,
    schema::{self, Param, find_one},
};

/// `0xAA00`: the device requests the accessory's certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestAuthenticationCertificate;

impl RequestAuthenticationCertificate {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xAA00;

    /// Encodes this (field-less) message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[])
    }

    /// Decodes this (field-less) message.
    pub fn decode(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// `0xAA01`: the accessory's MFi certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationCertificate {
    /// DER-encoded certificate bytes.
    pub certificate: Bytes,
}

impl AuthenticationCertificate {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xAA01;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[Param { id: 0, payload: self.certificate.clone() }])
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let certificate = find_one(&fields, 0)
            .map(|p| p.payload.clone())
            .ok_or(crate::errors::CsmError::MissingRequiredParameter {
                msg_id: Self::MSG_ID,
                param_id: 0,
                field: "certificate",
            })?;
        Ok(Self { certificate })
    }
}

/// `0xAA02`: the device sends a challenge for the accessory to sign.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestAuthenticationChallengeResponse {
    /// The challenge bytes to sign, if any were supplied.
    pub challenge: Option<Bytes>,
}

impl RequestAuthenticationChallengeResponse {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xAA02;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut fields = Vec::new();
        if let Some(challenge) = &self.challenge {
            fields.push(Param { id: 0, payload: challenge.clone() });
        }
        schema::encode_message(Self::MSG_ID, &fields)
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        Ok(Self { challenge: find_one(&fields, 0).map(|p| p.payload.clone()) })
    }
}

/// `0xAA03`: the accessory's signed challenge response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResponse {
    /// Signed response bytes.
    pub response: Bytes,
}

impl AuthenticationResponse {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xAA03;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[Param { id: 0, payload: self.response.clone() }])
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let response = find_one(&fields, 0)
            .map(|p| p.payload.clone())
            .ok_or(crate::errors::CsmError::MissingRequiredParameter {
                msg_id: Self::MSG_ID,
                param_id: 0,
                field: "response",
            })?;
        Ok(Self { response })
    }
}

/// `0xAA04`: authentication failed; the link should be torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthenticationFailed;

impl AuthenticationFailed {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xAA04;

    /// Encodes this (field-less) message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[])
    }

    /// Decodes this (field-less) message.
    pub fn decode(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// `0xAA05`: authentication succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthenticationSucceeded;

impl AuthenticationSucceeded {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xAA05;

    /// Encodes this (field-less) message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[])
    }

    /// Decodes this (field-less) message.
    pub fn decode(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_round_trips() {
        let msg = AuthenticationCertificate { certificate: Bytes::from_static(b"der-bytes") };
        let encoded = msg.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, AuthenticationCertificate::MSG_ID);
        assert_eq!(AuthenticationCertificate::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn challenge_request_without_challenge_round_trips() {
        let msg = RequestAuthenticationChallengeResponse { challenge: None };
        let encoded = msg.encode();
        let (_, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(RequestAuthenticationChallengeResponse::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn challenge_request_with_challenge_round_trips() {
        let msg = RequestAuthenticationChallengeResponse { challenge: Some(Bytes::from_static(b"nonce")) };
        let encoded = msg.encode();
        let (_, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(RequestAuthenticationChallengeResponse::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn failed_and_succeeded_are_field_less() {
        let encoded = AuthenticationFailed.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, AuthenticationFailed::MSG_ID);
        AuthenticationFailed::decode(body).expect("decode");

        let encoded = AuthenticationSucceeded.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, AuthenticationSucceeded::MSG_ID);
        AuthenticationSucceeded::decode(body).expect("decode");
    }
}
