//! External Accessory Protocol session messages (`0xEA00`, `0xEA01`,
//! `0xEA03`): opening, closing, and reporting the status of an EA protocol
//! session multiplexed over the link's EA session stream.

use bytes::Bytes;

use crate::{
    errors::{CsmError, Result},
    schema::{self, find_one, read_u16, read_u8, u16_param, u8_param},
};

/// Outcome reported for an EA protocol session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The session is healthy.
    Ok,
    /// The session has been closed.
    Close,
}

impl SessionStatus {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Close),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Close => 1,
        }
    }
}

/// `0xEA00`: requests that the device open an EA protocol session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartExternalAccessoryProtocolSession {
    /// Index into the accessory's advertised protocol list.
    pub protocol_id: u8,
    /// Session id to multiplex this protocol's data over.
    pub session_id: u16,
}

impl StartExternalAccessoryProtocolSession {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xEA00;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[u8_param(0, self.protocol_id), u16_param(1, self.session_id)])
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let protocol_id = find_one(&fields, 0)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 0, field: "protocol_id" })?;
        let session_id = find_one(&fields, 1)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 1, field: "session_id" })?;
        Ok(Self { protocol_id: read_u8(protocol_id, "protocol_id")?, session_id: read_u16(session_id, "session_id")? })
    }
}

/// `0xEA01`: requests that the device close an EA protocol session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopExternalAccessoryProtocolSession {
    /// Session id to close.
    pub session_id: u16,
}

impl StopExternalAccessoryProtocolSession {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xEA01;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[u16_param(0, self.session_id)])
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let session_id = find_one(&fields, 0)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 0, field: "session_id" })?;
        Ok(Self { session_id: read_u16(session_id, "session_id")? })
    }
}

/// `0xEA03`: reports an EA protocol session's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusExternalAccessoryProtocolSession {
    /// Session id this status applies to.
    pub session_id: u16,
    /// Current status.
    pub status: SessionStatus,
}

impl StatusExternalAccessoryProtocolSession {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xEA03;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[u16_param(0, self.session_id), u8_param(1, self.status.to_u8())])
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let session_id = find_one(&fields, 0)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 0, field: "session_id" })?;
        let status = find_one(&fields, 1)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 1, field: "status" })?;
        let status_raw = read_u8(status, "status")?;
        Ok(Self {
            session_id: read_u16(session_id, "session_id")?,
            status: SessionStatus::from_u8(status_raw)
                .ok_or(CsmError::InvalidEnumValue { param_id: 1, field: "status", value: status_raw })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_session_round_trips() {
        let msg = StartExternalAccessoryProtocolSession { protocol_id: 2, session_id: 100 };
        let encoded = msg.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, StartExternalAccessoryProtocolSession::MSG_ID);
        assert_eq!(StartExternalAccessoryProtocolSession::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn status_session_round_trips() {
        let msg = StatusExternalAccessoryProtocolSession { session_id: 100, status: SessionStatus::Close };
        let encoded = msg.encode();
        let (_, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(StatusExternalAccessoryProtocolSession::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn unrecognised_status_is_an_error() {
        let bad = schema::encode_message(
            StatusExternalAccessoryProtocolSession::MSG_ID,
            &[u16_param(0, 1), u8_param(1, 9)],
        );
        let (_, body) = schema::decode_header(&bad).expect("decode header");
        let err = StatusExternalAccessoryProtocolSession::decode(body).unwrap_err();
        assert!(matches!(err, CsmError::InvalidEnumValue { value: 9, .. }));
    }
}
