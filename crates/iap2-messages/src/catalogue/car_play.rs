//! Wireless CarPlay messages (`0x4E0D`, `0x4E0E`): pairing transport
//! identifiers and reporting wireless CarPlay availability.

use bytes::Bytes;

use crate::{
    errors::{CsmError, Result},
    schema::{self, find_one, read_string, read_u8, string_param, u8_param},
};

/// `0x4E0E`: tells the device which Bluetooth/USB transport ids carry
/// wireless CarPlay traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTransportIdentifierNotification {
    /// Bluetooth transport identifier.
    pub bluetooth_transport_id: String,
    /// USB transport identifier.
    pub usb_transport_id: String,
}

impl DeviceTransportIdentifierNotification {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x4E0E;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(
            Self::MSG_ID,
            &[string_param(0, &self.bluetooth_transport_id), string_param(1, &self.usb_transport_id)],
        )
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let bluetooth_transport_id = find_one(&fields, 0).ok_or(CsmError::MissingRequiredParameter {
            msg_id: Self::MSG_ID,
            param_id: 0,
            field: "bluetooth_transport_id",
        })?;
        let usb_transport_id = find_one(&fields, 1).ok_or(CsmError::MissingRequiredParameter {
            msg_id: Self::MSG_ID,
            param_id: 1,
            field: "usb_transport_id",
        })?;
        Ok(Self {
            bluetooth_transport_id: read_string(bluetooth_transport_id, "bluetooth_transport_id")?,
            usb_transport_id: read_string(usb_transport_id, "usb_transport_id")?,
        })
    }
}

/// Whether wireless CarPlay is currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirelessCarPlayStatus {
    /// Not currently available.
    Unavailable,
    /// Available.
    Available,
}

impl WirelessCarPlayStatus {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unavailable),
            1 => Some(Self::Available),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Unavailable => 0,
            Self::Available => 1,
        }
    }
}

/// `0x4E0D`: reports a change in wireless CarPlay availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirelessCarPlayUpdate {
    /// Current availability.
    pub status: WirelessCarPlayStatus,
}

impl WirelessCarPlayUpdate {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x4E0D;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[u8_param(0, self.status.to_u8())])
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let status = find_one(&fields, 0)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 0, field: "status" })?;
        let status_raw = read_u8(status, "status")?;
        Ok(Self {
            status: WirelessCarPlayStatus::from_u8(status_raw)
                .ok_or(CsmError::InvalidEnumValue { param_id: 0, field: "status", value: status_raw })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_transport_identifier_notification_round_trips() {
        let msg = DeviceTransportIdentifierNotification {
            bluetooth_transport_id: "bt-0".to_string(),
            usb_transport_id: "usb-0".to_string(),
        };
        let encoded = msg.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, DeviceTransportIdentifierNotification::MSG_ID);
        assert_eq!(DeviceTransportIdentifierNotification::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn wireless_car_play_update_round_trips() {
        let msg = WirelessCarPlayUpdate { status: WirelessCarPlayStatus::Available };
        let encoded = msg.encode();
        let (_, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(WirelessCarPlayUpdate::decode(body).expect("decode body"), msg);
    }
}
