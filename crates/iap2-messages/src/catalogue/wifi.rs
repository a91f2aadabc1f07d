//! Wi-Fi configuration messages (`0x5700`-`0x5703`): letting an accessory
//! ask the device to join, or advertise, a Wi-Fi network for high-bandwidth
//! companion transports like wireless CarPlay.

use bytes::Bytes;

use crate::{
    errors::{CsmError, Result},
    schema::{self, find_one, read_string, read_u8, string_param, u8_param},
};

/// Outcome of a Wi-Fi information request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiFiRequestStatus {
    /// The device shared its network information.
    Success,
    /// The user declined to share.
    UserDeclined,
    /// No network information is currently available.
    NetworkInformationUnavailable,
}

impl WiFiRequestStatus {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::UserDeclined),
            2 => Some(Self::NetworkInformationUnavailable),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::UserDeclined => 1,
            Self::NetworkInformationUnavailable => 2,
        }
    }
}

/// Wi-Fi security scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityType {
    /// Open network.
    None,
    /// WEP.
    WepNew,
    /// WPA or WPA2.
    WpaWpa2,
}

impl SecurityType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::WepNew),
            2 => Some(Self::WpaWpa2),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::WepNew => 1,
            Self::WpaWpa2 => 2,
        }
    }
}

/// `0x5700`: requests the device's current Wi-Fi network information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestWiFiInformation;

impl RequestWiFiInformation {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x5700;

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

/// `0x5701`: the device's Wi-Fi network information, or the reason it
/// withheld it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiFiInformation {
    /// Outcome of the request.
    pub status: WiFiRequestStatus,
    /// Network SSID, present only on success.
    pub ssid: Option<String>,
    /// Network passphrase, present only on success.
    pub passphrase: Option<String>,
}

impl WiFiInformation {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x5701;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut fields = vec![u8_param(0, self.status.to_u8())];
        if let Some(ssid) = &self.ssid {
            fields.push(string_param(1, ssid));
        }
        if let Some(passphrase) = &self.passphrase {
            fields.push(string_param(2, passphrase));
        }
        schema::encode_message(Self::MSG_ID, &fields)
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let status = find_one(&fields, 0)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 0, field: "status" })?;
        let status_raw = read_u8(status, "status")?;
        Ok(Self {
            status: WiFiRequestStatus::from_u8(status_raw)
                .ok_or(CsmError::InvalidEnumValue { param_id: 0, field: "status", value: status_raw })?,
            ssid: find_one(&fields, 1).map(|p| read_string(p, "ssid")).transpose()?,
            passphrase: find_one(&fields, 2).map(|p| read_string(p, "passphrase")).transpose()?,
        })
    }
}

/// `0x5702`: requests the network the accessory itself should advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestAccessoryWiFiConfigurationInformation;

impl RequestAccessoryWiFiConfigurationInformation {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x5702;

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

/// `0x5703`: the network the accessory is advertising for the device to
/// join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryWiFiConfigurationInformation {
    /// Network SSID, if the accessory is currently advertising one.
    pub ssid: Option<String>,
    /// Network passphrase, if the accessory is currently advertising one.
    pub passphrase: Option<String>,
    /// Security scheme in use.
    pub security_type: SecurityType,
    /// Wi-Fi channel in use.
    pub channel: u8,
}

impl AccessoryWiFiConfigurationInformation {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x5703;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut fields = Vec::new();
        if let Some(ssid) = &self.ssid {
            fields.push(string_param(1, ssid));
        }
        if let Some(passphrase) = &self.passphrase {
            fields.push(string_param(2, passphrase));
        }
        fields.push(u8_param(3, self.security_type.to_u8()));
        fields.push(u8_param(4, self.channel));
        schema::encode_message(Self::MSG_ID, &fields)
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let security_type = find_one(&fields, 3)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 3, field: "security_type" })?;
        let channel = find_one(&fields, 4)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 4, field: "channel" })?;
        let security_type_raw = read_u8(security_type, "security_type")?;
        Ok(Self {
            ssid: find_one(&fields, 1).map(|p| read_string(p, "ssid")).transpose()?,
            passphrase: find_one(&fields, 2).map(|p| read_string(p, "passphrase")).transpose()?,
            security_type: SecurityType::from_u8(security_type_raw)
                .ok_or(CsmError::InvalidEnumValue { param_id: 3, field: "security_type", value: security_type_raw })?,
            channel: read_u8(channel, "channel")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wifi_information_round_trips_on_success() {
        let msg = WiFiInformation {
            status: WiFiRequestStatus::Success,
            ssid: Some("HomeNet".to_string()),
            passphrase: Some("hunter2".to_string()),
        };
        let encoded = msg.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, WiFiInformation::MSG_ID);
        assert_eq!(WiFiInformation::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn wifi_information_round_trips_on_decline_without_ssid() {
        let msg = WiFiInformation { status: WiFiRequestStatus::UserDeclined, ssid: None, passphrase: None };
        let encoded = msg.encode();
        let (_, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(WiFiInformation::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn accessory_wifi_configuration_round_trips() {
        let msg = AccessoryWiFiConfigurationInformation {
            ssid: Some("Accessory-AP".to_string()),
            passphrase: Some("passphrase".to_string()),
            security_type: SecurityType::WpaWpa2,
            channel: 6,
        };
        let encoded = msg.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, AccessoryWiFiConfigurationInformation::MSG_ID);
        assert_eq!(AccessoryWiFiConfigurationInformation::decode(body).expect("decode body"), msg);
    }
}
