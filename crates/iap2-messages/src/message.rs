//! [`Message`], the decode/encode entry point dispatching on a CSM's
//! `msg_id` to its concrete catalogue type.

use bytes::Bytes;

use crate::{
    catalogue::{authentication::*, car_play::*, eap::*, identification::*, vehicle_status::*, wifi::*},
    errors::{CsmError, Result},
    schema,
};

/// Every Control Session Message this crate knows how to decode and
/// encode, tagged by its concrete type.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Message {
    StartIdentification(StartIdentification),
    IdentificationInformation(IdentificationInformation),
    IdentificationAccepted(IdentificationAccepted),
    IdentificationRejected(IdentificationRejected),
    RequestAuthenticationCertificate(RequestAuthenticationCertificate),
    AuthenticationCertificate(AuthenticationCertificate),
    RequestAuthenticationChallengeResponse(RequestAuthenticationChallengeResponse),
    AuthenticationResponse(AuthenticationResponse),
    AuthenticationFailed(AuthenticationFailed),
    AuthenticationSucceeded(AuthenticationSucceeded),
    StartExternalAccessoryProtocolSession(StartExternalAccessoryProtocolSession),
    StopExternalAccessoryProtocolSession(StopExternalAccessoryProtocolSession),
    StatusExternalAccessoryProtocolSession(StatusExternalAccessoryProtocolSession),
    StartVehicleStatusUpdates(StartVehicleStatusUpdates),
    VehicleStatusUpdate(VehicleStatusUpdate),
    StopVehicleStatusUpdates(StopVehicleStatusUpdates),
    RequestWiFiInformation(RequestWiFiInformation),
    WiFiInformation(WiFiInformation),
    RequestAccessoryWiFiConfigurationInformation(RequestAccessoryWiFiConfigurationInformation),
    AccessoryWiFiConfigurationInformation(AccessoryWiFiConfigurationInformation),
    DeviceTransportIdentifierNotification(DeviceTransportIdentifierNotification),
    WirelessCarPlayUpdate(WirelessCarPlayUpdate),
}

impl Message {
    /// The wire message id this value would encode as.
    #[must_use]
    pub fn msg_id(&self) -> u16 {
        match self {
            Self::StartIdentification(_) => StartIdentification::MSG_ID,
            Self::IdentificationInformation(_) => IdentificationInformation::MSG_ID,
            Self::IdentificationAccepted(_) => IdentificationAccepted::MSG_ID,
            Self::IdentificationRejected(_) => IdentificationRejected::MSG_ID,
            Self::RequestAuthenticationCertificate(_) => RequestAuthenticationCertificate::MSG_ID,
            Self::AuthenticationCertificate(_) => AuthenticationCertificate::MSG_ID,
            Self::RequestAuthenticationChallengeResponse(_) => RequestAuthenticationChallengeResponse::MSG_ID,
            Self::AuthenticationResponse(_) => AuthenticationResponse::MSG_ID,
            Self::AuthenticationFailed(_) => AuthenticationFailed::MSG_ID,
            Self::AuthenticationSucceeded(_) => AuthenticationSucceeded::MSG_ID,
            Self::StartExternalAccessoryProtocolSession(_) => StartExternalAccessoryProtocolSession::MSG_ID,
            Self::StopExternalAccessoryProtocolSession(_) => StopExternalAccessoryProtocolSession::MSG_ID,
            Self::StatusExternalAccessoryProtocolSession(_) => StatusExternalAccessoryProtocolSession::MSG_ID,
            Self::StartVehicleStatusUpdates(_) => StartVehicleStatusUpdates::MSG_ID,
            Self::VehicleStatusUpdate(_) => VehicleStatusUpdate::MSG_ID,
            Self::StopVehicleStatusUpdates(_) => StopVehicleStatusUpdates::MSG_ID,
            Self::RequestWiFiInformation(_) => RequestWiFiInformation::MSG_ID,
            Self::WiFiInformation(_) => WiFiInformation::MSG_ID,
            Self::RequestAccessoryWiFiConfigurationInformation(_) => {
                RequestAccessoryWiFiConfigurationInformation::MSG_ID
            }
            Self::AccessoryWiFiConfigurationInformation(_) => AccessoryWiFiConfigurationInformation::MSG_ID,
            Self::DeviceTransportIdentifierNotification(_) => DeviceTransportIdentifierNotification::MSG_ID,
            Self::WirelessCarPlayUpdate(_) => WirelessCarPlayUpdate::MSG_ID,
        }
    }

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::StartIdentification(m) => m.encode(),
            Self::IdentificationInformation(m) => m.encode(),
            Self::IdentificationAccepted(m) => m.encode(),
            Self::IdentificationRejected(m) => m.encode(),
            Self::RequestAuthenticationCertificate(m) => m.encode(),
            Self::AuthenticationCertificate(m) => m.encode(),
            Self::RequestAuthenticationChallengeResponse(m) => m.encode(),
            Self::AuthenticationResponse(m) => m.encode(),
            Self::AuthenticationFailed(m) => m.encode(),
            Self::AuthenticationSucceeded(m) => m.encode(),
            Self::StartExternalAccessoryProtocolSession(m) => m.encode(),
            Self::StopExternalAccessoryProtocolSession(m) => m.encode(),
            Self::StatusExternalAccessoryProtocolSession(m) => m.encode(),
            Self::StartVehicleStatusUpdates(m) => m.encode(),
            Self::VehicleStatusUpdate(m) => m.encode(),
            Self::StopVehicleStatusUpdates(m) => m.encode(),
            Self::RequestWiFiInformation(m) => m.encode(),
            Self::WiFiInformation(m) => m.encode(),
            Self::RequestAccessoryWiFiConfigurationInformation(m) => m.encode(),
            Self::AccessoryWiFiConfigurationInformation(m) => m.encode(),
            Self::DeviceTransportIdentifierNotification(m) => m.encode(),
            Self::WirelessCarPlayUpdate(m) => m.encode(),
        }
    }

    /// Decodes a full message, header included, dispatching on its
    /// `msg_id` to the matching catalogue type.
    ///
    /// # Errors
    ///
    /// Any [`CsmError`] the header or body decode produces, plus
    /// [`CsmError::UnknownMessageId`] if no catalogue entry matches.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (msg_id, body) = schema::decode_header(bytes)?;
        match msg_id {
            StartIdentification::MSG_ID => Ok(Self::StartIdentification(StartIdentification::decode(body)?)),
            IdentificationInformation::MSG_ID => {
                Ok(Self::IdentificationInformation(IdentificationInformation::decode(body)?))
            }
            IdentificationAccepted::MSG_ID => Ok(Self::IdentificationAccepted(IdentificationAccepted::decode(body)?)),
            IdentificationRejected::MSG_ID => Ok(Self::IdentificationRejected(IdentificationRejected::decode(body)?)),
            RequestAuthenticationCertificate::MSG_ID => {
                Ok(Self::RequestAuthenticationCertificate(RequestAuthenticationCertificate::decode(body)?))
            }
            AuthenticationCertificate::MSG_ID => {
                Ok(Self::AuthenticationCertificate(AuthenticationCertificate::decode(body)?))
            }
            RequestAuthenticationChallengeResponse::MSG_ID => Ok(Self::RequestAuthenticationChallengeResponse(
                RequestAuthenticationChallengeResponse::decode(body)?,
            )),
            AuthenticationResponse::MSG_ID => Ok(Self::AuthenticationResponse(AuthenticationResponse::decode(body)?)),
            AuthenticationFailed::MSG_ID => Ok(Self::AuthenticationFailed(AuthenticationFailed::decode(body)?)),
            AuthenticationSucceeded::MSG_ID => {
                Ok(Self::AuthenticationSucceeded(AuthenticationSucceeded::decode(body)?))
            }
            StartExternalAccessoryProtocolSession::MSG_ID => Ok(Self::StartExternalAccessoryProtocolSession(
                StartExternalAccessoryProtocolSession::decode(body)?,
            )),
            StopExternalAccessoryProtocolSession::MSG_ID => Ok(Self::StopExternalAccessoryProtocolSession(
                StopExternalAccessoryProtocolSession::decode(body)?,
            )),
            StatusExternalAccessoryProtocolSession::MSG_ID => Ok(Self::StatusExternalAccessoryProtocolSession(
                StatusExternalAccessoryProtocolSession::decode(body)?,
            )),
            StartVehicleStatusUpdates::MSG_ID => {
                Ok(Self::StartVehicleStatusUpdates(StartVehicleStatusUpdates::decode(body)?))
            }
            VehicleStatusUpdate::MSG_ID => Ok(Self::VehicleStatusUpdate(VehicleStatusUpdate::decode(body)?)),
            StopVehicleStatusUpdates::MSG_ID => {
                Ok(Self::StopVehicleStatusUpdates(StopVehicleStatusUpdates::decode(body)?))
            }
            RequestWiFiInformation::MSG_ID => Ok(Self::RequestWiFiInformation(RequestWiFiInformation::decode(body)?)),
            WiFiInformation::MSG_ID => Ok(Self::WiFiInformation(WiFiInformation::decode(body)?)),
            RequestAccessoryWiFiConfigurationInformation::MSG_ID => Ok(
                Self::RequestAccessoryWiFiConfigurationInformation(
                    RequestAccessoryWiFiConfigurationInformation::decode(body)?,
                ),
            ),
            AccessoryWiFiConfigurationInformation::MSG_ID => Ok(Self::AccessoryWiFiConfigurationInformation(
                AccessoryWiFiConfigurationInformation::decode(body)?,
            )),
            DeviceTransportIdentifierNotification::MSG_ID => Ok(Self::DeviceTransportIdentifierNotification(
                DeviceTransportIdentifierNotification::decode(body)?,
            )),
            WirelessCarPlayUpdate::MSG_ID => Ok(Self::WirelessCarPlayUpdate(WirelessCarPlayUpdate::decode(body)?)),
            other => Err(CsmError::UnknownMessageId(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_to_the_right_catalogue_type() {
        let msg = Message::WirelessCarPlayUpdate(WirelessCarPlayUpdate { status: WirelessCarPlayStatus::Available });
        let encoded = msg.encode();
        assert_eq!(Message::decode(&encoded).expect("decode"), msg);
    }

    #[test]
    fn unknown_msg_id_is_an_error() {
        let bogus = schema::encode_message(0xBEEF, &[]);
        assert!(matches!(Message::decode(&bogus), Err(CsmError::UnknownMessageId(0xBEEF))));
    }
}
