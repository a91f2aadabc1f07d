//! A lightweight `{msg_id -> descriptor}` table for logging and
//! introspection. This is not consulted by [`crate::Message::decode`] —
//! decode dispatch is the hand-written `match` in `message.rs` — it exists
//! so a driver can log a human-readable name for a message it has not yet
//! decoded into its concrete type.

use std::sync::LazyLock;

/// A message's name and declared parameter count, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct MessageDescriptor {
    /// Wire message id.
    pub msg_id: u16,
    /// Rust type name, matching the catalogue module.
    pub name: &'static str,
}

/// All known messages, in catalogue order, keyed by `msg_id`.
pub static REGISTRY: LazyLock<Vec<MessageDescriptor>> = LazyLock::new(|| {
    vec![
        MessageDescriptor { msg_id: 0x1D00, name: "StartIdentification" },
        MessageDescriptor { msg_id: 0x1D01, name: "IdentificationInformation" },
        MessageDescriptor { msg_id: 0x1D02, name: "IdentificationAccepted" },
        MessageDescriptor { msg_id: 0x1D03, name: "IdentificationRejected" },
        MessageDescriptor { msg_id: 0xAA00, name: "RequestAuthenticationCertificate" },
        MessageDescriptor { msg_id: 0xAA01, name: "AuthenticationCertificate" },
        MessageDescriptor { msg_id: 0xAA02, name: "RequestAuthenticationChallengeResponse" },
        MessageDescriptor { msg_id: 0xAA03, name: "AuthenticationResponse" },
        MessageDescriptor { msg_id: 0xAA04, name: "AuthenticationFailed" },
        MessageDescriptor { msg_id: 0xAA05, name: "AuthenticationSucceeded" },
        MessageDescriptor { msg_id: 0xEA00, name: "StartExternalAccessoryProtocolSession" },
        MessageDescriptor { msg_id: 0xEA01, name: "StopExternalAccessoryProtocolSession" },
        MessageDescriptor { msg_id: 0xEA03, name: "StatusExternalAccessoryProtocolSession" },
        MessageDescriptor { msg_id: 0xA100, name: "StartVehicleStatusUpdates" },
        MessageDescriptor { msg_id: 0xA101, name: "VehicleStatusUpdate" },
        MessageDescriptor { msg_id: 0xA102, name: "StopVehicleStatusUpdates" },
        MessageDescriptor { msg_id: 0x5700, name: "RequestWiFiInformation" },
        MessageDescriptor { msg_id: 0x5701, name: "WiFiInformation" },
        MessageDescriptor { msg_id: 0x5702, name: "RequestAccessoryWiFiConfigurationInformation" },
        MessageDescriptor { msg_id: 0x5703, name: "AccessoryWiFiConfigurationInformation" },
        MessageDescriptor { msg_id: 0x4E0E, name: "DeviceTransportIdentifierNotification" },
        MessageDescriptor { msg_id: 0x4E0D, name: "WirelessCarPlayUpdate" },
    ]
});

/// Looks up a message's descriptor by its wire id.
#[must_use]
pub fn describe(msg_id: u16) -> Option<MessageDescriptor> {
    REGISTRY.iter().find(|d| d.msg_id == msg_id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_descriptor_has_a_unique_msg_id() {
        let mut ids: Vec<u16> = REGISTRY.iter().map(|d| d.msg_id).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn describe_finds_a_known_message() {
        let descriptor = describe(0x1D01).expect("identification information is registered");
        assert_eq!(descriptor.name, "IdentificationInformation");
    }

    #[test]
    fn describe_returns_none_for_unknown_id() {
        assert!(describe(0xBEEF).is_none());
    }
}
