//! Application state machine.
//!
//! This module defines the [`App`] state machine: the auth/identification/
//! status-update orchestration that component H of this system reduces to
//! once the link and CSM layers have done their work. It is pure — no I/O,
//! fully testable without a runtime — and consumes [`AppEvent`] inputs to
//! produce [`AppAction`] instructions for the driver to execute.

use iap2_messages::Message;

use crate::{
    AppAction, AppEvent,
    action::LogLevel,
    state::{AccessoryIdentity, Phase},
};

/// Application state machine driving the accessory-side handshake.
///
/// Pure state machine that processes events and produces actions; no I/O
/// dependencies.
#[derive(Debug, Clone)]
pub struct App {
    identity: AccessoryIdentity,
    phase: Phase,
}

impl App {
    /// Creates a new App that will advertise `identity` once authenticated.
    #[must_use]
    pub fn new(identity: AccessoryIdentity) -> Self {
        Self { identity, phase: Phase::AwaitingLink }
    }

    /// Current handshake phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Process an event and return the actions it produces.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::LinkNormal => {
                self.phase = Phase::AwaitingAuthentication;
                vec![AppAction::Log(LogLevel::Info, "link up, awaiting authentication request".to_string())]
            }
            AppEvent::LinkDead(reason) => {
                self.phase = Phase::AwaitingLink;
                vec![AppAction::Log(LogLevel::Warn, format!("link dead: {reason}"))]
            }
            AppEvent::MessageReceived(message) => self.handle_message(message),
            AppEvent::ChallengeResponseReady(response) => self.handle_challenge_response(response),
        }
    }

    fn handle_message(&mut self, message: Message) -> Vec<AppAction> {
        match (self.phase, message) {
            (Phase::AwaitingAuthentication, Message::RequestAuthenticationCertificate(_)) => {
                vec![AppAction::SendMessage(Message::AuthenticationCertificate(
                    iap2_messages::catalogue::authentication::AuthenticationCertificate {
                        certificate: self.identity.certificate.clone(),
                    },
                ))]
            }
            (Phase::AwaitingAuthentication, Message::RequestAuthenticationChallengeResponse(request)) => {
                match request.challenge {
                    Some(challenge) => {
                        self.phase = Phase::AwaitingChallengeResponse;
                        vec![AppAction::RequestChallengeResponse(challenge)]
                    }
                    None => vec![AppAction::Log(
                        LogLevel::Warn,
                        "challenge request carried no challenge bytes".to_string(),
                    )],
                }
            }
            (Phase::AwaitingAuthentication | Phase::AwaitingChallengeResponse, Message::AuthenticationSucceeded(_)) => {
                self.phase = Phase::AwaitingIdentification;
                vec![AppAction::Log(LogLevel::Info, "authenticated, awaiting identification request".to_string())]
            }
            (Phase::AwaitingAuthentication | Phase::AwaitingChallengeResponse, Message::AuthenticationFailed(_)) => {
                self.phase = Phase::Failed;
                vec![AppAction::Log(LogLevel::Error, "authentication failed".to_string()), AppAction::Disconnect]
            }
            (Phase::AwaitingIdentification, Message::StartIdentification(_)) => {
                vec![AppAction::SendMessage(Message::IdentificationInformation(self.identity.information.clone()))]
            }
            (Phase::AwaitingIdentification, Message::IdentificationAccepted(_)) => {
                self.phase = Phase::Ready;
                let mut actions =
                    vec![AppAction::Log(LogLevel::Info, "identification accepted, entering steady state".to_string())];
                if self.identity.information.vehicle_status_component.is_some() {
                    actions.push(AppAction::SendMessage(Message::StartVehicleStatusUpdates(
                        iap2_messages::catalogue::vehicle_status::StartVehicleStatusUpdates,
                    )));
                }
                actions
            }
            (Phase::AwaitingIdentification, Message::IdentificationRejected(rejected)) => {
                self.phase = Phase::Failed;
                vec![
                    AppAction::Log(LogLevel::Error, format!("identification rejected: {rejected:?}")),
                    AppAction::Disconnect,
                ]
            }
            (Phase::Ready, Message::VehicleStatusUpdate(update)) => vec![AppAction::VehicleStatusChanged(update)],
            (phase, message) => {
                vec![AppAction::Log(LogLevel::Debug, format!("unhandled message {message:?} in phase {phase:?}"))]
            }
        }
    }

    fn handle_challenge_response(&mut self, response: bytes::Bytes) -> Vec<AppAction> {
        if self.phase != Phase::AwaitingChallengeResponse {
            return vec![AppAction::Log(
                LogLevel::Warn,
                format!("challenge response arrived in unexpected phase {:?}", self.phase),
            )];
        }
        self.phase = Phase::AwaitingAuthentication;
        vec![AppAction::SendMessage(Message::AuthenticationResponse(
            iap2_messages::catalogue::authentication::AuthenticationResponse { response },
        ))]
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use iap2_messages::catalogue::{
        authentication::{
            AuthenticationCertificate, AuthenticationFailed, AuthenticationSucceeded,
            RequestAuthenticationCertificate, RequestAuthenticationChallengeResponse,
        },
        identification::{
            IdentificationAccepted, IdentificationInformation, PowerProvidingCapability, StartIdentification,
        },
        vehicle_status::StartVehicleStatusUpdates,
    };

    use super::*;

    fn bare_identity() -> AccessoryIdentity {
        AccessoryIdentity {
            information: IdentificationInformation {
                name: "Demo".to_string(),
                model_identifier: "D1".to_string(),
                manufacturer: "Acme".to_string(),
                serial_number: "1".to_string(),
                firmware_version: "1".to_string(),
                hardware_version: "1".to_string(),
                messages_sent_by_accessory: Bytes::new(),
                messages_received_from_accessory: Bytes::new(),
                power_providing_capability: PowerProvidingCapability::None,
                maximum_current_drawn_from_device: 0,
                supported_external_accessory_protocol: vec![],
                app_match_team_id: None,
                current_language: "en-US".to_string(),
                supported_language: vec!["en-US".to_string()],
                serial_transport_component: vec![],
                usb_device_transport_component: vec![],
                usb_host_transport_component: vec![],
                bluetooth_transport_component: vec![],
                vehicle_information_component: None,
                vehicle_status_component: None,
                wireless_car_play_transport_component: None,
            },
            certificate: Bytes::from_static(b"cert"),
        }
    }

    #[test]
    fn full_handshake_reaches_ready_without_vehicle_subscription() {
        let mut app = App::new(bare_identity());
        assert_eq!(app.handle(AppEvent::LinkNormal), vec![AppAction::Log(LogLevel::Info, "link up, awaiting authentication request".to_string())]);

        let actions = app.handle(AppEvent::MessageReceived(Message::RequestAuthenticationCertificate(
            RequestAuthenticationCertificate,
        )));
        assert_eq!(
            actions,
            vec![AppAction::SendMessage(Message::AuthenticationCertificate(AuthenticationCertificate {
                certificate: Bytes::from_static(b"cert")
            }))]
        );

        let actions = app.handle(AppEvent::MessageReceived(Message::RequestAuthenticationChallengeResponse(
            RequestAuthenticationChallengeResponse { challenge: Some(Bytes::from_static(b"nonce")) },
        )));
        assert_eq!(actions, vec![AppAction::RequestChallengeResponse(Bytes::from_static(b"nonce"))]);
        assert_eq!(app.phase(), Phase::AwaitingChallengeResponse);

        let actions = app.handle(AppEvent::ChallengeResponseReady(Bytes::from_static(b"signed")));
        assert!(matches!(actions.as_slice(), [AppAction::SendMessage(Message::AuthenticationResponse(_))]));

        let actions =
            app.handle(AppEvent::MessageReceived(Message::AuthenticationSucceeded(AuthenticationSucceeded)));
        assert_eq!(actions.len(), 1);
        assert_eq!(app.phase(), Phase::AwaitingIdentification);

        let actions = app.handle(AppEvent::MessageReceived(Message::StartIdentification(StartIdentification)));
        assert!(matches!(actions.as_slice(), [AppAction::SendMessage(Message::IdentificationInformation(_))]));

        let actions =
            app.handle(AppEvent::MessageReceived(Message::IdentificationAccepted(IdentificationAccepted)));
        assert_eq!(actions.len(), 1);
        assert_eq!(app.phase(), Phase::Ready);
    }

    #[test]
    fn vehicle_status_subscription_follows_acceptance_when_advertised() {
        let mut identity = bare_identity();
        identity.information.vehicle_status_component = Some(
            iap2_messages::catalogue::identification::VehicleStatusComponent {
                id: 1,
                range: true,
                outside_temperature: false,
                range_warning: false,
            },
        );
        let mut app = App::new(identity);
        app.handle(AppEvent::LinkNormal);
        app.handle(AppEvent::MessageReceived(Message::RequestAuthenticationCertificate(
            RequestAuthenticationCertificate,
        )));
        app.handle(AppEvent::MessageReceived(Message::AuthenticationSucceeded(AuthenticationSucceeded)));
        app.handle(AppEvent::MessageReceived(Message::StartIdentification(StartIdentification)));
        let actions =
            app.handle(AppEvent::MessageReceived(Message::IdentificationAccepted(IdentificationAccepted)));

        assert!(actions.iter().any(|a| matches!(
            a,
            AppAction::SendMessage(Message::StartVehicleStatusUpdates(StartVehicleStatusUpdates))
        )));
    }

    #[test]
    fn authentication_failure_disconnects() {
        let mut app = App::new(bare_identity());
        app.handle(AppEvent::LinkNormal);
        let actions =
            app.handle(AppEvent::MessageReceived(Message::AuthenticationFailed(AuthenticationFailed)));
        assert!(actions.contains(&AppAction::Disconnect));
        assert_eq!(app.phase(), Phase::Failed);
    }
}
