//! iAP2 accessory demo binary.
//!
//! Wires an [`AccessoryDriver`] up to a scripted peer over an in-memory
//! transport and runs the full link negotiation, authentication, and
//! identification handshake end to end, without any real iAP2 hardware.
//!
//! ```bash
//! iap2-accessory --log-level debug
//! ```

use bytes::Bytes;
use clap::Parser;
use iap2_accessory::{AccessoryDriver, DemoCoprocessor, MemoryTransport};
use iap2_app::{AccessoryIdentity, AppEvent, Driver, Runtime};
use iap2_core::{LinkConfig, SystemEnvironment};
use iap2_messages::{
    Message,
    catalogue::{
        authentication::{
            AuthenticationCertificate, AuthenticationSucceeded, RequestAuthenticationCertificate,
            RequestAuthenticationChallengeResponse,
        },
        identification::{IdentificationAccepted, IdentificationInformation, PowerProvidingCapability, StartIdentification},
        vehicle_status::StartVehicleStatusUpdates,
    },
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Multiplexing id for the demo's single external-accessory stream.
const EA_STREAM_ID: u16 = 0x07;

/// Payload written to the external-accessory stream once the link is up,
/// to exercise [`iap2_core::SessionStream::write`]/`drain` end to end
/// alongside the CSM handshake.
const EA_PAYLOAD: &[u8] = b"demo-ea-telemetry";

/// iAP2 accessory demo: runs the handshake against a scripted device peer.
#[derive(Parser, Debug)]
#[command(name = "iap2-accessory")]
#[command(about = "iAP2 accessory link demo")]
#[command(version)]
struct Args {
    /// Maximum number of unacknowledged outgoing packets.
    #[arg(long, default_value_t = LinkConfig::default().max_outgoing)]
    max_outgoing: u8,

    /// Maximum retransmissions before the link is considered dead.
    #[arg(long, default_value_t = LinkConfig::default().max_retransmissions)]
    max_retransmissions: u8,

    /// Retransmission timeout, in milliseconds.
    #[arg(long, default_value_t = LinkConfig::default().retransmission_timeout_ms)]
    retransmission_timeout_ms: u16,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn demo_identity() -> AccessoryIdentity {
    AccessoryIdentity {
        information: IdentificationInformation {
            name: "Demo Accessory".to_string(),
            model_identifier: "DEMO-1".to_string(),
            manufacturer: "Acme".to_string(),
            serial_number: "SN-0001".to_string(),
            firmware_version: "1.0.0".to_string(),
            hardware_version: "rev-a".to_string(),
            messages_sent_by_accessory: Bytes::from_static(&[0x00, 0x00]),
            messages_received_from_accessory: Bytes::from_static(&[0x00, 0x00]),
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
        certificate: Bytes::from_static(b"demo-certificate"),
    }
}

/// Drives the non-accessory side of the link: a minimal device stand-in
/// that runs the same link engine but speaks the device's half of the
/// handshake by hand, replying to whatever the accessory sends.
async fn run_device_script(
    mut driver: AccessoryDriver<MemoryTransport, SystemEnvironment, DemoCoprocessor>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let Some(event) = driver.poll_event().await? else {
            return Ok(());
        };
        match event {
            AppEvent::LinkNormal => {
                tracing::info!("device: link up, requesting authentication certificate");
                driver.send_message(Message::RequestAuthenticationCertificate(RequestAuthenticationCertificate)).await?;
            }
            AppEvent::LinkDead(reason) => {
                tracing::warn!(%reason, "device: link died");
                return Ok(());
            }
            AppEvent::MessageReceived(message) => match message {
                Message::AuthenticationCertificate(AuthenticationCertificate { certificate }) => {
                    tracing::info!(bytes = certificate.len(), "device: certificate received, issuing challenge");
                    let challenge = Bytes::from_static(b"challenge-0001");
                    driver
                        .send_message(Message::RequestAuthenticationChallengeResponse(
                            RequestAuthenticationChallengeResponse { challenge: Some(challenge) },
                        ))
                        .await?;
                }
                Message::AuthenticationResponse(_) => {
                    tracing::info!("device: authentication response accepted");
                    driver.send_message(Message::AuthenticationSucceeded(AuthenticationSucceeded)).await?;
                    driver.send_message(Message::StartIdentification(StartIdentification)).await?;
                }
                Message::IdentificationInformation(info) => {
                    tracing::info!(name = %info.name, "device: identification received, accepting");
                    driver.send_message(Message::IdentificationAccepted(IdentificationAccepted)).await?;
                    driver.send_message(Message::StartVehicleStatusUpdates(StartVehicleStatusUpdates)).await?;
                }
                Message::VehicleStatusUpdate(update) => {
                    tracing::info!(?update, "device: vehicle status update");
                }
                other => tracing::debug!(?other, "device: ignoring message"),
            },
            AppEvent::ChallengeResponseReady(_) => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("iAP2 accessory demo starting");

    let config = LinkConfig {
        max_outgoing: args.max_outgoing,
        max_retransmissions: args.max_retransmissions,
        retransmission_timeout_ms: args.retransmission_timeout_ms,
        ..Default::default()
    };

    let (accessory_transport, device_transport) = MemoryTransport::pair(16 * 1024);

    let mut accessory_driver = AccessoryDriver::new(accessory_transport, SystemEnvironment, DemoCoprocessor, config.clone());
    let mut device_driver = AccessoryDriver::new(device_transport, SystemEnvironment, DemoCoprocessor, config);

    let accessory_ea_stream = accessory_driver.open_external_accessory_stream(EA_STREAM_ID);
    let device_ea_stream = device_driver.open_external_accessory_stream(EA_STREAM_ID);

    let accessory = tokio::spawn(Runtime::new(accessory_driver, demo_identity()).run());
    let device = tokio::spawn(run_device_script(device_driver));

    let ea_writer = tokio::spawn(async move {
        accessory_ea_stream.write(EA_PAYLOAD).await?;
        tracing::info!("accessory: wrote external-accessory stream payload");
        Ok::<(), iap2_core::StreamError>(())
    });
    let ea_reader = tokio::spawn(async move {
        let data = device_ea_stream.read_exactly(EA_PAYLOAD.len()).await?;
        tracing::info!(bytes = ?data, "device: external-accessory stream payload received");
        Ok::<(), iap2_core::StreamError>(())
    });

    let (accessory_result, device_result, ea_writer_result, ea_reader_result) =
        tokio::join!(accessory, device, ea_writer, ea_reader);
    accessory_result??;
    device_result??;
    ea_writer_result??;
    ea_reader_result??;

    tracing::info!("iAP2 accessory demo finished");
    Ok(())
}
