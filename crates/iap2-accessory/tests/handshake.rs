//! End-to-end link negotiation and external-accessory stream exchange over
//! the in-memory transport, driving both sides through the real
//! [`AccessoryDriver`] without a real iAP2 link.

use std::time::Duration;

use iap2_accessory::{AccessoryDriver, DemoCoprocessor, MemoryTransport};
use iap2_app::{AppEvent, Driver};
use iap2_core::{LinkConfig, SystemEnvironment};
use tokio::sync::mpsc;

const EA_STREAM_ID: u16 = 0x07;

async fn pump_until_normal<D: Driver>(driver: &mut D) {
    loop {
        match driver.poll_event().await.expect("poll_event") {
            Some(AppEvent::LinkNormal) => return,
            Some(AppEvent::LinkDead(reason)) => panic!("link died before reaching Normal: {reason}"),
            _ => {}
        }
    }
}

#[tokio::test]
async fn handshake_negotiates_and_external_accessory_stream_round_trips() {
    let (transport_a, transport_b) = MemoryTransport::pair(16 * 1024);
    let config = LinkConfig::default();

    let mut driver_a = AccessoryDriver::new(transport_a, SystemEnvironment, DemoCoprocessor, config.clone());
    let mut driver_b = AccessoryDriver::new(transport_b, SystemEnvironment, DemoCoprocessor, config);

    let ea_a = driver_a.open_external_accessory_stream(EA_STREAM_ID);
    let ea_b = driver_b.open_external_accessory_stream(EA_STREAM_ID);

    let (normal_tx, mut normal_rx) = mpsc::channel::<()>(2);

    let tx_a = normal_tx.clone();
    let pump_a = tokio::spawn(async move {
        pump_until_normal(&mut driver_a).await;
        let _ = tx_a.send(()).await;
        loop {
            let _ = driver_a.poll_event().await.expect("poll_event");
        }
    });

    let tx_b = normal_tx.clone();
    let pump_b = tokio::spawn(async move {
        pump_until_normal(&mut driver_b).await;
        let _ = tx_b.send(()).await;
        loop {
            let _ = driver_b.poll_event().await.expect("poll_event");
        }
    });
    drop(normal_tx);

    normal_rx.recv().await.expect("side a reached Normal");
    normal_rx.recv().await.expect("side b reached Normal");

    ea_a.write(b"telemetry").await.expect("write");

    let received = tokio::time::timeout(Duration::from_secs(5), ea_b.read_exactly(b"telemetry".len()))
        .await
        .expect("ea stream read timed out")
        .expect("ea stream read succeeded");
    assert_eq!(received.as_ref(), b"telemetry");

    pump_a.abort();
    pump_b.abort();
}
