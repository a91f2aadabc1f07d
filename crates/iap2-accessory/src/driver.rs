//! Accessory-side [`iap2_app::Driver`] implementation.
//!
//! [`AccessoryDriver`] owns the framed transport, the link engine, the
//! control and external-accessory session streams, and the authentication
//! coprocessor. It executes the pure engine's [`LinkAction`]s and turns
//! link-level transitions into [`AppEvent`]s for `iap2_app::Runtime` to
//! drive the handshake state machine with.

use std::{collections::HashMap, future::Future, pin::Pin, time::Duration};

use bytes::{Bytes, BytesMut};
use iap2_app::AppEvent;
use iap2_core::{Environment, LinkAction, LinkConfig, LinkEngine, LinkState, SessionStream, TimerKind};
use iap2_messages::{Message, catalogue::vehicle_status::VehicleStatusUpdate};
use iap2_proto::LinkHeader;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    coprocessor::ChallengeCoprocessor,
    error::AccessoryError,
    io::{FrameIo, Input},
    transport::ByteTransport,
};

type TimerSlot = Option<Pin<Box<dyn Future<Output = ()> + Send>>>;

#[derive(Default)]
struct Timers {
    detect: TimerSlot,
    negotiate: TimerSlot,
    send_ack: TimerSlot,
    recv_ack: TimerSlot,
}

impl Timers {
    fn slot(&mut self, timer: TimerKind) -> &mut TimerSlot {
        match timer {
            TimerKind::Detect => &mut self.detect,
            TimerKind::Negotiate => &mut self.negotiate,
            TimerKind::SendAck => &mut self.send_ack,
            TimerKind::RecvAck => &mut self.recv_ack,
        }
    }
}

/// Awaits `slot` if armed, otherwise never resolves — letting `select!`
/// treat a disarmed timer as simply absent from the race.
async fn wait_timer(slot: &mut TimerSlot) {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending::<()>().await,
    }
}

/// Drives an `iap2_app::App` over a real (or in-memory) byte transport.
pub struct AccessoryDriver<T, E, C>
where
    T: ByteTransport,
    E: Environment,
    C: ChallengeCoprocessor,
{
    reader: FrameIo<T>,
    engine: LinkEngine<E::Instant>,
    env: E,
    control: SessionStream,
    ea_streams: HashMap<u16, SessionStream>,
    max_len: usize,
    timers: Timers,
    coprocessor: C,
    message_rx: mpsc::Receiver<Message>,
    message_reader: JoinHandle<()>,
    started: bool,
    done: bool,
}

impl<T, E, C> AccessoryDriver<T, E, C>
where
    T: ByteTransport,
    E: Environment,
    E::Instant: std::ops::Add<Duration, Output = E::Instant>,
    C: ChallengeCoprocessor,
{
    /// Builds a new driver around `transport`, proposing `config` during
    /// link negotiation.
    #[must_use]
    pub fn new(transport: T, env: E, coprocessor: C, config: LinkConfig) -> Self {
        let max_len = usize::from(config.max_len);
        let control = SessionStream::control(max_len);
        let (message_reader, message_rx) = spawn_message_reader(control.clone());
        Self {
            reader: FrameIo::new(transport),
            engine: LinkEngine::new(config),
            env,
            control,
            ea_streams: HashMap::new(),
            max_len,
            timers: Timers::default(),
            coprocessor,
            message_rx,
            message_reader,
            started: false,
            done: false,
        }
    }

    /// Registers a new external-accessory stream multiplexed under
    /// `stream_id`, returning a handle the caller can read and write
    /// through directly.
    pub fn open_external_accessory_stream(&mut self, stream_id: u16) -> SessionStream {
        let stream = SessionStream::external_accessory(stream_id, self.max_len);
        self.ea_streams.insert(stream_id, stream.clone());
        stream
    }

    /// Drains any buffered writes on the control and external-accessory
    /// streams and hands them to the link engine. Called once per `step`
    /// iteration so a write queued by a caller holding a stream handle
    /// eventually reaches the wire without that caller needing to poll
    /// the engine itself.
    async fn flush_streams(&mut self) -> Result<(), AccessoryError<T::Error>> {
        let now = self.env.now();
        let Self { reader, engine, timers, env, control, ea_streams, .. } = self;

        control.signal_write_allowed();
        if let Some(data) = control.drain().await {
            let actions = engine.send_packet(LinkHeader::CONTROL_SESSION_ID, data, now);
            apply_actions(actions, reader, timers, env, control, ea_streams).await?;
        }

        let streams: Vec<SessionStream> = ea_streams.values().cloned().collect();
        for stream in streams {
            stream.signal_write_allowed();
            if let Some(data) = stream.drain().await {
                let actions = engine.send_packet(LinkHeader::EA_SESSION_ID, data, now);
                apply_actions(actions, reader, timers, env, control, ea_streams).await?;
            }
        }
        Ok(())
    }

    /// Runs one iteration of the link engine's event loop, returning the
    /// `AppEvent` it produced, if any.
    async fn step(&mut self) -> Result<Option<AppEvent>, AccessoryError<T::Error>> {
        let prior_state = self.engine.state();
        let Self { reader, engine, timers, env, control, ea_streams, message_rx, .. } = self;

        tokio::select! {
            biased;

            () = wait_timer(&mut timers.detect) => {
                timers.detect = None;
                let actions = engine.on_detect_timer();
                apply_actions(actions, reader, timers, env, control, ea_streams).await?;
            }
            () = wait_timer(&mut timers.negotiate) => {
                timers.negotiate = None;
                let actions = engine.on_negotiate_timer();
                apply_actions(actions, reader, timers, env, control, ea_streams).await?;
            }
            () = wait_timer(&mut timers.send_ack) => {
                timers.send_ack = None;
                let actions = engine.on_send_ack_timer();
                apply_actions(actions, reader, timers, env, control, ea_streams).await?;
            }
            () = wait_timer(&mut timers.recv_ack) => {
                timers.recv_ack = None;
                let now = env.now();
                let actions = engine.on_recv_ack_timer(now);
                apply_actions(actions, reader, timers, env, control, ea_streams).await?;
            }
            input = reader.read_next(engine.state()) => {
                match input? {
                    Input::DetectMarker(bytes) => {
                        let actions = engine.handle_detect_bytes(&bytes);
                        apply_actions(actions, reader, timers, env, control, ea_streams).await?;
                    }
                    Input::Frame(frame) => {
                        let now = env.now();
                        let actions = engine.handle_frame(frame, now);
                        apply_actions(actions, reader, timers, env, control, ea_streams).await?;
                    }
                }
            }
            message = message_rx.recv() => {
                if let Some(message) = message {
                    return Ok(Some(AppEvent::MessageReceived(message)));
                }
            }
        }

        self.flush_streams().await?;

        let new_state = self.engine.state();
        if prior_state != LinkState::Normal && new_state == LinkState::Normal {
            return Ok(Some(AppEvent::LinkNormal));
        }
        if new_state == LinkState::Dead {
            let reason =
                self.engine.dead_reason().map_or_else(|| "link closed".to_string(), std::string::ToString::to_string);
            self.done = true;
            return Ok(Some(AppEvent::LinkDead(reason)));
        }
        Ok(None)
    }
}

impl<T, E, C> iap2_app::Driver for AccessoryDriver<T, E, C>
where
    T: ByteTransport,
    E: Environment,
    E::Instant: std::ops::Add<Duration, Output = E::Instant>,
    C: ChallengeCoprocessor,
{
    type Error = AccessoryError<T::Error>;
    type Instant = E::Instant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        if self.done {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            let Self { reader, engine, timers, env, control, ea_streams, .. } = self;
            let actions = engine.start();
            apply_actions(actions, reader, timers, env, control, ea_streams).await?;
        }
        loop {
            if let Some(event) = self.step().await? {
                return Ok(Some(event));
            }
        }
    }

    async fn send_message(&mut self, message: Message) -> Result<(), Self::Error> {
        let bytes = message.encode();
        let now = self.env.now();
        let Self { reader, engine, timers, env, control, ea_streams, .. } = self;
        let actions = engine.send_packet(LinkHeader::CONTROL_SESSION_ID, bytes, now);
        apply_actions(actions, reader, timers, env, control, ea_streams).await
    }

    async fn challenge_response(&mut self, challenge: Bytes) -> Result<Bytes, Self::Error> {
        self.coprocessor.respond(challenge).await.map_err(|err| AccessoryError::Coprocessor(err.to_string()))
    }

    fn report_vehicle_status(&mut self, update: VehicleStatusUpdate) {
        tracing::info!(?update, "vehicle status update received");
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn stop(&mut self) {
        self.done = true;
        self.message_reader.abort();
    }
}

#[allow(clippy::too_many_arguments)]
async fn apply_actions<T, E>(
    actions: Vec<LinkAction>,
    reader: &mut FrameIo<T>,
    timers: &mut Timers,
    env: &E,
    control: &SessionStream,
    ea_streams: &mut HashMap<u16, SessionStream>,
) -> Result<(), AccessoryError<T::Error>>
where
    T: ByteTransport,
    E: Environment,
{
    for action in actions {
        match action {
            LinkAction::SendRaw(bytes) => reader.write_raw(&bytes).await?,
            LinkAction::SendFrame(frame) => reader.write_frame(&frame).await?,
            LinkAction::DeliverData { session_id, stream_id, data } => {
                if session_id == LinkHeader::CONTROL_SESSION_ID {
                    control.push_inbound(&data).await;
                } else if let Some(id) = stream_id {
                    if let Some(stream) = ea_streams.get(&id) {
                        stream.push_inbound(&data).await;
                    } else {
                        tracing::debug!(stream_id = id, "dropping data for unregistered external-accessory stream");
                    }
                }
            }
            LinkAction::SignalEof => {
                control.feed_eof();
                for stream in ea_streams.values() {
                    stream.feed_eof();
                }
            }
            LinkAction::ArmTimer { timer, after } => {
                let env = env.clone();
                *timers.slot(timer) = Some(Box::pin(async move { env.sleep(after).await }));
            }
            LinkAction::DisarmTimer(timer) => *timers.slot(timer) = None,
            LinkAction::Bailout(_) => {
                // The dead reason is read back off the engine directly once
                // its state transitions to `Dead`; nothing to do here.
            }
            LinkAction::Log(level, message) => log_engine_action(level, &message),
        }
    }
    Ok(())
}

fn log_engine_action(level: tracing::Level, message: &str) {
    match level {
        tracing::Level::TRACE => tracing::trace!(target: "iap2_core", "{message}"),
        tracing::Level::DEBUG => tracing::debug!(target: "iap2_core", "{message}"),
        tracing::Level::INFO => tracing::info!(target: "iap2_core", "{message}"),
        tracing::Level::WARN => tracing::warn!(target: "iap2_core", "{message}"),
        tracing::Level::ERROR => tracing::error!(target: "iap2_core", "{message}"),
    }
}

/// Spawns the task that reassembles CSM messages off the control stream:
/// read the 4-byte prefix to learn the total length, read the rest, then
/// decode. Runs independently of the link-engine loop in [`AccessoryDriver::step`]
/// so a control message in flight never blocks timer or frame processing.
fn spawn_message_reader(control: SessionStream) -> (JoinHandle<()>, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(async move {
        loop {
            let header = match control.read_exactly(4).await {
                Ok(bytes) => bytes,
                Err(_) => return,
            };
            let length = usize::from(u16::from_be_bytes([header[2], header[3]]));
            if length < 4 {
                tracing::warn!(length, "control message header claims impossible length");
                continue;
            }
            let rest = match control.read_exactly(length - 4).await {
                Ok(bytes) => bytes,
                Err(_) => return,
            };
            let mut full = BytesMut::with_capacity(length);
            full.extend_from_slice(&header);
            full.extend_from_slice(&rest);
            match Message::decode(&full) {
                Ok(message) => {
                    if tx.send(message).await.is_err() {
                        return;
                    }
                }
                Err(err) => tracing::warn!(%err, "dropping undecodable control message"),
            }
        }
    });
    (handle, rx)
}
