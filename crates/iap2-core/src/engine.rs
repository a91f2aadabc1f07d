//! The link engine: the pure state machine at the heart of the link layer.
//!
//! [`LinkEngine`] never touches a transport, a clock, or a logger directly.
//! Every method takes whatever external input it needs (bytes, a decoded
//! frame, the current instant) and returns a `Vec<LinkAction>` describing
//! what the outside world should do next. An async driver (see
//! `iap2-accessory`) owns the transport and timers, executes the actions,
//! and feeds results back in. This keeps the protocol logic trivially
//! unit-testable without a runtime.

use std::{collections::VecDeque, time::Duration};

use bytes::Bytes;
use iap2_proto::{ControlFlags, LinkFrame, LinkHeader, SessionDescriptor, SyncPayload};
use tracing::Level;

use crate::error::LinkError;

/// The iAP2 detection marker exchanged by both sides before negotiation.
pub const DETECT_MARKER: [u8; 6] = [0xFF, 0x55, 0x02, 0x00, 0xEE, 0x10];

/// How often the `DETECT` state re-sends the detection marker.
pub const DETECT_INTERVAL: Duration = Duration::from_secs(1);

/// How often the `NEGOTIATE` state re-sends its `SYN`.
pub const NEGOTIATE_INTERVAL: Duration = Duration::from_millis(500);

/// Tolerance added to window checks to forgive late or duplicate ACKs. Not
/// derived from the published protocol; a conservative slack carried over
/// from the reference implementation.
pub const ACK_WINDOW_SLACK: u8 = 10;

const INITIAL_SENT_PSN: u8 = 50;

/// Link engine state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Waiting for the peer to present the detection marker.
    Detect,
    /// Exchanging `SYN`s to agree on synchronisation parameters.
    Negotiate,
    /// Steady-state packet exchange.
    Normal,
    /// Terminal: the link is torn down.
    Dead,
}

/// Accessory-proposed synchronisation parameters and local tuning knobs.
///
/// The peer's own `SYN` proposal wins during negotiation and replaces these
/// as the effective parameters for the rest of the connection; `self.config`
/// only matters before negotiation completes and for `max_outgoing_delta`,
/// which is a local knob with no wire representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Sliding-window size, in packets, this accessory proposes.
    pub max_outgoing: u8,
    /// Maximum frame length this accessory accepts.
    pub max_len: u16,
    /// Retransmission timeout, in milliseconds.
    pub retransmission_timeout_ms: u16,
    /// Delayed-ACK timeout, in milliseconds.
    pub ack_timeout_ms: u16,
    /// Maximum retransmissions before the link is considered dead.
    pub max_retransmissions: u8,
    /// Cumulative-ACK threshold.
    pub max_ack: u8,
    /// Shortens the immediate-ACK threshold on the receive path; useful when
    /// the peer is slow to read. Not part of the wire sync payload.
    pub max_outgoing_delta: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_outgoing: 4,
            max_len: 4096,
            retransmission_timeout_ms: 1035,
            ack_timeout_ms: 23,
            max_retransmissions: 3,
            max_ack: 3,
            max_outgoing_delta: 0,
        }
    }
}

impl LinkConfig {
    /// Builds the `SYN` payload this accessory proposes, advertising the
    /// fixed control and external-accessory sessions.
    #[must_use]
    pub fn to_sync_payload(&self) -> SyncPayload {
        SyncPayload {
            max_outgoing: self.max_outgoing,
            max_len: self.max_len,
            retransmission_timeout_ms: self.retransmission_timeout_ms,
            ack_timeout_ms: self.ack_timeout_ms,
            max_retransmissions: self.max_retransmissions,
            max_ack: self.max_ack,
            sessions: vec![
                SessionDescriptor {
                    id: LinkHeader::CONTROL_SESSION_ID,
                    session_type: SyncPayload::SESSION_TYPE_CONTROL,
                    version: 1,
                },
                SessionDescriptor {
                    id: LinkHeader::EA_SESSION_ID,
                    session_type: SyncPayload::SESSION_TYPE_EA,
                    version: 1,
                },
            ],
        }
    }
}

/// A timer the driver schedules on the engine's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Re-sends the detection marker.
    Detect,
    /// Re-sends the negotiation `SYN`.
    Negotiate,
    /// Fires a delayed bare ACK.
    SendAck,
    /// Fires a retransmission of the oldest unacknowledged packet.
    RecvAck,
}

/// A side effect the engine core wants the driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Write raw bytes to the transport (used only for the detection
    /// marker, which predates framing).
    SendRaw(Bytes),
    /// Write an encoded frame to the transport.
    SendFrame(LinkFrame),
    /// Deliver payload bytes to a session stream. `stream_id` is `Some` for
    /// the external-accessory session (after stripping its 2-byte prefix),
    /// `None` for the control session.
    DeliverData {
        /// Session the data was received on.
        session_id: u8,
        /// External-accessory stream id, if `session_id` is the EA session.
        stream_id: Option<u16>,
        /// Delivered payload bytes.
        data: Bytes,
    },
    /// Signal EOF to every session stream; the link is dead.
    SignalEof,
    /// (Re)arm a timer to fire after the given duration.
    ArmTimer {
        /// Which timer.
        timer: TimerKind,
        /// Delay before it fires.
        after: Duration,
    },
    /// Cancel a timer if armed.
    DisarmTimer(TimerKind),
    /// The link died for a reported reason; the driver should log/propagate
    /// it. Absent when the link was closed locally without error.
    Bailout(LinkError),
    /// A message for the driver to log at the given level.
    Log(Level, String),
}

#[derive(Debug, Clone)]
struct InFlightPacket<I> {
    psn: u8,
    session_id: u8,
    data: Bytes,
    retry_counter: u8,
    timeout: I,
}

#[derive(Debug, Clone)]
struct QueuedPacket {
    session_id: u8,
    data: Bytes,
}

#[derive(Debug, Clone)]
struct InboundPacket {
    psn: u8,
    session_id: u8,
    data: Bytes,
}

/// Circular 8-bit sequence distance. `distance(a, None) == 0`; otherwise the
/// number of steps to get from `b` to `a` going forward, wrapping at 256.
#[must_use]
pub fn distance(a: u8, b: Option<u8>) -> u8 {
    match b {
        None => 0,
        Some(b) if a >= b => a - b,
        Some(b) => (256 + u16::from(a) - u16::from(b)) as u8,
    }
}

/// The link engine state machine: detect, negotiate, normal exchange, dead.
///
/// Generic over the instant type `I` so tests can drive it with arbitrary
/// reproducible values instead of `std::time::Instant`.
pub struct LinkEngine<I> {
    config: LinkConfig,
    lsp: SyncPayload,
    state: LinkState,
    dead_reason: Option<LinkError>,

    sent_psn: u8,
    last_sent_acknowledged_psn: Option<u8>,
    unack_packets: VecDeque<InFlightPacket<I>>,
    queued_packets: VecDeque<QueuedPacket>,

    last_received_in_sequence_psn: u8,
    last_acked_psn: Option<u8>,
    received_out_of_sequence: Vec<InboundPacket>,
    cumulative_received: u32,
}

impl<I> LinkEngine<I>
where
    I: Copy + Ord + std::ops::Add<Duration, Output = I> + std::ops::Sub<I, Output = Duration>,
{
    /// Builds a new engine in the `Detect` state, proposing `config`.
    #[must_use]
    pub fn new(config: LinkConfig) -> Self {
        let lsp = config.to_sync_payload();
        Self {
            config,
            lsp,
            state: LinkState::Detect,
            dead_reason: None,
            sent_psn: INITIAL_SENT_PSN,
            last_sent_acknowledged_psn: None,
            unack_packets: VecDeque::new(),
            queued_packets: VecDeque::new(),
            last_received_in_sequence_psn: 0,
            last_acked_psn: None,
            received_out_of_sequence: Vec::new(),
            cumulative_received: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The reason the engine died, if it has.
    #[must_use]
    pub fn dead_reason(&self) -> Option<&LinkError> {
        self.dead_reason.as_ref()
    }

    /// The effective, negotiated synchronisation parameters (the accessory's
    /// own proposal until a peer `SYN` is accepted).
    #[must_use]
    pub fn sync_params(&self) -> &SyncPayload {
        &self.lsp
    }

    /// Begins the detect phase.
    pub fn start(&mut self) -> Vec<LinkAction> {
        vec![
            LinkAction::SendRaw(Bytes::from_static(&DETECT_MARKER)),
            LinkAction::ArmTimer { timer: TimerKind::Detect, after: DETECT_INTERVAL },
        ]
    }

    /// Handles the detect timer firing: re-sends the marker.
    pub fn on_detect_timer(&mut self) -> Vec<LinkAction> {
        if self.state != LinkState::Detect {
            return Vec::new();
        }
        vec![
            LinkAction::SendRaw(Bytes::from_static(&DETECT_MARKER)),
            LinkAction::ArmTimer { timer: TimerKind::Detect, after: DETECT_INTERVAL },
        ]
    }

    /// Handles receipt of the first 6 bytes read from the transport while
    /// detecting. Advances to `Negotiate` on a match, or dies otherwise.
    pub fn handle_detect_bytes(&mut self, bytes: &[u8]) -> Vec<LinkAction> {
        if self.state != LinkState::Detect {
            return Vec::new();
        }
        if bytes != DETECT_MARKER {
            return self.teardown(Some(LinkError::NotSupported));
        }
        self.state = LinkState::Negotiate;
        let mut actions = vec![LinkAction::DisarmTimer(TimerKind::Detect)];
        let frame = self.build_syn_frame();
        actions.push(self.frame_action(frame));
        actions.push(LinkAction::ArmTimer { timer: TimerKind::Negotiate, after: NEGOTIATE_INTERVAL });
        actions
    }

    /// Handles the negotiate timer firing: re-sends our `SYN` proposal.
    pub fn on_negotiate_timer(&mut self) -> Vec<LinkAction> {
        if self.state != LinkState::Negotiate {
            return Vec::new();
        }
        let frame = self.build_syn_frame();
        vec![self.frame_action(frame), LinkAction::ArmTimer { timer: TimerKind::Negotiate, after: NEGOTIATE_INTERVAL }]
    }

    /// Queues (or immediately sends) `data` on `session_id`.
    pub fn send_packet(&mut self, session_id: u8, data: Bytes, now: I) -> Vec<LinkAction> {
        let window_open = self.state == LinkState::Normal
            && u16::from(distance(self.sent_psn, self.last_sent_acknowledged_psn)) <= u16::from(self.lsp.max_outgoing);
        if !window_open {
            self.queued_packets.push_back(QueuedPacket { session_id, data });
            return Vec::new();
        }
        self.transmit(session_id, data, now)
    }

    /// Dispatches a validly-decoded incoming frame.
    pub fn handle_frame(&mut self, frame: LinkFrame, now: I) -> Vec<LinkAction> {
        let control = frame.header.control();
        if control.is_rst() {
            return self.teardown(Some(LinkError::PeerReset));
        }

        let mut actions = Vec::new();

        if control.is_syn() {
            match SyncPayload::decode(&frame.payload) {
                Ok(peer_lsp) => actions.extend(self.handle_syn(peer_lsp, frame.header.seq())),
                Err(err) => {
                    actions.push(LinkAction::Log(Level::WARN, format!("dropping invalid SYN: {err}")));
                },
            }
        }

        if control.is_ack() {
            self.cumulative_received += 1;
            actions.extend(self.handle_ack(frame.header.ack(), now));
        }

        if control.is_eak() && !frame.payload.is_empty() {
            actions.extend(self.handle_eak(&frame.payload, now));
        }

        if control.is_data_eligible() && !frame.payload.is_empty() {
            let packet = InboundPacket {
                psn: frame.header.seq(),
                session_id: frame.header.session_id(),
                data: frame.payload.clone(),
            };
            actions.extend(self.handle_data(packet, now));
        }

        if self.cumulative_received >= u32::from(self.lsp.max_ack) {
            self.cumulative_received = 0;
            self.last_acked_psn = Some(self.last_received_in_sequence_psn);
            let frame = self.build_bare_ack();
            actions.push(self.frame_action(frame));
        }

        actions
    }

    /// Fires when the delayed-ACK timer expires: emits a bare ACK.
    pub fn on_send_ack_timer(&mut self) -> Vec<LinkAction> {
        self.last_acked_psn = Some(self.last_received_in_sequence_psn);
        let frame = self.build_bare_ack();
        vec![self.frame_action(frame)]
    }

    /// Fires when the retransmission timer expires: retransmits the oldest
    /// unacknowledged packet, or tears down if it has exhausted its
    /// retransmission budget.
    pub fn on_recv_ack_timer(&mut self, now: I) -> Vec<LinkAction> {
        let mut actions = Vec::new();
        if self.unack_packets.is_empty() || self.state != LinkState::Normal {
            return actions;
        }

        let mut order: Vec<usize> = (0..self.unack_packets.len()).collect();
        order.sort_by_key(|&i| self.unack_packets[i].timeout);
        let idx = order[0];
        let second_timeout = order.get(1).map(|&i| self.unack_packets[i].timeout);

        let retransmission_timeout = Duration::from_millis(u64::from(self.lsp.retransmission_timeout_ms));
        let last_received = self.last_received_in_sequence_psn;
        let max_retransmissions = self.lsp.max_retransmissions;

        let packet = &mut self.unack_packets[idx];
        actions.push(LinkAction::DisarmTimer(TimerKind::SendAck));
        let frame = LinkFrame::new(
            ControlFlags::new(ControlFlags::ACK),
            packet.psn,
            last_received,
            packet.session_id,
            packet.data.clone(),
        );
        packet.timeout = now + retransmission_timeout;
        packet.retry_counter += 1;
        let exceeded = packet.retry_counter >= max_retransmissions;
        let psn = packet.psn;

        actions.push(self.frame_action(frame));

        if exceeded {
            actions.extend(self.teardown(Some(LinkError::MaxRetransmissionsExceeded { psn })));
            return actions;
        }

        if let Some(second) = second_timeout {
            actions.push(LinkAction::ArmTimer { timer: TimerKind::RecvAck, after: duration_until(now, second) });
        }
        actions
    }

    /// Closes the link locally (no reported error, no `Bailout` action).
    pub fn close(&mut self) -> Vec<LinkAction> {
        self.teardown(None)
    }

    fn handle_syn(&mut self, peer_lsp: SyncPayload, psn: u8) -> Vec<LinkAction> {
        if self.state != LinkState::Negotiate {
            return Vec::new();
        }
        self.lsp = peer_lsp;
        self.last_received_in_sequence_psn = psn;
        self.last_acked_psn = Some(psn);
        let frame = self.build_bare_ack();
        vec![self.frame_action(frame)]
    }

    fn handle_ack(&mut self, n: u8, now: I) -> Vec<LinkAction> {
        let mut actions = Vec::new();
        if self.state == LinkState::Negotiate {
            self.state = LinkState::Normal;
            actions.push(LinkAction::DisarmTimer(TimerKind::Negotiate));
            actions.push(LinkAction::Log(Level::INFO, "link negotiated, entering NORMAL".to_string()));
        }
        self.last_sent_acknowledged_psn = Some(n);

        let threshold = u16::from(self.lsp.max_ack) + u16::from(ACK_WINDOW_SLACK);
        let kept: VecDeque<_> = self
            .unack_packets
            .drain(..)
            .filter(|p| {
                let d = u16::from(distance(p.psn, Some(n)));
                d > 0 && d <= threshold
            })
            .collect();
        self.unack_packets = kept;

        if let Some(head) = self.unack_packets.front() {
            actions.push(LinkAction::ArmTimer { timer: TimerKind::RecvAck, after: duration_until(now, head.timeout) });
        } else {
            actions.push(LinkAction::DisarmTimer(TimerKind::RecvAck));
        }

        actions.extend(self.flush_queue(now));
        actions
    }

    fn handle_eak(&mut self, payload: &[u8], now: I) -> Vec<LinkAction> {
        let mut actions = Vec::new();
        if self.state != LinkState::Normal {
            return actions;
        }
        let max_retransmissions = self.lsp.max_retransmissions;
        let retransmission_timeout = Duration::from_millis(u64::from(self.lsp.retransmission_timeout_ms));
        let last_received = self.last_received_in_sequence_psn;

        let mut exceeded_psn = None;
        let mut sent_frames = Vec::new();
        for packet in &mut self.unack_packets {
            if !payload.contains(&packet.psn) {
                continue;
            }
            packet.retry_counter += 1;
            if packet.retry_counter >= max_retransmissions {
                if exceeded_psn.is_none() {
                    exceeded_psn = Some(packet.psn);
                }
                continue;
            }
            sent_frames.push(LinkFrame::new(
                ControlFlags::new(ControlFlags::ACK),
                packet.psn,
                last_received,
                packet.session_id,
                packet.data.clone(),
            ));
            packet.timeout = now + retransmission_timeout;
        }

        for frame in sent_frames {
            actions.push(LinkAction::DisarmTimer(TimerKind::SendAck));
            actions.push(self.frame_action(frame));
            actions.push(LinkAction::ArmTimer { timer: TimerKind::RecvAck, after: retransmission_timeout });
        }

        if let Some(psn) = exceeded_psn {
            actions.extend(self.teardown(Some(LinkError::MaxRetransmissionsExceeded { psn })));
        }
        actions
    }

    fn handle_data(&mut self, p: InboundPacket, _now: I) -> Vec<LinkAction> {
        let mut actions = Vec::new();
        let max_outgoing = self.lsp.max_outgoing;
        let d = distance(p.psn, Some(self.last_received_in_sequence_psn));

        if u16::from(d) > u16::from(max_outgoing) + u16::from(ACK_WINDOW_SLACK) || d == 0 {
            let frame = self.build_bare_ack();
            actions.push(self.frame_action(frame));
            return actions;
        }

        if d > 1 {
            self.received_out_of_sequence.push(p.clone());
            if u16::from(d) >= u16::from(max_outgoing) {
                let mut missing = Vec::new();
                let mut x = self.last_received_in_sequence_psn;
                while distance(p.psn, Some(x)) > 1 {
                    x = x.wrapping_add(1);
                    missing.push(x);
                }
                actions.push(LinkAction::DisarmTimer(TimerKind::SendAck));
                let frame = self.build_eak_frame(&missing);
                actions.push(self.frame_action(frame));
            }
            return actions;
        }

        self.received_out_of_sequence.push(p);
        loop {
            let mut best: Option<(usize, u8)> = None;
            for (i, pp) in self.received_out_of_sequence.iter().enumerate() {
                let dist = distance(pp.psn, Some(self.last_received_in_sequence_psn));
                if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                    best = Some((i, dist));
                }
            }
            let Some((idx, dist)) = best else { break };
            if dist > 1 {
                break;
            }
            let delivered = self.received_out_of_sequence.remove(idx);
            self.last_received_in_sequence_psn = delivered.psn;
            actions.extend(deliver(&delivered));
        }

        let gap = u16::from(distance(self.last_received_in_sequence_psn, self.last_acked_psn));
        let threshold = u16::from(max_outgoing.saturating_sub(self.config.max_outgoing_delta));
        if gap >= threshold {
            actions.push(LinkAction::DisarmTimer(TimerKind::SendAck));
            self.last_acked_psn = Some(self.last_received_in_sequence_psn);
            let frame = self.build_bare_ack();
            actions.push(self.frame_action(frame));
        } else {
            actions.push(LinkAction::ArmTimer {
                timer: TimerKind::SendAck,
                after: Duration::from_millis(u64::from(self.lsp.ack_timeout_ms)),
            });
        }

        actions
    }

    fn flush_queue(&mut self, now: I) -> Vec<LinkAction> {
        let mut actions = Vec::new();
        while self.state == LinkState::Normal
            && u16::from(distance(self.sent_psn, self.last_sent_acknowledged_psn)) < u16::from(self.lsp.max_outgoing)
        {
            let Some(qp) = self.queued_packets.pop_front() else { break };
            actions.extend(self.transmit(qp.session_id, qp.data, now));
        }
        actions
    }

    fn transmit(&mut self, session_id: u8, data: Bytes, now: I) -> Vec<LinkAction> {
        let mut actions = Vec::new();
        self.sent_psn = self.sent_psn.wrapping_add(1);
        let rto = Duration::from_millis(u64::from(self.lsp.retransmission_timeout_ms));
        let timeout = now + rto;

        actions.push(LinkAction::DisarmTimer(TimerKind::SendAck));
        let frame = LinkFrame::new(
            ControlFlags::new(ControlFlags::ACK),
            self.sent_psn,
            self.last_received_in_sequence_psn,
            session_id,
            data.clone(),
        );
        actions.push(self.frame_action(frame));
        self.last_acked_psn = Some(self.last_received_in_sequence_psn);
        actions.push(LinkAction::ArmTimer { timer: TimerKind::RecvAck, after: rto });
        self.unack_packets.push_back(InFlightPacket { psn: self.sent_psn, session_id, data, retry_counter: 0, timeout });
        actions
    }

    fn teardown(&mut self, reason: Option<LinkError>) -> Vec<LinkAction> {
        if self.state == LinkState::Dead {
            return Vec::new();
        }
        self.state = LinkState::Dead;
        self.dead_reason = reason.clone();
        let mut actions = vec![
            LinkAction::DisarmTimer(TimerKind::Detect),
            LinkAction::DisarmTimer(TimerKind::Negotiate),
            LinkAction::DisarmTimer(TimerKind::SendAck),
            LinkAction::DisarmTimer(TimerKind::RecvAck),
            LinkAction::SignalEof,
        ];
        if let Some(reason) = reason {
            actions.push(LinkAction::Bailout(reason));
        }
        actions
    }

    fn build_syn_frame(&self) -> LinkFrame {
        LinkFrame::new(
            ControlFlags::new(ControlFlags::SYN),
            self.sent_psn,
            self.last_received_in_sequence_psn,
            0,
            self.lsp.encode(),
        )
    }

    fn build_bare_ack(&self) -> LinkFrame {
        LinkFrame::new(
            ControlFlags::new(ControlFlags::ACK),
            self.sent_psn,
            self.last_received_in_sequence_psn,
            0,
            Bytes::new(),
        )
    }

    fn build_eak_frame(&self, missing: &[u8]) -> LinkFrame {
        LinkFrame::new(
            ControlFlags::new(ControlFlags::EAK),
            self.sent_psn,
            self.last_received_in_sequence_psn,
            0,
            Bytes::copy_from_slice(missing),
        )
    }

    /// Wraps a frame as a `SendFrame` action, resetting `cumulative_received`
    /// the same way every outgoing frame does on the source this is adapted
    /// from (any frame we send means the peer doesn't need our ACK anymore).
    fn frame_action(&mut self, frame: LinkFrame) -> LinkAction {
        self.cumulative_received = 0;
        LinkAction::SendFrame(frame)
    }
}

fn deliver(p: &InboundPacket) -> Vec<LinkAction> {
    if p.session_id == LinkHeader::CONTROL_SESSION_ID {
        return vec![LinkAction::DeliverData { session_id: p.session_id, stream_id: None, data: p.data.clone() }];
    }
    if p.session_id == LinkHeader::EA_SESSION_ID {
        if p.data.len() < 2 {
            return Vec::new();
        }
        let stream_id = u16::from_be_bytes([p.data[0], p.data[1]]);
        return vec![LinkAction::DeliverData {
            session_id: p.session_id,
            stream_id: Some(stream_id),
            data: p.data.slice(2..),
        }];
    }
    Vec::new()
}

fn duration_until<I>(now: I, deadline: I) -> Duration
where
    I: Ord + std::ops::Sub<I, Output = Duration>,
{
    if deadline > now { deadline - now } else { Duration::ZERO }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use iap2_proto::LinkHeader;

    use super::*;

    type TestEngine = LinkEngine<Instant>;

    fn engine_in_normal(max_outgoing: u8, sent_psn: u8, last_sent_acknowledged_psn: Option<u8>) -> TestEngine {
        let mut config = LinkConfig::default();
        config.max_outgoing = max_outgoing;
        let mut engine = LinkEngine::new(config);
        engine.state = LinkState::Normal;
        engine.sent_psn = sent_psn;
        engine.last_sent_acknowledged_psn = last_sent_acknowledged_psn;
        engine.last_received_in_sequence_psn = 99;
        engine.last_acked_psn = Some(99);
        engine
    }

    fn data_frame(seq: u8, ack: u8, session_id: u8, payload: &[u8]) -> LinkFrame {
        LinkFrame::new(ControlFlags::new(ControlFlags::ACK), seq, ack, session_id, payload.to_vec())
    }

    fn sent_frame(actions: &[LinkAction]) -> Option<&LinkFrame> {
        actions.iter().find_map(|a| match a {
            LinkAction::SendFrame(f) => Some(f),
            _ => None,
        })
    }

    #[test]
    fn distance_is_zero_for_equal_values() {
        for a in 0u8..=255 {
            assert_eq!(distance(a, Some(a)), 0);
        }
    }

    #[test]
    fn distance_unset_base_is_zero() {
        assert_eq!(distance(200, None), 0);
    }

    #[test]
    fn distance_wraps() {
        for a in 0u8..=255 {
            for k in 0u16..=255 {
                let b = a.wrapping_add(k as u8);
                assert_eq!(distance(b, Some(a)), k as u8);
            }
        }
    }

    #[test]
    fn scenario_1_in_order_receive() {
        let mut engine = engine_in_normal(3, 199, Some(199));
        let frame = data_frame(100, 0, LinkHeader::CONTROL_SESSION_ID, b"hello world!");
        let actions = engine.handle_frame(frame, Instant::now());
        assert_eq!(engine.last_received_in_sequence_psn, 100);
        assert!(actions.iter().any(|a| matches!(
            a,
            LinkAction::DeliverData { session_id, data, .. }
                if *session_id == LinkHeader::CONTROL_SESSION_ID && data.as_ref() == b"hello world!"
        )));
        assert!(actions.iter().any(|a| matches!(
            a,
            LinkAction::ArmTimer { timer: TimerKind::SendAck, .. }
        )));
    }

    #[test]
    fn scenario_2_interleaved_send() {
        let mut engine = engine_in_normal(3, 199, Some(199));
        engine.last_received_in_sequence_psn = 100;
        let now = Instant::now();
        let actions = engine.send_packet(LinkHeader::CONTROL_SESSION_ID, Bytes::from_static(b"p2"), now);
        let frame = sent_frame(&actions).expect("frame sent");
        assert_eq!(frame.header.seq(), 200);
        assert_eq!(frame.header.ack(), 100);
        assert_eq!(engine.unack_packets.len(), 1);
        assert!(actions.iter().any(|a| matches!(a, LinkAction::ArmTimer { timer: TimerKind::RecvAck, .. })));
    }

    #[test]
    fn scenario_3_cumulative_ack_clears_window() {
        let mut engine = engine_in_normal(3, 199, Some(199));
        engine.last_received_in_sequence_psn = 100;
        let now = Instant::now();
        engine.send_packet(LinkHeader::CONTROL_SESSION_ID, Bytes::from_static(b"p2"), now);
        assert_eq!(engine.unack_packets.len(), 1);

        let ack = LinkFrame::new(ControlFlags::new(ControlFlags::ACK), 0, 200, 0, Bytes::new());
        let actions = engine.handle_frame(ack, now);
        assert!(engine.unack_packets.is_empty());
        assert!(actions.iter().any(|a| matches!(a, LinkAction::DisarmTimer(TimerKind::RecvAck))));
    }

    #[test]
    fn scenario_4_window_buffering() {
        let mut engine = engine_in_normal(2, 199, Some(198));
        let now = Instant::now();

        let a1 = engine.send_packet(LinkHeader::CONTROL_SESSION_ID, Bytes::from_static(b"a"), now);
        assert_eq!(sent_frame(&a1).expect("sent").header.seq(), 200);

        let a2 = engine.send_packet(LinkHeader::CONTROL_SESSION_ID, Bytes::from_static(b"b"), now);
        assert_eq!(sent_frame(&a2).expect("sent").header.seq(), 201);

        let a3 = engine.send_packet(LinkHeader::CONTROL_SESSION_ID, Bytes::from_static(b"c"), now);
        assert!(sent_frame(&a3).is_none());
        assert_eq!(engine.queued_packets.len(), 1);

        let ack = LinkFrame::new(ControlFlags::new(ControlFlags::ACK), 0, 201, 0, Bytes::new());
        let actions = engine.handle_frame(ack, now);
        let frame = sent_frame(&actions).expect("queued packet flushed");
        assert_eq!(frame.header.seq(), 202);
    }

    #[test]
    fn scenario_5_out_of_order_then_gap_fill() {
        let mut engine = engine_in_normal(10, 199, Some(199));
        engine.last_received_in_sequence_psn = 102;
        engine.last_acked_psn = Some(102);
        let now = Instant::now();

        let mut delivered = Vec::new();
        for seq in [103u8, 107, 105, 104] {
            let frame = data_frame(seq, 0, LinkHeader::CONTROL_SESSION_ID, &[seq]);
            let actions = engine.handle_frame(frame, now);
            for action in actions {
                if let LinkAction::DeliverData { data, .. } = action {
                    delivered.push(data[0]);
                }
            }
        }

        assert_eq!(delivered, vec![103, 104, 105]);
        assert_eq!(engine.last_received_in_sequence_psn, 105);
        assert_eq!(engine.received_out_of_sequence.len(), 1);
        assert_eq!(engine.received_out_of_sequence[0].psn, 107);
    }

    #[test]
    fn scenario_6_wrap_around_reorder() {
        let mut engine = engine_in_normal(10, 199, Some(199));
        engine.last_received_in_sequence_psn = 253;
        engine.last_acked_psn = Some(253);
        let now = Instant::now();

        let mut delivered = Vec::new();
        for seq in [254u8, 0, 255] {
            let frame = data_frame(seq, 0, LinkHeader::CONTROL_SESSION_ID, &[seq]);
            let actions = engine.handle_frame(frame, now);
            for action in actions {
                if let LinkAction::DeliverData { data, .. } = action {
                    delivered.push(data[0]);
                }
            }
        }

        assert_eq!(delivered, vec![254, 255, 0]);
        assert_eq!(engine.last_received_in_sequence_psn, 0);
    }

    #[test]
    fn scenario_7_eak_on_gap_at_window() {
        let mut engine = engine_in_normal(2, 199, Some(199));
        engine.last_received_in_sequence_psn = 102;
        engine.last_acked_psn = Some(102);
        let now = Instant::now();

        let f103 = data_frame(103, 0, LinkHeader::CONTROL_SESSION_ID, b"x");
        engine.handle_frame(f103, now);

        let f105 = data_frame(105, 0, LinkHeader::CONTROL_SESSION_ID, b"y");
        let actions = engine.handle_frame(f105, now);

        let eak = actions.iter().find_map(|a| match a {
            LinkAction::SendFrame(f) if f.header.control().is_eak() => Some(f),
            _ => None,
        });
        let eak = eak.expect("expected an EAK frame");
        assert_eq!(eak.payload.as_ref(), &[104]);
    }

    #[test]
    fn scenario_8_cumulative_ack_threshold() {
        let mut config = LinkConfig::default();
        config.max_ack = 3;
        config.max_outgoing = 100;
        let mut engine: TestEngine = LinkEngine::new(config);
        engine.state = LinkState::Normal;
        engine.last_received_in_sequence_psn = 0;
        engine.last_acked_psn = Some(0);
        let now = Instant::now();

        let mut saw_ack = false;
        for seq in [1u8, 2, 3] {
            let frame = data_frame(seq, 0, LinkHeader::CONTROL_SESSION_ID, &[seq]);
            let actions = engine.handle_frame(frame, now);
            if seq == 3 {
                saw_ack = sent_frame(&actions).is_some();
            }
        }
        assert!(saw_ack, "expected a bare ACK after the third ACK-carrying frame");
    }

    #[test]
    fn scenario_9_retransmission_to_death() {
        let mut config = LinkConfig::default();
        config.max_retransmissions = 3;
        let mut engine: TestEngine = LinkEngine::new(config);
        engine.state = LinkState::Normal;
        let now = Instant::now();
        engine.send_packet(LinkHeader::CONTROL_SESSION_ID, Bytes::from_static(b"p1"), now);

        let mut died = false;
        for _ in 0..3 {
            let actions = engine.on_recv_ack_timer(now);
            if actions.iter().any(|a| matches!(a, LinkAction::Bailout(LinkError::MaxRetransmissionsExceeded { .. }))) {
                died = true;
            }
        }
        assert!(died);
        assert_eq!(engine.state(), LinkState::Dead);
    }

    #[tokio::test]
    async fn scenario_10_smoke_end_to_end() {
        let mut engine: TestEngine = LinkEngine::new(LinkConfig::default());
        engine.start();
        let now = Instant::now();

        let negotiate_actions = engine.handle_detect_bytes(&DETECT_MARKER);
        assert_eq!(engine.state(), LinkState::Negotiate);
        assert!(sent_frame(&negotiate_actions).expect("syn sent").header.control().is_syn());

        let peer_syn_payload = LinkConfig::default().to_sync_payload();
        let peer_syn =
            LinkFrame::new(ControlFlags::new(ControlFlags::SYN), 10, 0, 0, peer_syn_payload.encode());
        engine.handle_frame(peer_syn, now);
        assert_eq!(engine.last_received_in_sequence_psn, 10);

        let ack = LinkFrame::new(ControlFlags::new(ControlFlags::ACK), 0, engine.sent_psn, 0, Bytes::new());
        engine.handle_frame(ack, now);
        assert_eq!(engine.state(), LinkState::Normal);

        let data = data_frame(11, 0, LinkHeader::CONTROL_SESSION_ID, b"hello world!");
        let actions = engine.handle_frame(data, now);
        assert!(actions.iter().any(|a| matches!(
            a,
            LinkAction::DeliverData { session_id, data, .. }
                if *session_id == LinkHeader::CONTROL_SESSION_ID && data.as_ref() == b"hello world!"
        )));

        let ea_stream = crate::stream::SessionStream::external_accessory(0x42, usize::from(LinkConfig::default().max_len));
        ea_stream.write(b"life").await.expect("write");
        ea_stream.signal_write_allowed();
        let drained = ea_stream.drain().await.expect("ea payload drained");

        let send_actions = engine.send_packet(LinkHeader::EA_SESSION_ID, drained, now);
        let frame = sent_frame(&send_actions).expect("ea data sent");
        assert_eq!(frame.payload.as_ref(), b"\x00\x42life");
    }
}
