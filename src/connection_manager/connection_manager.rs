use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{RecvTimeoutError, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use crate::{
    connection_manager::{
        config::ConnectionConfig,
        connection::{Connection, ConnectionId},
        connection_error::ConnectionError,
        connection_state::{ConnectionRole, ConnectionState},
        reader_worker::{ReaderArgs, spawn_reader},
    },
    control_protocol::{codec, message::ControlMessage},
    core::{constants::MAX_CLOSED_CONNECTIONS, events::EngineInput},
    log::LogSink,
    media_source_manager::track::{MediaKind, Track},
    signaling_client::{
        IncomingOffer, ParticipantId, PendingAnswer, SessionOffer, Signaling,
    },
    sink_debug, sink_info, sink_warn,
    transport::Transport,
};

/// Outcome of a [`ConnectionManager::broadcast`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Peers whose send failed. Other peers were still attempted.
    pub failed: Vec<ParticipantId>,
}

/// Establishes and tracks one [`Connection`] per remote participant.
///
/// Worker threads (establishment, readers, the offer listener) never touch
/// this struct; they report through `events_tx` and the owner feeds the
/// outcomes back with `on_established`, `on_failed` and `on_transport_closed`.
pub struct ConnectionManager {
    logger: Arc<dyn LogSink>,
    events_tx: Sender<EngineInput>,
    cfg: ConnectionConfig,
    connections: BTreeMap<ConnectionId, Connection>,
    /// Closed connections still answering `state` queries, oldest first.
    closed: VecDeque<ConnectionId>,
    listener_run: Arc<AtomicBool>,
}

impl ConnectionManager {
    pub fn new(
        events_tx: Sender<EngineInput>,
        cfg: ConnectionConfig,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            logger,
            events_tx,
            cfg,
            connections: BTreeMap::new(),
            closed: VecDeque::new(),
            listener_run: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn config(&self) -> ConnectionConfig {
        self.cfg
    }

    /// Forwards offers addressed to `signaling` as [`EngineInput::Incoming`].
    ///
    /// # Errors
    /// `NoIncomingStream` if the offer stream was already taken, `Spawn` if the
    /// listener thread cannot start.
    pub fn start_listening(&mut self, signaling: &mut dyn Signaling) -> Result<(), ConnectionError> {
        let incoming = signaling
            .take_incoming()
            .ok_or(ConnectionError::NoIncomingStream)?;
        self.listener_run.store(true, Ordering::SeqCst);

        let run = Arc::clone(&self.listener_run);
        let tx = self.events_tx.clone();
        let logger = Arc::clone(&self.logger);
        let poll = self.cfg.reader_poll;
        thread::Builder::new()
            .name("offer-listener".into())
            .spawn(move || {
                while run.load(Ordering::SeqCst) {
                    match incoming.recv_timeout(poll) {
                        Ok(offer) => {
                            sink_debug!(logger, "[listen] offer from {}", offer.from);
                            if tx.send(EngineInput::Incoming(offer)).is_err() {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                sink_debug!(logger, "[listen] listener done");
            })
            .map(|_| ())
            .map_err(|e| ConnectionError::Spawn(e.to_string()))
    }

    /// Caller role: dials `remote` with a fresh connection.
    ///
    /// The attempt resolves asynchronously as `Established` or
    /// `EstablishFailed`; a dial that fails right away is reported the same way.
    ///
    /// # Errors
    /// `AlreadyConnected` while a live connection to `remote` exists.
    pub fn connect(
        &mut self,
        signaling: &dyn Signaling,
        remote: &ParticipantId,
        offer: SessionOffer,
    ) -> Result<ConnectionId, ConnectionError> {
        if let Some(existing) = self.connection_to(remote) {
            return Err(ConnectionError::AlreadyConnected(existing.id()));
        }
        let conn = Connection::new(remote.clone(), ConnectionRole::Caller);
        let id = conn.id();
        sink_info!(self.logger, "[{id}] connecting to {remote}");

        let started = signaling
            .dial(remote, offer)
            .map_err(ConnectionError::from)
            .and_then(|pending| self.spawn_establish(id, pending, conn.run_flag()));
        if let Err(error) = started {
            let _ = self
                .events_tx
                .send(EngineInput::EstablishFailed { conn: id, error });
        }
        self.connections.insert(id, conn);
        Ok(id)
    }

    fn spawn_establish(
        &self,
        id: ConnectionId,
        pending: PendingAnswer,
        run: Arc<AtomicBool>,
    ) -> Result<(), ConnectionError> {
        let tx = self.events_tx.clone();
        let logger = Arc::clone(&self.logger);
        let timeout = self.cfg.handshake_timeout;
        let step = self.cfg.reader_poll.min(timeout.max(Duration::from_millis(1)));

        thread::Builder::new()
            .name(format!("conn-establish-{}", id.as_u64()))
            .spawn(move || {
                let started_at = Instant::now();
                while run.load(Ordering::SeqCst) {
                    match pending.poll_for(step) {
                        Ok(Some(transport)) => {
                            let _ = tx.send(EngineInput::Established {
                                conn: id,
                                transport,
                            });
                            return;
                        }
                        Ok(None) => {
                            if started_at.elapsed() >= timeout {
                                let _ = tx.send(EngineInput::EstablishFailed {
                                    conn: id,
                                    error: ConnectionError::HandshakeTimeout(timeout),
                                });
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(EngineInput::EstablishFailed {
                                conn: id,
                                error: e.into(),
                            });
                            return;
                        }
                    }
                }
                sink_debug!(logger, "[{id}] establishment cancelled");
            })
            .map(|_| ())
            .map_err(|e| ConnectionError::Spawn(e.to_string()))
    }

    /// Callee role: answers `offer` with `answer` and activates the connection
    /// right away. A live connection to the same participant is superseded.
    ///
    /// # Errors
    /// `Signaling(CallerGone)` when the caller already gave up; spawn failures.
    pub fn accept(
        &mut self,
        offer: IncomingOffer,
        answer: SessionOffer,
        audio: Option<Track>,
        video: Option<Track>,
    ) -> Result<ConnectionId, ConnectionError> {
        let remote = offer.from.clone();
        let transport = offer.accept_with(answer)?;

        if let Some(old) = self.connection_to(&remote).map(Connection::id) {
            sink_info!(self.logger, "[{old}] superseded by a new offer from {remote}");
            self.close(old);
        }

        let conn = Connection::new(remote.clone(), ConnectionRole::Callee);
        let id = conn.id();
        self.connections.insert(id, conn);
        self.on_established(id, transport, audio, video)?;
        sink_info!(self.logger, "[{id}] accepted {remote}");
        Ok(id)
    }

    /// Moves a `Connecting` connection to `Active`, installs the outbound
    /// tracks and starts its reader.
    ///
    /// If the connection was closed meanwhile (cancelled, timed out) the
    /// transport is dropped, which the peer observes as closure.
    ///
    /// # Errors
    /// `UnknownConnection`, `InvalidTransition` or `Spawn`.
    pub fn on_established(
        &mut self,
        id: ConnectionId,
        transport: Transport,
        audio: Option<Track>,
        video: Option<Track>,
    ) -> Result<(), ConnectionError> {
        let logger = Arc::clone(&self.logger);
        let events_tx = self.events_tx.clone();
        let poll = self.cfg.reader_poll;
        let conn = self
            .connections
            .get_mut(&id)
            .ok_or(ConnectionError::UnknownConnection(id))?;
        if conn.state() != ConnectionState::Connecting {
            return Err(ConnectionError::InvalidTransition {
                from: conn.state(),
                to: ConnectionState::Active,
            });
        }

        let Transport { control, media, .. } = transport;
        media.audio.replace_track(audio);
        media.video.replace_track(video);

        let reader = ReaderArgs {
            conn: id,
            remote: conn.remote().clone(),
            receiver: control.receiver,
            run: conn.run_flag(),
            events_tx,
            logger: Arc::clone(&logger),
            poll,
        };
        if let Err(e) = spawn_reader(reader) {
            conn.shutdown();
            self.retire(id);
            return Err(e);
        }
        conn.activate(control.sender, media)?;
        sink_info!(logger, "[{id}] active with {}", conn.remote());
        Ok(())
    }

    /// Fails a `Connecting` connection. Returns the remote participant when
    /// the connection was still pending.
    pub fn on_failed(&mut self, id: ConnectionId, error: &ConnectionError) -> Option<ParticipantId> {
        let conn = self.connections.get_mut(&id)?;
        if conn.state() != ConnectionState::Connecting {
            return None;
        }
        conn.shutdown();
        sink_warn!(self.logger, "[{id}] connection to {} failed: {error}", conn.remote());
        let remote = conn.remote().clone();
        self.retire(id);
        Some(remote)
    }

    /// Closes an `Active` connection the peer went away from. Returns the
    /// remote participant if this closed it.
    pub fn on_transport_closed(&mut self, id: ConnectionId) -> Option<ParticipantId> {
        let conn = self.connections.get_mut(&id)?;
        if conn.state() != ConnectionState::Active {
            return None;
        }
        conn.shutdown();
        sink_info!(self.logger, "[{id}] closed by {}", conn.remote());
        let remote = conn.remote().clone();
        self.retire(id);
        Some(remote)
    }

    /// Sends one message on one connection. Sending on a connection that is
    /// not `Active` is a no-op that returns `Ok(false)`.
    ///
    /// # Errors
    /// `UnknownConnection`, `Encode`, or `Transport` when the peer is gone.
    pub fn send(&self, id: ConnectionId, msg: &ControlMessage) -> Result<bool, ConnectionError> {
        let conn = self
            .connections
            .get(&id)
            .ok_or(ConnectionError::UnknownConnection(id))?;
        let frame = codec::encode(msg)?;
        conn.send_frame(frame)
    }

    /// Sends `msg` to every `Active` connection. A failing connection does
    /// not stop delivery to the others.
    ///
    /// # Errors
    /// `Encode` when the message cannot be serialized; nothing is sent then.
    pub fn broadcast(&self, msg: &ControlMessage) -> Result<BroadcastReport, ConnectionError> {
        self.fan_out(msg, None)
    }

    /// Like [`broadcast`](Self::broadcast), skipping the connection `except`.
    ///
    /// # Errors
    /// `Encode` when the message cannot be serialized; nothing is sent then.
    pub fn broadcast_except(
        &self,
        msg: &ControlMessage,
        except: ConnectionId,
    ) -> Result<BroadcastReport, ConnectionError> {
        self.fan_out(msg, Some(except))
    }

    fn fan_out(
        &self,
        msg: &ControlMessage,
        skip: Option<ConnectionId>,
    ) -> Result<BroadcastReport, ConnectionError> {
        let frame = codec::encode(msg)?;
        let mut report = BroadcastReport::default();
        for conn in self.active_connections().filter(|c| Some(c.id()) != skip) {
            match conn.send_frame(frame.clone()) {
                Ok(true) => report.delivered += 1,
                Ok(false) => {}
                Err(e) => {
                    sink_warn!(
                        self.logger,
                        "[{}] {} not delivered to {}: {e}",
                        conn.id(),
                        msg.name(),
                        conn.remote()
                    );
                    report.failed.push(conn.remote().clone());
                }
            }
        }
        Ok(report)
    }

    /// Points every `Active` connection's `kind` sender at `track`.
    /// Returns how many senders changed.
    pub fn replace_track_all(&self, kind: MediaKind, track: Option<&Track>) -> usize {
        self.active_connections()
            .filter(|c| c.replace_track(kind, track.cloned()))
            .count()
    }

    /// Idempotent. Returns whether the connection was live.
    pub fn close(&mut self, id: ConnectionId) -> bool {
        let closed = self
            .connections
            .get_mut(&id)
            .is_some_and(Connection::shutdown);
        if closed {
            sink_debug!(self.logger, "[{id}] closed locally");
            self.retire(id);
        }
        closed
    }

    /// Closes every connection, cancels pending attempts and stops the listener.
    pub fn close_all(&mut self) {
        self.listener_run.store(false, Ordering::SeqCst);
        let shut: Vec<ConnectionId> = self
            .connections
            .values_mut()
            .filter_map(|c| c.shutdown().then_some(c.id()))
            .collect();
        for id in shut {
            self.retire(id);
        }
    }

    /// Records `id` as closed and forgets the oldest closed connections
    /// beyond [`MAX_CLOSED_CONNECTIONS`].
    fn retire(&mut self, id: ConnectionId) {
        self.closed.push_back(id);
        while self.closed.len() > MAX_CLOSED_CONNECTIONS {
            if let Some(old) = self.closed.pop_front() {
                self.connections.remove(&old);
            }
        }
    }

    #[must_use]
    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.get(&id).map(Connection::state)
    }

    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// The live (`Connecting` or `Active`) connection to `remote`, if any.
    #[must_use]
    pub fn connection_to(&self, remote: &ParticipantId) -> Option<&Connection> {
        self.connections
            .values()
            .find(|c| c.remote() == remote && c.state().is_live())
    }

    pub fn active_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections
            .values()
            .filter(|c| c.state() == ConnectionState::Active)
    }

    #[must_use]
    pub fn active_peers(&self) -> Vec<ParticipantId> {
        self.active_connections().map(|c| c.remote().clone()).collect()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{
        log::NoopLogSink,
        media_source_manager::track::TrackKind,
        signaling_client::{LoopbackHub, LoopbackSignaling, SignalingClientError},
    };
    use bytes::Bytes;
    use std::sync::mpsc::{self, Receiver};

    const WAIT: Duration = Duration::from_secs(2);

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn offer() -> SessionOffer {
        SessionOffer {
            display_name: "test".into(),
            sends_audio: true,
            sends_video: true,
        }
    }

    fn manager(timeout_ms: u64) -> (ConnectionManager, Receiver<EngineInput>) {
        let (tx, rx) = mpsc::channel();
        let cfg = ConnectionConfig {
            handshake_timeout: Duration::from_millis(timeout_ms),
            reader_poll: Duration::from_millis(10),
        };
        (ConnectionManager::new(tx, cfg, Arc::new(NoopLogSink)), rx)
    }

    /// Dials `b` from `a` and accepts on the raw endpoint; returns the
    /// manager's connection id and the callee's transport.
    fn connected_pair(
        cm: &mut ConnectionManager,
        rx: &Receiver<EngineInput>,
        a: &LoopbackSignaling,
        b: &mut LoopbackSignaling,
    ) -> (ConnectionId, Transport) {
        let incoming = b.take_incoming().unwrap();
        let id = cm.connect(a, b.local_id(), offer()).unwrap();
        let b_end = incoming.recv_timeout(WAIT).unwrap().accept().unwrap();
        match rx.recv_timeout(WAIT).unwrap() {
            EngineInput::Established { conn, transport } => {
                assert_eq!(conn, id);
                cm.on_established(conn, transport, None, None).unwrap();
            }
            _ => panic!("expected Established"),
        }
        (id, b_end)
    }

    #[test]
    fn handshake_timeout_fails_and_retry_gets_fresh_id() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let _silent = hub.bind_as(pid("Q")).unwrap();
        let (mut cm, rx) = manager(60);

        let first = cm.connect(&a, &pid("Q"), offer()).unwrap();
        assert_eq!(cm.state(first), Some(ConnectionState::Connecting));
        match rx.recv_timeout(WAIT).unwrap() {
            EngineInput::EstablishFailed { conn, error } => {
                assert_eq!(conn, first);
                assert!(matches!(error, ConnectionError::HandshakeTimeout(_)));
                assert_eq!(cm.on_failed(conn, &error), Some(pid("Q")));
            }
            _ => panic!("expected EstablishFailed"),
        }
        assert_eq!(cm.state(first), Some(ConnectionState::Closed));

        let retry = cm.connect(&a, &pid("Q"), offer()).unwrap();
        assert_ne!(retry, first);
        assert_eq!(cm.state(retry), Some(ConnectionState::Connecting));
        assert_eq!(cm.state(first), Some(ConnectionState::Closed));
    }

    #[test]
    fn dialing_unknown_peer_is_reported_as_failure() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let (mut cm, rx) = manager(1_000);
        let id = cm.connect(&a, &pid("nobody"), offer()).unwrap();
        match rx.recv_timeout(WAIT).unwrap() {
            EngineInput::EstablishFailed { conn, error } => {
                assert_eq!(conn, id);
                assert_eq!(
                    error,
                    ConnectionError::Signaling(SignalingClientError::UnknownPeer(pid("nobody")))
                );
            }
            _ => panic!("expected EstablishFailed"),
        }
    }

    #[test]
    fn frames_keep_order_and_malformed_frames_do_not_close() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let mut b = hub.bind_as(pid("B")).unwrap();
        let (mut cm, rx) = manager(1_000);
        let (id, b_end) = connected_pair(&mut cm, &rx, &a, &mut b);
        assert_eq!(cm.state(id), Some(ConnectionState::Active));

        b_end
            .control
            .sender
            .send(Bytes::from_static(&[0xFF, 0x00]))
            .unwrap();
        for i in 0..5 {
            let msg = ControlMessage::HandRaise {
                participant: pid("B"),
                raised: i % 2 == 0,
            };
            b_end.control.sender.send(codec::encode(&msg).unwrap()).unwrap();
        }
        for i in 0..5 {
            match rx.recv_timeout(WAIT).unwrap() {
                EngineInput::Control { conn, from, msg } => {
                    assert_eq!(conn, id);
                    assert_eq!(from, pid("B"));
                    assert_eq!(
                        msg,
                        ControlMessage::HandRaise {
                            participant: pid("B"),
                            raised: i % 2 == 0
                        }
                    );
                }
                _ => panic!("expected Control"),
            }
        }
        assert_eq!(cm.state(id), Some(ConnectionState::Active));
    }

    #[test]
    fn peer_closure_is_reported_and_send_becomes_noop() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let mut b = hub.bind_as(pid("B")).unwrap();
        let (mut cm, rx) = manager(1_000);
        let (id, b_end) = connected_pair(&mut cm, &rx, &a, &mut b);

        drop(b_end);
        match rx.recv_timeout(WAIT).unwrap() {
            EngineInput::TransportClosed { conn } => {
                assert_eq!(cm.on_transport_closed(conn), Some(pid("B")));
            }
            _ => panic!("expected TransportClosed"),
        }
        let msg = ControlMessage::MuteStatus {
            participant: pid("A"),
            muted: true,
        };
        assert_eq!(cm.send(id, &msg), Ok(false));
        assert_eq!(cm.broadcast(&msg).unwrap(), BroadcastReport::default());
        assert!(!cm.close(id));
    }

    #[test]
    fn broadcast_reaches_every_active_connection() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let mut b = hub.bind_as(pid("B")).unwrap();
        let mut c = hub.bind_as(pid("C")).unwrap();
        let (mut cm, rx) = manager(1_000);
        let (_, b_end) = connected_pair(&mut cm, &rx, &a, &mut b);
        let (_, c_end) = connected_pair(&mut cm, &rx, &a, &mut c);

        // C's receiving side goes away: its send fails, B still gets the frame.
        let Transport { control, .. } = c_end;
        drop(control.receiver);

        let msg = ControlMessage::MuteCommand {
            participant: pid("B"),
        };
        let report = cm.broadcast(&msg).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec![pid("C")]);
        let frame = b_end.control.receiver.recv_timeout(WAIT).unwrap();
        assert_eq!(codec::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn broadcast_except_skips_one_connection() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let mut b = hub.bind_as(pid("B")).unwrap();
        let mut c = hub.bind_as(pid("C")).unwrap();
        let (mut cm, rx) = manager(1_000);
        let (to_b, b_end) = connected_pair(&mut cm, &rx, &a, &mut b);
        let (_, c_end) = connected_pair(&mut cm, &rx, &a, &mut c);

        let msg = ControlMessage::HandRaise {
            participant: pid("B"),
            raised: true,
        };
        let report = cm.broadcast_except(&msg, to_b).unwrap();
        assert_eq!(report.delivered, 1);
        let frame = c_end.control.receiver.recv_timeout(WAIT).unwrap();
        assert_eq!(codec::decode(&frame).unwrap(), msg);
        assert!(
            b_end
                .control
                .receiver
                .recv_timeout(Duration::from_millis(50))
                .is_err()
        );
    }

    #[test]
    fn closed_connections_are_forgotten_past_the_retention_bound() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let (mut cm, rx) = manager(1_000);

        let mut ids = Vec::new();
        for _ in 0..MAX_CLOSED_CONNECTIONS + 5 {
            let id = cm.connect(&a, &pid("nobody"), offer()).unwrap();
            match rx.recv_timeout(WAIT).unwrap() {
                EngineInput::EstablishFailed { conn, error } => {
                    assert_eq!(cm.on_failed(conn, &error), Some(pid("nobody")));
                }
                _ => panic!("expected EstablishFailed"),
            }
            ids.push(id);
        }
        assert_eq!(cm.connections.len(), MAX_CLOSED_CONNECTIONS);
        assert_eq!(cm.state(ids[0]), None);
        assert_eq!(cm.state(ids[ids.len() - 1]), Some(ConnectionState::Closed));
    }

    #[test]
    fn accept_supersedes_previous_connection_and_installs_tracks() {
        let hub = LoopbackHub::new();
        let mut a = hub.bind_as(pid("A")).unwrap();
        let b = hub.bind_as(pid("B")).unwrap();
        let (mut cm, _rx) = manager(1_000);
        let incoming = a.take_incoming().unwrap();
        let mic = Track::new(TrackKind::Microphone, "mic-0", "Mic", None);

        let pending1 = b.dial(&pid("A"), offer()).unwrap();
        let first = cm
            .accept(
                incoming.recv_timeout(WAIT).unwrap(),
                offer(),
                Some(mic.clone()),
                None,
            )
            .unwrap();
        let b_end1 = pending1.wait(WAIT).unwrap();
        assert_eq!(b_end1.media.remote_audio.track(), Some(mic.clone()));
        assert_eq!(b_end1.remote_offer, Some(offer()));

        let pending2 = b.dial(&pid("A"), offer()).unwrap();
        let second = cm
            .accept(incoming.recv_timeout(WAIT).unwrap(), offer(), Some(mic), None)
            .unwrap();
        let _b_end2 = pending2.wait(WAIT).unwrap();

        assert_eq!(cm.state(first), Some(ConnectionState::Closed));
        assert_eq!(cm.state(second), Some(ConnectionState::Active));
        assert_eq!(cm.connection_to(&pid("B")).map(Connection::id), Some(second));
        assert!(b_end1.media.remote_audio.track().is_none());
    }

    #[test]
    fn close_all_cancels_pending_attempts() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let _silent = hub.bind_as(pid("Q")).unwrap();
        let (mut cm, rx) = manager(200);
        let id = cm.connect(&a, &pid("Q"), offer()).unwrap();
        cm.close_all();
        assert_eq!(cm.state(id), Some(ConnectionState::Closed));
        // The cancelled attempt reports nothing, not even its timeout.
        assert!(rx.recv_timeout(Duration::from_millis(400)).is_err());
    }
}
