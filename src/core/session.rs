use std::{
    collections::{HashSet, VecDeque},
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    time::{Duration, Instant},
};

use crate::{
    config::{CallConfig, MediaSettings},
    connection_manager::{
        BroadcastReport, ConnectionConfig, ConnectionError, ConnectionId, ConnectionManager,
        ConnectionState,
    },
    control_protocol::message::{ChatMessage, ControlMessage},
    core::{
        events::{EngineInput, SessionEvent},
        session_error::SessionError,
    },
    log::LogSink,
    media_source_manager::{
        DeviceDescriptor, DeviceError, MediaDevices, MediaKind, MediaSourceManager, TrackId, TrackKind,
    },
    roster::{Participant, Roster, RosterEffect},
    signaling_client::{IncomingOffer, ParticipantId, SessionOffer, Signaling},
    sink_debug, sink_error, sink_info, sink_warn,
    transport::Transport,
};

/// Which local tracks a session starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaRequest {
    pub audio: bool,
    pub video: bool,
}

impl MediaRequest {
    pub const AUDIO_VIDEO: Self = Self {
        audio: true,
        video: true,
    };
    pub const NONE: Self = Self {
        audio: false,
        video: false,
    };
}

impl From<&MediaSettings> for MediaRequest {
    fn from(m: &MediaSettings) -> Self {
        Self {
            audio: m.start_audio,
            video: m.start_video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    /// Terminal.
    Ended,
}

/// One participant's view of a call.
///
/// Every roster write happens on the thread that calls into this struct:
/// worker threads only enqueue [`EngineInput`]s, which [`CallSession::poll`]
/// applies one at a time.
pub struct CallSession {
    signaling: Box<dyn Signaling>,
    cfg: CallConfig,
    logger: Arc<dyn LogSink>,
    state: SessionState,
    roster: Roster,
    connections: ConnectionManager,
    media: MediaSourceManager,
    input_rx: Receiver<EngineInput>,
    /// Events produced by synchronous calls, handed out by the next `poll`.
    pending: VecDeque<SessionEvent>,
    chat: Vec<ChatMessage>,
    seen_chat: HashSet<(ParticipantId, String)>,
    unread: usize,
    /// Local hand flag. Host snapshots may lag behind it, never override it.
    hand_raised: bool,
}

impl CallSession {
    pub fn new(
        signaling: Box<dyn Signaling>,
        devices: Box<dyn MediaDevices>,
        cfg: CallConfig,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        let (input_tx, input_rx): (Sender<EngineInput>, _) = mpsc::channel();
        let local = Participant::new(signaling.local_id().clone(), cfg.display_name.clone());
        let connections = ConnectionManager::new(
            input_tx.clone(),
            ConnectionConfig::from(&cfg),
            Arc::clone(&logger),
        );
        let media = MediaSourceManager::new(devices, input_tx, Arc::clone(&logger));
        Self {
            signaling,
            cfg,
            logger,
            state: SessionState::Idle,
            roster: Roster::new(local),
            connections,
            media,
            input_rx,
            pending: VecDeque::new(),
            chat: Vec::new(),
            seen_chat: HashSet::new(),
            unread: 0,
            hand_raised: false,
        }
    }

    // ---- Lifecycle ----------------------------------------------------------

    /// Starts a new call with the local participant as host.
    /// Returns the room id other participants join with.
    ///
    /// Device failures do not fail the call; they are reported as
    /// [`SessionEvent::DeviceError`].
    ///
    /// # Errors
    /// `AlreadyStarted`, `Ended`, or a connection error if incoming offers
    /// cannot be listened for.
    pub fn start_as_host(&mut self, tracks: MediaRequest) -> Result<ParticipantId, SessionError> {
        self.require_idle()?;
        let local_id = self.local_id().clone();
        self.roster = Roster::new(Participant::host(
            local_id.clone(),
            self.cfg.display_name.clone(),
        ));
        self.connections.start_listening(&mut *self.signaling)?;
        self.acquire_initial(tracks);
        self.state = SessionState::Active;
        sink_info!(self.logger, "[session] hosting room {local_id}");
        self.emit_roster();
        Ok(local_id)
    }

    /// Joins the call hosted by `room_id` as a guest.
    ///
    /// # Errors
    /// `AlreadyStarted`, `Ended`, `InvalidTarget` for our own id, or a
    /// connection error. A host that cannot be reached is reported later as
    /// [`SessionEvent::ConnectionFailed`].
    pub fn join_by_room_id(
        &mut self,
        room_id: &ParticipantId,
        tracks: MediaRequest,
    ) -> Result<ConnectionId, SessionError> {
        self.require_idle()?;
        if room_id == self.local_id() {
            return Err(SessionError::InvalidTarget(room_id.clone()));
        }
        self.connections.start_listening(&mut *self.signaling)?;
        self.acquire_initial(tracks);
        self.state = SessionState::Active;
        sink_info!(self.logger, "[session] joining room {room_id}");
        self.emit_roster();
        Ok(self.connect_peer(room_id)?)
    }

    /// Opens a fresh connection to `remote`. Also the retry entry point after
    /// a [`SessionEvent::ConnectionFailed`].
    ///
    /// # Errors
    /// `InvalidTarget` for our own id, `AlreadyConnected` while a live
    /// connection exists.
    pub fn connect_peer(&mut self, remote: &ParticipantId) -> Result<ConnectionId, SessionError> {
        self.require_active()?;
        if remote == self.local_id() {
            return Err(SessionError::InvalidTarget(remote.clone()));
        }
        let offer = self.offer();
        Ok(self
            .connections
            .connect(&*self.signaling, remote, offer)?)
    }

    /// Closes every connection, cancels pending attempts and releases every
    /// capture device. Safe from any state; the session cannot be reused.
    pub fn end_call(&mut self) {
        if self.state == SessionState::Ended {
            return;
        }
        self.connections.close_all();
        self.media.release_all();
        self.state = SessionState::Ended;
        sink_info!(self.logger, "[session] call ended");
        self.pending.push_back(SessionEvent::Ended);
    }

    // ---- User intents -------------------------------------------------------

    /// Sends a chat message to everyone and records it in the local history.
    ///
    /// # Errors
    /// `EmptyMessage` for blank content, `Encode` when it does not fit a frame.
    pub fn send_chat(&mut self, content: &str) -> Result<ChatMessage, SessionError> {
        self.require_active()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let msg = ChatMessage::new(self.local_id().clone(), content);
        self.broadcast(&ControlMessage::Chat(msg.clone()))?;
        self.seen_chat.insert((msg.sender.clone(), msg.id.clone()));
        self.chat.push(msg.clone());
        Ok(msg)
    }

    /// Flips the microphone, mirrors it in the roster and tells everyone.
    /// Returns the new muted state.
    ///
    /// # Errors
    /// `NotStarted` or `Ended`.
    pub fn toggle_self_mute(&mut self) -> Result<bool, SessionError> {
        self.require_active()?;
        let local_id = self.local_id().clone();
        let muted = self.media.audio_enabled();
        self.roster.set_muted(&local_id, muted)?;
        self.media.set_audio_enabled(!muted);
        self.emit_roster();
        self.broadcast(&ControlMessage::MuteStatus {
            participant: local_id,
            muted,
        })?;
        Ok(muted)
    }

    /// Enables or disables the outbound camera. Returns whether video is now on.
    ///
    /// # Errors
    /// `NotStarted` or `Ended`.
    pub fn toggle_self_video(&mut self) -> Result<bool, SessionError> {
        self.require_active()?;
        let enabled = !self.media.video_enabled();
        self.media.set_video_enabled(enabled);
        sink_debug!(self.logger, "[session] camera enabled={enabled}");
        Ok(enabled)
    }

    /// Starts or stops screen sharing, swapping the video track on every
    /// connection in place. Returns whether sharing is now on.
    ///
    /// # Errors
    /// `Device` when the screen cannot be captured; the camera keeps going.
    pub fn toggle_screen_share(&mut self) -> Result<bool, SessionError> {
        self.require_active()?;
        let sharing = if self.media.is_screen_sharing() {
            self.media.stop_screen_share();
            false
        } else {
            if let Err(e) = self.media.start_screen_share() {
                self.pending.push_back(SessionEvent::DeviceError(e.clone()));
                return Err(e.into());
            }
            true
        };
        self.refresh_outbound(MediaKind::Video);
        sink_info!(self.logger, "[session] screen share {}", if sharing { "on" } else { "off" });
        Ok(sharing)
    }

    /// Flips the local hand flag and tells everyone. Returns the new state.
    ///
    /// # Errors
    /// `NotStarted` or `Ended`.
    pub fn toggle_hand_raise(&mut self) -> Result<bool, SessionError> {
        self.require_active()?;
        let local_id = self.local_id().clone();
        let raised = !self.hand_raised;
        self.roster.set_hand_raised(&local_id, raised)?;
        self.hand_raised = raised;
        self.emit_roster();
        self.broadcast(&ControlMessage::HandRaise {
            participant: local_id,
            raised,
        })?;
        Ok(raised)
    }

    /// Moves the camera or microphone to `device_id` mid-call.
    ///
    /// A failure is also reported as [`SessionEvent::DeviceError`].
    ///
    /// # Errors
    /// `Device`; the previous device is kept when it can be reopened.
    pub fn switch_device(&mut self, kind: TrackKind, device_id: &str) -> Result<(), SessionError> {
        self.require_active()?;
        let result = self.media.switch_device(kind, device_id);
        self.refresh_outbound(kind.media_kind());
        if let Err(e) = &result {
            sink_warn!(self.logger, "[session] cannot switch {kind} to {device_id}: {e}");
            self.pending.push_back(SessionEvent::DeviceError(e.clone()));
        }
        result.map(|_| ()).map_err(SessionError::from)
    }

    /// # Errors
    /// `Device` when the kind cannot be enumerated.
    pub fn list_devices(&self, kind: TrackKind) -> Result<Vec<DeviceDescriptor>, SessionError> {
        Ok(self.media.list_devices(kind)?)
    }

    /// Host only: mutes `target` everywhere.
    ///
    /// # Errors
    /// `UnauthorizedAction` when not host (nothing is sent), `InvalidTarget`
    /// for ourselves, `UnknownParticipant`.
    pub fn host_mute(&mut self, target: &ParticipantId) -> Result<(), SessionError> {
        self.require_moderation(target, "mute participants")?;
        self.roster.set_muted(target, true)?;
        self.emit_roster();
        self.broadcast(&ControlMessage::MuteCommand {
            participant: target.clone(),
        })?;
        Ok(())
    }

    /// Host only: removes `target` from the call.
    ///
    /// # Errors
    /// As [`CallSession::host_mute`].
    pub fn host_remove(&mut self, target: &ParticipantId) -> Result<(), SessionError> {
        self.require_moderation(target, "remove participants")?;
        // Sent before closing so the target reads it ahead of the closure.
        self.broadcast(&ControlMessage::RemoveCommand {
            participant: target.clone(),
        })?;
        self.roster.remove(target)?;
        if let Some(id) = self.connections.connection_to(target).map(|c| c.id()) {
            self.connections.close(id);
        }
        sink_info!(self.logger, "[session] removed {target}");
        self.emit_roster();
        Ok(())
    }

    /// Host only: lowers `target`'s hand.
    ///
    /// # Errors
    /// As [`CallSession::host_mute`].
    pub fn host_lower_hand(&mut self, target: &ParticipantId) -> Result<(), SessionError> {
        self.require_moderation(target, "lower hands")?;
        self.roster.set_hand_raised(target, false)?;
        self.emit_roster();
        self.broadcast(&ControlMessage::LowerHandCommand {
            participant: target.clone(),
        })?;
        Ok(())
    }

    pub fn mark_chat_read(&mut self) {
        self.unread = 0;
    }

    // ---- Queries ------------------------------------------------------------

    /// Our participant id, which is also the room id when hosting.
    #[must_use]
    pub fn session_id(&self) -> &ParticipantId {
        self.local_id()
    }

    fn local_id(&self) -> &ParticipantId {
        self.signaling.local_id()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn local_participant(&self) -> Option<&Participant> {
        self.roster.local()
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        self.roster.is_local_host()
    }

    #[must_use]
    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat
    }

    #[must_use]
    pub fn unread_messages(&self) -> usize {
        self.unread
    }

    #[must_use]
    pub fn connection_state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.state(id)
    }

    /// The live connection to `remote`, if any.
    #[must_use]
    pub fn connection_to(&self, remote: &ParticipantId) -> Option<ConnectionId> {
        self.connections.connection_to(remote).map(|c| c.id())
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    #[must_use]
    pub fn media(&self) -> &MediaSourceManager {
        &self.media
    }

    // ---- Event loop ---------------------------------------------------------

    /// Applies every queued input and returns the resulting events. Never blocks.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        while let Ok(input) = self.input_rx.try_recv() {
            self.handle_input(input);
        }
        self.pending.drain(..).collect()
    }

    /// Like [`CallSession::poll`] but waits up to `timeout` for at least one event.
    pub fn wait_events(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let events = self.poll();
            if !events.is_empty() {
                return events;
            }
            let Some(left) = deadline.checked_duration_since(Instant::now()) else {
                return events;
            };
            match self.input_rx.recv_timeout(left) {
                Ok(input) => self.handle_input(input),
                Err(_) => return self.poll(),
            }
        }
    }

    fn handle_input(&mut self, input: EngineInput) {
        if self.state == SessionState::Ended {
            if let EngineInput::Incoming(offer) = input {
                offer.reject("call ended");
            }
            return;
        }
        match input {
            EngineInput::Incoming(offer) => self.on_incoming(offer),
            EngineInput::Established { conn, transport } => self.on_established(conn, transport),
            EngineInput::EstablishFailed { conn, error } => {
                if let Some(remote) = self.connections.on_failed(conn, &error) {
                    self.pending.push_back(SessionEvent::ConnectionFailed {
                        remote: remote.clone(),
                        conn: Some(conn),
                        error,
                    });
                    self.emit_state(remote, conn, ConnectionState::Closed);
                }
            }
            EngineInput::TransportClosed { conn } => {
                if let Some(remote) = self.connections.on_transport_closed(conn) {
                    self.emit_state(remote.clone(), conn, ConnectionState::Closed);
                    self.evict(&remote);
                }
            }
            EngineInput::Control { conn, from, msg } => self.on_control(conn, &from, msg),
            EngineInput::TrackEnded { track, kind } => self.on_track_ended(track, kind),
        }
    }

    fn on_incoming(&mut self, offer: IncomingOffer) {
        if self.state != SessionState::Active {
            offer.reject("not in a call");
            return;
        }
        let is_host = self.is_host();
        if !is_host && !self.cfg.mesh {
            sink_info!(self.logger, "[session] rejecting {}: mesh disabled", offer.from);
            offer.reject("mesh disabled");
            return;
        }
        let remote = offer.from.clone();
        let display_name = offer.offer.display_name.clone();
        let answer = self.offer();
        let accepted = self.connections.accept(
            offer,
            answer,
            self.media.outbound_audio(),
            self.media.outbound_video(),
        );
        let conn = match accepted {
            Ok(id) => id,
            Err(error) => {
                sink_warn!(self.logger, "[session] cannot accept {remote}: {error}");
                self.pending.push_back(SessionEvent::ConnectionFailed {
                    remote,
                    conn: None,
                    error,
                });
                return;
            }
        };
        self.emit_state(remote.clone(), conn, ConnectionState::Active);

        // Guests record mesh peers provisionally; the host's next snapshot wins.
        match self.roster.add(Participant::new(remote.clone(), display_name)) {
            Ok(true) => {
                self.emit_roster();
                if is_host {
                    sink_info!(self.logger, "[session] {remote} joined");
                    self.broadcast_roster();
                }
            }
            Ok(false) => {
                if is_host {
                    self.broadcast_roster();
                }
            }
            Err(e) => self.report_error(&e),
        }
    }

    fn on_established(&mut self, conn: ConnectionId, transport: Transport) {
        let remote = transport.remote.clone();
        let display_name = transport
            .remote_offer
            .as_ref()
            .map_or_else(|| remote.to_string(), |answer| answer.display_name.clone());
        let result = self.connections.on_established(
            conn,
            transport,
            self.media.outbound_audio(),
            self.media.outbound_video(),
        );
        match result {
            Ok(()) => {
                self.emit_state(remote.clone(), conn, ConnectionState::Active);
                if self.is_host() {
                    if let Ok(true) = self.roster.add(Participant::new(remote.clone(), display_name)) {
                        self.emit_roster();
                    }
                    self.broadcast_roster();
                }
            }
            Err(ConnectionError::InvalidTransition { from, .. }) => {
                sink_debug!(self.logger, "[{conn}] answer arrived after {from}, dropped");
            }
            Err(error) => {
                if let Some(remote) = self.connections.on_failed(conn, &error) {
                    self.pending.push_back(SessionEvent::ConnectionFailed {
                        remote: remote.clone(),
                        conn: Some(conn),
                        error,
                    });
                    self.emit_state(remote, conn, ConnectionState::Closed);
                }
            }
        }
    }

    fn on_control(&mut self, conn: ConnectionId, from: &ParticipantId, msg: ControlMessage) {
        match msg {
            ControlMessage::Chat(chat) => {
                let relay = self.is_host() && !self.cfg.mesh;
                if self.on_chat(chat.clone()) && relay {
                    self.relay(conn, &ControlMessage::Chat(chat));
                }
            }
            ControlMessage::Unknown { kind, .. } => {
                sink_debug!(self.logger, "[{conn}] unknown kind 0x{kind:02x} from {from}");
            }
            other => {
                let is_snapshot = matches!(other, ControlMessage::RosterSnapshot(_));
                let is_flag = matches!(
                    other,
                    ControlMessage::HandRaise { .. } | ControlMessage::MuteStatus { .. }
                );
                let effects = match self.roster.apply_remote(&other, self.is_host()) {
                    Ok(effects) => effects,
                    Err(e) => {
                        sink_error!(
                            self.logger,
                            "[{conn}] rejected {} from {from}: {e}",
                            other.name()
                        );
                        self.report_error(&e);
                        return;
                    }
                };
                let changed = effects.contains(&RosterEffect::Changed);
                self.apply_effects(effects, from);
                if self.state != SessionState::Active {
                    return;
                }
                if is_snapshot {
                    self.reconcile_local_flags();
                    self.complete_mesh();
                } else if is_flag && changed && self.is_host() {
                    self.broadcast_roster();
                }
            }
        }
    }

    /// Records a chat message. Returns false for one already seen.
    fn on_chat(&mut self, chat: ChatMessage) -> bool {
        if !self.seen_chat.insert((chat.sender.clone(), chat.id.clone())) {
            sink_debug!(self.logger, "[session] duplicate chat {} from {}", chat.id, chat.sender);
            return false;
        }
        self.chat.push(chat.clone());
        self.unread += 1;
        self.pending.push_back(SessionEvent::ChatReceived(chat));
        true
    }

    /// Host without mesh: passes a guest's message on to every other guest.
    fn relay(&mut self, from_conn: ConnectionId, msg: &ControlMessage) {
        match self.connections.broadcast_except(msg, from_conn) {
            Ok(report) => {
                sink_debug!(
                    self.logger,
                    "[{from_conn}] relayed {} to {} peer(s)",
                    msg.name(),
                    report.delivered
                );
            }
            Err(e) => self.report_error(&e),
        }
    }

    /// Snapshots can predate our own flag reports. The microphone and the
    /// local hand flag win; a stale entry is corrected and re-announced.
    fn reconcile_local_flags(&mut self) {
        let local_id = self.local_id().clone();
        let Some((listed_muted, listed_raised)) =
            self.roster.local().map(|p| (p.is_muted, p.hand_raised))
        else {
            return;
        };
        let muted = !self.media.audio_enabled();
        let raised = self.hand_raised;
        let mut reports = Vec::new();
        if listed_muted != muted {
            if let Err(e) = self.roster.set_muted(&local_id, muted) {
                self.report_error(&e);
                return;
            }
            reports.push(ControlMessage::MuteStatus {
                participant: local_id.clone(),
                muted,
            });
        }
        if listed_raised != raised {
            if let Err(e) = self.roster.set_hand_raised(&local_id, raised) {
                self.report_error(&e);
                return;
            }
            reports.push(ControlMessage::HandRaise {
                participant: local_id,
                raised,
            });
        }
        if reports.is_empty() {
            return;
        }
        sink_debug!(self.logger, "[session] snapshot had stale local flags, re-announcing");
        self.emit_roster();
        for msg in reports {
            if let Err(e) = self.broadcast(&msg) {
                self.report_error(&e);
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<RosterEffect>, from: &ParticipantId) {
        let mut changed = false;
        for effect in effects {
            match effect {
                RosterEffect::Changed => changed = true,
                RosterEffect::SilenceLocalAudio => {
                    self.media.set_audio_enabled(false);
                    sink_info!(self.logger, "[session] muted by host");
                    self.pending.push_back(SessionEvent::MutedByHost);
                }
                RosterEffect::LocalHandLowered => {
                    self.hand_raised = false;
                    self.pending.push_back(SessionEvent::HandLoweredByHost);
                }
                RosterEffect::LocalRemoved => {
                    sink_info!(self.logger, "[session] removed by host");
                    if changed {
                        self.emit_roster();
                    }
                    self.pending.push_back(SessionEvent::RemovedByHost);
                    self.end_call();
                    return;
                }
                RosterEffect::PeerRemoved(id) => {
                    if let Some(conn) = self.connections.connection_to(&id).map(|c| c.id()) {
                        self.connections.close(conn);
                        self.emit_state(id, conn, ConnectionState::Closed);
                    }
                }
                RosterEffect::Ignored(reason) => {
                    sink_debug!(self.logger, "[session] ignored message from {from}: {reason}");
                }
            }
        }
        if changed {
            self.emit_roster();
        }
    }

    /// Guests dial every participant listed before them that they are not yet
    /// connected to. Later joiners dial earlier ones, so no pair dials twice.
    fn complete_mesh(&mut self) {
        if !self.cfg.mesh || self.is_host() {
            return;
        }
        let Some(local_pos) = self.roster.position(self.local_id()) else {
            return;
        };
        let targets: Vec<ParticipantId> = self.roster.entries()[..local_pos]
            .iter()
            .map(|p| p.id.clone())
            .filter(|id| self.connections.connection_to(id).is_none())
            .collect();
        for remote in targets {
            sink_debug!(self.logger, "[session] mesh: dialing {remote}");
            if let Err(e) = self.connect_peer(&remote) {
                sink_warn!(self.logger, "[session] mesh dial to {remote} failed: {e}");
            }
        }
    }

    /// Drops a participant whose connection went away.
    fn evict(&mut self, remote: &ParticipantId) {
        if self.connections.connection_to(remote).is_some() {
            return;
        }
        match self.roster.remove(remote) {
            Ok(Some(_)) => {
                sink_info!(self.logger, "[session] {remote} left");
                self.emit_roster();
                if self.is_host() {
                    self.broadcast_roster();
                }
            }
            Ok(None) => {}
            Err(e) => self.report_error(&e),
        }
    }

    fn on_track_ended(&mut self, track: TrackId, kind: TrackKind) {
        let Some(kind) = self.media.on_track_ended(track) else {
            sink_debug!(self.logger, "[session] stale end of {kind} {track}");
            return;
        };
        self.refresh_outbound(kind.media_kind());
        if kind == TrackKind::Screen {
            self.pending.push_back(SessionEvent::ScreenShareEnded);
        } else {
            self.pending
                .push_back(SessionEvent::DeviceError(DeviceError::DeviceUnavailable(
                    kind.to_string(),
                )));
        }
    }

    // ---- Helpers ------------------------------------------------------------

    fn require_idle(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => Ok(()),
            SessionState::Active => Err(SessionError::AlreadyStarted),
            SessionState::Ended => Err(SessionError::Ended),
        }
    }

    fn require_active(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Idle => Err(SessionError::NotStarted),
            SessionState::Ended => Err(SessionError::Ended),
        }
    }

    fn require_moderation(
        &self,
        target: &ParticipantId,
        action: &'static str,
    ) -> Result<(), SessionError> {
        self.require_active()?;
        if !self.is_host() {
            sink_warn!(self.logger, "[session] refused: only the host may {action}");
            return Err(SessionError::UnauthorizedAction(action));
        }
        if target == self.local_id() {
            return Err(SessionError::InvalidTarget(target.clone()));
        }
        if !self.roster.contains(target) {
            return Err(SessionError::UnknownParticipant(target.clone()));
        }
        Ok(())
    }

    fn offer(&self) -> SessionOffer {
        SessionOffer {
            display_name: self.cfg.display_name.clone(),
            sends_audio: self.media.outbound_audio().is_some(),
            sends_video: self.media.outbound_video().is_some(),
        }
    }

    fn acquire_initial(&mut self, tracks: MediaRequest) {
        let wanted = [
            (tracks.audio, TrackKind::Microphone, self.cfg.media.audio_device.clone()),
            (tracks.video, TrackKind::Camera, self.cfg.media.video_device.clone()),
        ];
        for (want, kind, device) in wanted {
            if !want {
                continue;
            }
            if let Err(e) = self.media.acquire(kind, device.as_deref()) {
                self.pending.push_back(SessionEvent::DeviceError(e));
            }
        }
    }

    fn refresh_outbound(&mut self, kind: MediaKind) {
        let track = self.media.outbound(kind);
        let changed = self.connections.replace_track_all(kind, track.as_ref());
        sink_debug!(self.logger, "[session] {kind:?} sender replaced on {changed} connection(s)");
    }

    fn broadcast(&self, msg: &ControlMessage) -> Result<BroadcastReport, SessionError> {
        let report = self.connections.broadcast(msg)?;
        if !report.failed.is_empty() {
            sink_warn!(
                self.logger,
                "[session] {} reached {} peer(s), failed for {:?}",
                msg.name(),
                report.delivered,
                report.failed
            );
        }
        Ok(report)
    }

    /// Host only: pushes the current roster to every connection.
    fn broadcast_roster(&mut self) {
        debug_assert!(self.is_host(), "only the host broadcasts roster snapshots");
        debug_assert!(self.roster.host_count() == 1, "roster must have exactly one host");
        if !self.is_host() {
            return;
        }
        if let Err(e) = self.broadcast(&ControlMessage::RosterSnapshot(self.roster.snapshot())) {
            self.report_error(&e);
        }
    }

    fn emit_roster(&mut self) {
        self.pending
            .push_back(SessionEvent::RosterChanged(self.roster.snapshot()));
    }

    fn emit_state(&mut self, remote: ParticipantId, conn: ConnectionId, state: ConnectionState) {
        self.pending.push_back(SessionEvent::ConnectionStateChanged {
            remote,
            conn,
            state,
        });
    }

    fn report_error<E: std::fmt::Display>(&mut self, e: &E) {
        sink_error!(self.logger, "[session] {e}");
        self.pending.push_back(SessionEvent::Error(e.to_string()));
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.connections.close_all();
        self.media.release_all();
    }
}
