use crate::{
    connection_manager::{ConnectionError, ConnectionId, ConnectionState},
    control_protocol::message::{ChatMessage, ControlMessage},
    media_source_manager::{DeviceError, TrackId, TrackKind},
    roster::Participant,
    signaling_client::{IncomingOffer, ParticipantId},
    transport::Transport,
};

/// Inputs produced by worker threads and device callbacks, drained by
/// [`crate::core::session::CallSession::poll`].
#[derive(Debug)]
pub enum EngineInput {
    Incoming(IncomingOffer),
    Established {
        conn: ConnectionId,
        transport: Transport,
    },
    EstablishFailed {
        conn: ConnectionId,
        error: ConnectionError,
    },
    Control {
        conn: ConnectionId,
        from: ParticipantId,
        msg: ControlMessage,
    },
    TransportClosed {
        conn: ConnectionId,
    },
    TrackEnded {
        track: TrackId,
        kind: TrackKind,
    },
}

/// What the UI layer observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RosterChanged(Vec<Participant>),
    ChatReceived(ChatMessage),
    ConnectionStateChanged {
        remote: ParticipantId,
        conn: ConnectionId,
        state: ConnectionState,
    },
    ConnectionFailed {
        remote: ParticipantId,
        conn: Option<ConnectionId>,
        error: ConnectionError,
    },
    DeviceError(DeviceError),
    MutedByHost,
    HandLoweredByHost,
    RemovedByHost,
    /// Screen capture ended out-of-band; video is back on the camera.
    ScreenShareEnded,
    Error(String),
    Ended,
}
