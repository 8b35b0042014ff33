use std::{fmt, time::Duration};

use crate::{
    connection_manager::{connection::ConnectionId, connection_state::ConnectionState},
    control_protocol::errors::MalformedMessage,
    signaling_client::signaling_client_error::SignalingClientError,
    transport::transport_error::TransportError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// `Connecting` did not reach `Active` in time.
    HandshakeTimeout(Duration),
    Signaling(SignalingClientError),
    Transport(TransportError),
    Encode(MalformedMessage),
    UnknownConnection(ConnectionId),
    AlreadyConnected(ConnectionId),
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// The signaling endpoint's offer stream was already taken.
    NoIncomingStream,
    Spawn(String),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandshakeTimeout(d) => {
                write!(f, "connection not established within {} ms", d.as_millis())
            }
            Self::Signaling(e) => write!(f, "signaling error: {e}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Encode(e) => write!(f, "cannot encode control message: {e}"),
            Self::UnknownConnection(id) => write!(f, "unknown connection {id}"),
            Self::AlreadyConnected(id) => write!(f, "peer already connected on {id}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid connection transition {from} -> {to}")
            }
            Self::NoIncomingStream => write!(f, "incoming offer stream already taken"),
            Self::Spawn(e) => write!(f, "failed to spawn worker thread: {e}"),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl From<SignalingClientError> for ConnectionError {
    fn from(e: SignalingClientError) -> Self {
        Self::Signaling(e)
    }
}

impl From<TransportError> for ConnectionError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<MalformedMessage> for ConnectionError {
    fn from(e: MalformedMessage) -> Self {
        Self::Encode(e)
    }
}
