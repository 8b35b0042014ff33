use std::fmt;

use crate::{
    connection_manager::ConnectionError, control_protocol::MalformedMessage,
    media_source_manager::DeviceError, roster::RosterError, signaling_client::ParticipantId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `start_as_host` / `join_by_room_id` has not been called.
    NotStarted,
    AlreadyStarted,
    /// The session ended; it cannot be reused.
    Ended,
    /// A non-host attempted a host-only action. Nothing was sent.
    UnauthorizedAction(&'static str),
    InvalidTarget(ParticipantId),
    UnknownParticipant(ParticipantId),
    EmptyMessage,
    Device(DeviceError),
    Connection(ConnectionError),
    Encode(MalformedMessage),
    Roster(RosterError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "session not started"),
            Self::AlreadyStarted => write!(f, "session already started"),
            Self::Ended => write!(f, "session has ended"),
            Self::UnauthorizedAction(action) => write!(f, "only the host may {action}"),
            Self::InvalidTarget(id) => write!(f, "invalid target {id}"),
            Self::UnknownParticipant(id) => write!(f, "unknown participant {id}"),
            Self::EmptyMessage => write!(f, "chat message is empty"),
            Self::Device(e) => write!(f, "device error: {e}"),
            Self::Connection(e) => write!(f, "connection error: {e}"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::Roster(e) => write!(f, "roster error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<DeviceError> for SessionError {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

impl From<ConnectionError> for SessionError {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::Encode(m) => Self::Encode(m),
            other => Self::Connection(other),
        }
    }
}

impl From<MalformedMessage> for SessionError {
    fn from(e: MalformedMessage) -> Self {
        Self::Encode(e)
    }
}

impl From<RosterError> for SessionError {
    fn from(e: RosterError) -> Self {
        match e {
            RosterError::UnknownParticipant(id) => Self::UnknownParticipant(id),
            other => Self::Roster(other),
        }
    }
}
