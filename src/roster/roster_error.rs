use std::fmt;

use crate::signaling_client::participant_id::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    UnknownParticipant(ParticipantId),
    /// More than one entry flagged as host.
    MultipleHosts(usize),
    /// The local participant's entry cannot be removed.
    LocalEntry,
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParticipant(id) => write!(f, "participant {id} is not in the roster"),
            Self::MultipleHosts(n) => write!(f, "state invariant violated: {n} hosts in roster"),
            Self::LocalEntry => write!(f, "the local participant cannot be removed"),
        }
    }
}

impl std::error::Error for RosterError {}
