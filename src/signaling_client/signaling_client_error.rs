use std::fmt;

use crate::signaling_client::participant_id::ParticipantId;

/// Errors reported by the rendezvous capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingClientError {
    /// Nobody is bound under that id.
    UnknownPeer(ParticipantId),
    /// The id is already bound by another endpoint.
    IdInUse(ParticipantId),
    /// The caller stopped waiting before the offer was accepted.
    CallerGone,
    /// The callee declined the offer.
    Rejected(String),
    /// No answer arrived in time.
    Timeout,
    /// The callee went away without answering.
    Disconnected,
    Poisoned,
}

impl fmt::Display for SignalingClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPeer(id) => write!(f, "unknown peer {id}"),
            Self::IdInUse(id) => write!(f, "participant id {id} already bound"),
            Self::CallerGone => write!(f, "caller is no longer waiting"),
            Self::Rejected(reason) => write!(f, "offer rejected: {reason}"),
            Self::Timeout => write!(f, "no answer before timeout"),
            Self::Disconnected => write!(f, "signaling peer disconnected"),
            Self::Poisoned => write!(f, "signaling registry lock poisoned"),
        }
    }
}

impl std::error::Error for SignalingClientError {}
