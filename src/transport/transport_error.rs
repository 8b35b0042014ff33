use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// This side closed the sub-channel.
    Closed,
    /// The remote side dropped its end.
    PeerGone,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "control channel closed locally"),
            Self::PeerGone => write!(f, "control channel closed by peer"),
        }
    }
}

impl std::error::Error for TransportError {}
