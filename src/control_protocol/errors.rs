use std::{fmt, io};

/// A control frame that could not be decoded (or a message too large to encode).
///
/// Never escalated beyond the connection that produced it: the frame is
/// dropped and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedMessage {
    Empty,
    UnsupportedVersion(u8),
    Truncated,
    InvalidUtf8,
    EmptyId,
    StringTooLong { max: usize, actual: usize },
    TooManyParticipants(usize),
}

impl fmt::Display for MalformedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty frame"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported protocol version {v}"),
            Self::Truncated => write!(f, "frame truncated"),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::EmptyId => write!(f, "empty participant id"),
            Self::StringTooLong { max, actual } => {
                write!(f, "string of {actual} bytes exceeds {max}")
            }
            Self::TooManyParticipants(n) => write!(f, "roster of {n} entries does not fit a frame"),
        }
    }
}

impl std::error::Error for MalformedMessage {}

impl From<io::Error> for MalformedMessage {
    fn from(_: io::Error) -> Self {
        // Reads come from an in-memory cursor, so the only failure is EOF.
        Self::Truncated
    }
}
