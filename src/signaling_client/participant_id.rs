use std::fmt;

use crate::{core::constants::PARTICIPANT_ID_LEN, utils::random_token};

/// Opaque session identifier of one participant.
///
/// A room id is the host's participant id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps an existing id. Returns `None` for an empty string.
    pub fn new<S: Into<String>>(id: S) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    /// Generates a fresh URL-safe random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_token(PARTICIPANT_ID_LEN))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
