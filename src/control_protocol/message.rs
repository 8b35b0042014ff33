use bytes::Bytes;

use crate::{
    roster::participant::Participant,
    signaling_client::participant_id::ParticipantId,
    utils::{now_unix_ms, random_token},
};

const CHAT_ID_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique per sender; `(sender, id)` identifies a message.
    pub id: String,
    pub sender: ParticipantId,
    pub content: String,
    /// Milliseconds since the UNIX epoch, sender's clock.
    pub sent_at: u64,
}

impl ChatMessage {
    pub fn new<S: Into<String>>(sender: ParticipantId, content: S) -> Self {
        Self {
            id: random_token(CHAT_ID_LEN),
            sender,
            content: content.into(),
            sent_at: now_unix_ms(),
        }
    }
}

/// Application messages carried on a connection's control sub-channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Chat(ChatMessage),
    RosterSnapshot(Vec<Participant>),
    HandRaise { participant: ParticipantId, raised: bool },
    MuteStatus { participant: ParticipantId, muted: bool },
    MuteCommand { participant: ParticipantId },
    RemoveCommand { participant: ParticipantId },
    LowerHandCommand { participant: ParticipantId },
    /// A kind this build does not understand; kept so callers can log and skip it.
    Unknown { kind: u8, payload: Bytes },
}

impl ControlMessage {
    /// Messages only the host may originate.
    #[must_use]
    pub fn is_host_only(&self) -> bool {
        matches!(
            self,
            Self::RosterSnapshot(_)
                | Self::MuteCommand { .. }
                | Self::RemoveCommand { .. }
                | Self::LowerHandCommand { .. }
        )
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::RosterSnapshot(_) => "roster-snapshot",
            Self::HandRaise { .. } => "hand-raise",
            Self::MuteStatus { .. } => "mute-status",
            Self::MuteCommand { .. } => "mute-command",
            Self::RemoveCommand { .. } => "remove-command",
            Self::LowerHandCommand { .. } => "lower-hand-command",
            Self::Unknown { .. } => "unknown",
        }
    }
}
