use crate::signaling_client::participant_id::ParticipantId;

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub is_host: bool,
    pub is_muted: bool,
    pub hand_raised: bool,
}

impl Participant {
    pub fn new<S: Into<String>>(id: ParticipantId, display_name: S) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_host: false,
            is_muted: false,
            hand_raised: false,
        }
    }

    pub fn host<S: Into<String>>(id: ParticipantId, display_name: S) -> Self {
        Self {
            is_host: true,
            ..Self::new(id, display_name)
        }
    }
}
