use crate::signaling_client::participant_id::ParticipantId;

/// What applying a remote message means for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterEffect {
    /// Roster content changed.
    Changed,
    /// The host muted us; outbound audio must stop.
    SilenceLocalAudio,
    /// The host lowered our hand.
    LocalHandLowered,
    /// The host removed us from the call.
    LocalRemoved,
    /// The host removed someone else; drop our connection to them.
    PeerRemoved(ParticipantId),
    Ignored(&'static str),
}
