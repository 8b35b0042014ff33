/// What a caller announces when it dials a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOffer {
    pub display_name: String,
    pub sends_audio: bool,
    pub sends_video: bool,
}
