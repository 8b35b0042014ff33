//! Participant identity and the rendezvous capability used to reach peers.
pub mod incoming_offer;
pub mod loopback_hub;
pub mod participant_id;
pub mod pending_answer;
pub mod session_offer;
pub mod signaling;
pub mod signaling_client_error;
pub use incoming_offer::IncomingOffer;
pub use loopback_hub::{LoopbackHub, LoopbackSignaling};
pub use participant_id::ParticipantId;
pub use pending_answer::PendingAnswer;
pub use session_offer::SessionOffer;
pub use signaling::Signaling;
pub use signaling_client_error::SignalingClientError;
