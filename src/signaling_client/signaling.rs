use std::sync::mpsc::Receiver;

use crate::signaling_client::{
    incoming_offer::IncomingOffer, participant_id::ParticipantId, pending_answer::PendingAnswer,
    session_offer::SessionOffer, signaling_client_error::SignalingClientError,
};

/// Rendezvous capability: address a participant by id and exchange an
/// offer/answer that yields a connected [`crate::transport::Transport`].
pub trait Signaling: Send {
    fn local_id(&self) -> &ParticipantId;

    /// Sends an offer to `remote`.
    ///
    /// # Errors
    /// `UnknownPeer` when nobody is bound under `remote`.
    fn dial(
        &self,
        remote: &ParticipantId,
        offer: SessionOffer,
    ) -> Result<PendingAnswer, SignalingClientError>;

    /// Stream of offers addressed to us. Can be taken once.
    fn take_incoming(&mut self) -> Option<Receiver<IncomingOffer>>;
}
