use std::sync::mpsc::Sender;

use crate::{
    signaling_client::{
        participant_id::ParticipantId, pending_answer::AnswerResult,
        session_offer::SessionOffer, signaling_client_error::SignalingClientError,
    },
    transport::Transport,
};

/// An offer delivered to the callee. Must be answered with `accept` or `reject`;
/// dropping it unanswered looks like a disconnect to the caller.
#[derive(Debug)]
pub struct IncomingOffer {
    pub from: ParticipantId,
    pub offer: SessionOffer,
    caller_end: Transport,
    callee_end: Transport,
    reply: Sender<AnswerResult>,
}

impl IncomingOffer {
    pub(crate) fn new(
        from: ParticipantId,
        offer: SessionOffer,
        caller_end: Transport,
        callee_end: Transport,
        reply: Sender<AnswerResult>,
    ) -> Self {
        Self {
            from,
            offer,
            caller_end,
            callee_end,
            reply,
        }
    }

    /// Answers the offer and returns the callee's endpoint.
    ///
    /// # Errors
    /// `CallerGone` when the caller stopped waiting (for example after its
    /// handshake timeout).
    pub fn accept(self) -> Result<Transport, SignalingClientError> {
        self.answer(None)
    }

    /// Like [`IncomingOffer::accept`], also telling the caller who answered.
    ///
    /// # Errors
    /// As [`IncomingOffer::accept`].
    pub fn accept_with(self, answer: SessionOffer) -> Result<Transport, SignalingClientError> {
        self.answer(Some(answer))
    }

    fn answer(self, answer: Option<SessionOffer>) -> Result<Transport, SignalingClientError> {
        let Self {
            offer,
            mut caller_end,
            mut callee_end,
            reply,
            ..
        } = self;
        caller_end.remote_offer = answer;
        callee_end.remote_offer = Some(offer);
        reply
            .send(Ok(caller_end))
            .map_err(|_| SignalingClientError::CallerGone)?;
        Ok(callee_end)
    }

    pub fn reject(self, reason: &str) {
        let _ = self
            .reply
            .send(Err(SignalingClientError::Rejected(reason.to_owned())));
    }
}
