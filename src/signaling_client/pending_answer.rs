use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};

use crate::{
    signaling_client::signaling_client_error::SignalingClientError, transport::Transport,
};

pub(crate) type AnswerResult = Result<Transport, SignalingClientError>;

/// A dialed offer waiting for the callee's answer.
///
/// Dropping it abandons the attempt: a later `accept` on the callee side then
/// fails with `CallerGone`.
#[derive(Debug)]
pub struct PendingAnswer {
    rx: Receiver<AnswerResult>,
}

impl PendingAnswer {
    pub(crate) fn new(rx: Receiver<AnswerResult>) -> Self {
        Self { rx }
    }

    /// Waits up to `step` for the answer. `Ok(None)` means still pending.
    ///
    /// # Errors
    /// `Rejected` if the callee declined, `Disconnected` if it went away.
    pub fn poll_for(&self, step: Duration) -> Result<Option<Transport>, SignalingClientError> {
        match self.rx.recv_timeout(step) {
            Ok(answer) => answer.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SignalingClientError::Disconnected),
        }
    }

    /// Blocks until answered or `timeout` elapses.
    ///
    /// # Errors
    /// As [`PendingAnswer::poll_for`], plus `Timeout`.
    pub fn wait(self, timeout: Duration) -> Result<Transport, SignalingClientError> {
        self.poll_for(timeout)?.ok_or(SignalingClientError::Timeout)
    }
}
