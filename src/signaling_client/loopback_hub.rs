use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        mpsc::{self, Receiver, Sender},
    },
};

use crate::{
    signaling_client::{
        incoming_offer::IncomingOffer, participant_id::ParticipantId,
        pending_answer::PendingAnswer, session_offer::SessionOffer, signaling::Signaling,
        signaling_client_error::SignalingClientError,
    },
    transport::Transport,
};

type Registry = Arc<Mutex<HashMap<ParticipantId, Sender<IncomingOffer>>>>;

/// In-process rendezvous service. Every endpoint bound on the same hub can
/// dial every other one.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    registry: Registry,
}

impl LoopbackHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an endpoint under a freshly generated id.
    ///
    /// # Errors
    /// `Poisoned` if the registry lock is poisoned.
    pub fn bind(&self) -> Result<LoopbackSignaling, SignalingClientError> {
        loop {
            match self.bind_as(ParticipantId::generate()) {
                Err(SignalingClientError::IdInUse(_)) => {}
                other => return other,
            }
        }
    }

    /// Binds an endpoint under `id`.
    ///
    /// # Errors
    /// `IdInUse` if another live endpoint holds `id`.
    pub fn bind_as(&self, id: ParticipantId) -> Result<LoopbackSignaling, SignalingClientError> {
        let mut reg = self
            .registry
            .lock()
            .map_err(|_| SignalingClientError::Poisoned)?;
        if reg.contains_key(&id) {
            return Err(SignalingClientError::IdInUse(id));
        }
        let (tx, rx) = mpsc::channel();
        reg.insert(id.clone(), tx);
        Ok(LoopbackSignaling {
            id,
            registry: Arc::clone(&self.registry),
            incoming: Some(rx),
        })
    }

    #[must_use]
    pub fn is_bound(&self, id: &ParticipantId) -> bool {
        self.registry
            .lock()
            .map(|reg| reg.contains_key(id))
            .unwrap_or(false)
    }
}

/// One participant's binding on a [`LoopbackHub`]. Dropping it unbinds the id.
pub struct LoopbackSignaling {
    id: ParticipantId,
    registry: Registry,
    incoming: Option<Receiver<IncomingOffer>>,
}

impl Signaling for LoopbackSignaling {
    fn local_id(&self) -> &ParticipantId {
        &self.id
    }

    fn dial(
        &self,
        remote: &ParticipantId,
        offer: SessionOffer,
    ) -> Result<PendingAnswer, SignalingClientError> {
        let callee = self
            .registry
            .lock()
            .map_err(|_| SignalingClientError::Poisoned)?
            .get(remote)
            .cloned()
            .ok_or_else(|| SignalingClientError::UnknownPeer(remote.clone()))?;

        let (caller_end, callee_end) = Transport::pair(self.id.clone(), remote.clone());
        let (reply_tx, reply_rx) = mpsc::channel();
        callee
            .send(IncomingOffer::new(
                self.id.clone(),
                offer,
                caller_end,
                callee_end,
                reply_tx,
            ))
            .map_err(|_| SignalingClientError::UnknownPeer(remote.clone()))?;
        Ok(PendingAnswer::new(reply_rx))
    }

    fn take_incoming(&mut self) -> Option<Receiver<IncomingOffer>> {
        self.incoming.take()
    }
}

impl Drop for LoopbackSignaling {
    fn drop(&mut self) {
        if let Ok(mut reg) = self.registry.lock() {
            reg.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn offer(name: &str) -> SessionOffer {
        SessionOffer {
            display_name: name.into(),
            sends_audio: true,
            sends_video: false,
        }
    }

    #[test]
    fn dial_and_accept_connects_both_ends() {
        let hub = LoopbackHub::new();
        let caller = hub.bind_as(pid("A")).unwrap();
        let mut callee = hub.bind_as(pid("B")).unwrap();
        let incoming = callee.take_incoming().unwrap();
        assert!(callee.take_incoming().is_none());

        let pending = caller.dial(&pid("B"), offer("Ann")).unwrap();
        let inc = incoming.recv_timeout(Duration::from_millis(200)).unwrap();
        assert_eq!(inc.from, pid("A"));
        assert_eq!(inc.offer.display_name, "Ann");
        let b_end = inc.accept().unwrap();
        let a_end = pending.wait(Duration::from_millis(200)).unwrap();

        assert_eq!(a_end.remote, pid("B"));
        a_end.control.sender.send(Bytes::from_static(b"hi")).unwrap();
        assert_eq!(
            b_end
                .control
                .receiver
                .recv_timeout(Duration::from_millis(100))
                .unwrap(),
            "hi"
        );
    }

    #[test]
    fn answer_reaches_caller() {
        let hub = LoopbackHub::new();
        let caller = hub.bind_as(pid("A")).unwrap();
        let mut callee = hub.bind_as(pid("B")).unwrap();
        let incoming = callee.take_incoming().unwrap();

        let pending = caller.dial(&pid("B"), offer("Ann")).unwrap();
        let b_end = incoming
            .recv_timeout(Duration::from_millis(200))
            .unwrap()
            .accept_with(offer("Bea"))
            .unwrap();
        let a_end = pending.wait(Duration::from_millis(200)).unwrap();
        assert_eq!(a_end.remote_offer.map(|o| o.display_name).as_deref(), Some("Bea"));
        assert_eq!(b_end.remote_offer.map(|o| o.display_name).as_deref(), Some("Ann"));
    }

    #[test]
    fn binding_twice_fails_until_dropped() {
        let hub = LoopbackHub::new();
        let first = hub.bind_as(pid("H")).unwrap();
        assert_eq!(
            hub.bind_as(pid("H")).err(),
            Some(SignalingClientError::IdInUse(pid("H")))
        );
        drop(first);
        assert!(!hub.is_bound(&pid("H")));
        assert!(hub.bind_as(pid("H")).is_ok());
    }

    #[test]
    fn dialing_unknown_peer_fails() {
        let hub = LoopbackHub::new();
        let a = hub.bind().unwrap();
        assert_eq!(
            a.dial(&pid("nobody"), offer("a")).err(),
            Some(SignalingClientError::UnknownPeer(pid("nobody")))
        );
    }

    #[test]
    fn reject_and_caller_gone() {
        let hub = LoopbackHub::new();
        let a = hub.bind_as(pid("A")).unwrap();
        let mut b = hub.bind_as(pid("B")).unwrap();
        let incoming = b.take_incoming().unwrap();

        let pending = a.dial(&pid("B"), offer("a")).unwrap();
        incoming
            .recv_timeout(Duration::from_millis(100))
            .unwrap()
            .reject("full");
        assert_eq!(
            pending.wait(Duration::from_millis(100)).err(),
            Some(SignalingClientError::Rejected("full".into()))
        );

        let pending = a.dial(&pid("B"), offer("a")).unwrap();
        assert!(matches!(
            pending.poll_for(Duration::from_millis(10)),
            Ok(None)
        ));
        drop(pending);
        let late = incoming.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(late.accept().err(), Some(SignalingClientError::CallerGone));
    }
}
