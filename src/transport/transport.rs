use crate::{
    signaling_client::{participant_id::ParticipantId, session_offer::SessionOffer},
    transport::{
        control_channel::{self, ControlChannel},
        media_channel::{self, MediaChannel},
    },
};

/// One endpoint of an established media+control link to `remote`.
#[derive(Debug)]
pub struct Transport {
    pub remote: ParticipantId,
    /// What `remote` announced: its offer on the callee side, its answer on
    /// the caller side (when it sent one).
    pub remote_offer: Option<SessionOffer>,
    pub control: ControlChannel,
    pub media: MediaChannel,
}

impl Transport {
    /// Creates both endpoints of a link between `a` and `b`.
    /// The first endpoint belongs to `a` (its `remote` is `b`).
    #[must_use]
    pub fn pair(a: ParticipantId, b: ParticipantId) -> (Self, Self) {
        let (a_tx, b_rx) = control_channel::one_way();
        let (b_tx, a_rx) = control_channel::one_way();
        let (a_media, b_media) = media_channel::pair();
        (
            Self {
                remote: b,
                remote_offer: None,
                control: ControlChannel {
                    sender: a_tx,
                    receiver: a_rx,
                },
                media: a_media,
            },
            Self {
                remote: a,
                remote_offer: None,
                control: ControlChannel {
                    sender: b_tx,
                    receiver: b_rx,
                },
                media: b_media,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;

    #[test]
    fn endpoints_are_crossed() {
        let a = ParticipantId::new("A").unwrap();
        let b = ParticipantId::new("B").unwrap();
        let (ta, tb) = Transport::pair(a.clone(), b.clone());
        assert_eq!(ta.remote, b);
        assert_eq!(tb.remote, a);

        ta.control.sender.send(Bytes::from_static(b"ping")).unwrap();
        tb.control.sender.send(Bytes::from_static(b"pong")).unwrap();
        let wait = Duration::from_millis(100);
        assert_eq!(tb.control.receiver.recv_timeout(wait).unwrap(), "ping");
        assert_eq!(ta.control.receiver.recv_timeout(wait).unwrap(), "pong");
    }
}
