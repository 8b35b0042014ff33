use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    time::Duration,
};

use bytes::Bytes;

use crate::transport::transport_error::TransportError;

/// Outbound half of a control sub-channel. Frames arrive at the peer in the
/// order they were sent.
#[derive(Debug)]
pub struct ControlSender {
    tx: Option<Sender<Bytes>>,
}

impl ControlSender {
    /// Queues one frame.
    ///
    /// # Errors
    /// `Closed` after [`ControlSender::close`], `PeerGone` once the peer's
    /// receiver is dropped.
    pub fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::PeerGone)
    }

    /// Drops the sending end so the peer observes closure. Idempotent.
    pub fn close(&mut self) {
        self.tx = None;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

/// Inbound half of a control sub-channel.
#[derive(Debug)]
pub struct ControlReceiver {
    rx: Receiver<Bytes>,
}

impl ControlReceiver {
    /// # Errors
    /// `Timeout` when nothing arrived, `Disconnected` once the peer closed.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Bytes, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Both directions of one endpoint's control sub-channel.
#[derive(Debug)]
pub struct ControlChannel {
    pub sender: ControlSender,
    pub receiver: ControlReceiver,
}

/// One direction: frames written to the sender come out of the receiver.
pub(super) fn one_way() -> (ControlSender, ControlReceiver) {
    let (tx, rx) = mpsc::channel();
    (ControlSender { tx: Some(tx) }, ControlReceiver { rx })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn frames_are_delivered_in_order() {
        let (tx, rx) = one_way();
        for i in 0u8..10 {
            tx.send(Bytes::from(vec![i])).unwrap();
        }
        for i in 0u8..10 {
            let f = rx.recv_timeout(Duration::from_millis(100)).unwrap();
            assert_eq!(f.as_ref(), &[i]);
        }
    }

    #[test]
    fn close_is_observed_by_peer() {
        let (mut tx, rx) = one_way();
        tx.send(Bytes::from_static(b"last")).unwrap();
        tx.close();
        tx.close();
        assert_eq!(tx.send(Bytes::new()), Err(TransportError::Closed));
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(100)).unwrap(),
            Bytes::from_static(b"last")
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(100)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn send_to_dropped_receiver_reports_peer_gone() {
        let (tx, rx) = one_way();
        drop(rx);
        assert_eq!(tx.send(Bytes::new()), Err(TransportError::PeerGone));
    }
}
