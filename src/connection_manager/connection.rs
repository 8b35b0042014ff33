use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Instant,
};

use bytes::Bytes;

use crate::{
    connection_manager::{
        connection_error::ConnectionError,
        connection_state::{ConnectionRole, ConnectionState},
    },
    media_source_manager::track::{MediaKind, Track},
    signaling_client::participant_id::ParticipantId,
    transport::{ControlSender, MediaChannel},
};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, monotonically increasing. Retries never reuse an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// The paired media+control link to one remote participant.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    remote: ParticipantId,
    role: ConnectionRole,
    state: ConnectionState,
    /// Present only while `Active`.
    control: Option<ControlSender>,
    media: Option<MediaChannel>,
    /// Cleared on close; stops the establishment and reader threads.
    run_flag: Arc<AtomicBool>,
    opened_at: Instant,
}

impl Connection {
    pub(crate) fn new(remote: ParticipantId, role: ConnectionRole) -> Self {
        Self {
            id: ConnectionId::next(),
            remote,
            role,
            state: ConnectionState::Connecting,
            control: None,
            media: None,
            run_flag: Arc::new(AtomicBool::new(true)),
            opened_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn remote(&self) -> &ParticipantId {
        &self.remote
    }

    #[must_use]
    pub fn role(&self) -> ConnectionRole {
        self.role
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    /// Media sub-channel, available while `Active`.
    #[must_use]
    pub fn media(&self) -> Option<&MediaChannel> {
        self.media.as_ref()
    }

    /// Swaps the outbound track of `kind` in place. Returns whether it changed.
    pub fn replace_track(&self, kind: MediaKind, track: Option<Track>) -> bool {
        self.media
            .as_ref()
            .is_some_and(|m| m.sender(kind).replace_track(track))
    }

    pub(crate) fn run_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.run_flag)
    }

    pub(crate) fn transition(&mut self, next: ConnectionState) -> Result<(), ConnectionError> {
        if !self.state.can_transition_to(next) {
            return Err(ConnectionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub(crate) fn activate(
        &mut self,
        control: ControlSender,
        media: MediaChannel,
    ) -> Result<(), ConnectionError> {
        self.transition(ConnectionState::Active)?;
        self.control = Some(control);
        self.media = Some(media);
        Ok(())
    }

    /// Writes one frame. Returns `Ok(false)` without sending unless `Active`.
    pub(crate) fn send_frame(&self, frame: Bytes) -> Result<bool, ConnectionError> {
        if self.state != ConnectionState::Active {
            return Ok(false);
        }
        match &self.control {
            Some(tx) => {
                tx.send(frame)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Releases both sub-channels and cancels worker threads. Idempotent;
    /// returns whether this call closed the connection.
    pub(crate) fn shutdown(&mut self) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.run_flag.store(false, Ordering::SeqCst);
        if let Some(mut control) = self.control.take() {
            control.close();
        }
        if let Some(media) = self.media.take() {
            media.clear();
        }
        self.state = ConnectionState::Closed;
        true
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn ids_are_fresh() {
        let p = ParticipantId::new("Q").unwrap();
        let a = Connection::new(p.clone(), ConnectionRole::Caller);
        let b = Connection::new(p, ConnectionRole::Caller);
        assert!(b.id() > a.id());
    }

    #[test]
    fn closed_is_terminal_and_send_is_a_noop() {
        let mut c = Connection::new(ParticipantId::new("Q").unwrap(), ConnectionRole::Caller);
        assert!(c.shutdown());
        assert!(!c.shutdown());
        assert_eq!(c.state(), ConnectionState::Closed);
        assert_eq!(c.send_frame(Bytes::from_static(b"x")), Ok(false));
        assert_eq!(
            c.transition(ConnectionState::Active),
            Err(ConnectionError::InvalidTransition {
                from: ConnectionState::Closed,
                to: ConnectionState::Active
            })
        );
        assert!(!c.run_flag().load(Ordering::SeqCst));
    }
}
