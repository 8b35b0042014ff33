use crate::{
    control_protocol::message::ControlMessage,
    roster::{participant::Participant, roster_effect::RosterEffect, roster_error::RosterError},
    signaling_client::participant_id::ParticipantId,
};

/// Process-local view of everyone in the call, in join order.
///
/// Invariants: the local participant always has an entry and at most one
/// entry is the host. Only the session mutates a `Roster`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    local_id: ParticipantId,
    entries: Vec<Participant>,
}

impl Roster {
    #[must_use]
    pub fn new(local: Participant) -> Self {
        Self {
            local_id: local.id.clone(),
            entries: vec![local],
        }
    }

    #[must_use]
    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    #[must_use]
    pub fn local(&self) -> Option<&Participant> {
        self.get(&self.local_id)
    }

    #[must_use]
    pub fn is_local_host(&self) -> bool {
        self.local().is_some_and(|p| p.is_host)
    }

    #[must_use]
    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.entries.iter().find(|p| &p.id == id)
    }

    fn get_mut(&mut self, id: &ParticipantId) -> Result<&mut Participant, RosterError> {
        self.entries
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| RosterError::UnknownParticipant(id.clone()))
    }

    #[must_use]
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn entries(&self) -> &[Participant] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn host(&self) -> Option<&Participant> {
        self.entries.iter().find(|p| p.is_host)
    }

    #[must_use]
    pub fn host_count(&self) -> usize {
        self.entries.iter().filter(|p| p.is_host).count()
    }

    /// Position of `id` in join order.
    #[must_use]
    pub fn position(&self, id: &ParticipantId) -> Option<usize> {
        self.entries.iter().position(|p| &p.id == id)
    }

    /// Appends a participant. Returns `false` if the id was already present.
    ///
    /// # Errors
    /// `MultipleHosts` when `p` claims host while another entry holds it.
    pub fn add(&mut self, p: Participant) -> Result<bool, RosterError> {
        if self.contains(&p.id) {
            return Ok(false);
        }
        if p.is_host && self.host().is_some() {
            return Err(RosterError::MultipleHosts(self.host_count() + 1));
        }
        self.entries.push(p);
        self.debug_check();
        Ok(true)
    }

    /// Removes a remote participant.
    ///
    /// # Errors
    /// `LocalEntry` for the local participant.
    pub fn remove(&mut self, id: &ParticipantId) -> Result<Option<Participant>, RosterError> {
        if id == &self.local_id {
            return Err(RosterError::LocalEntry);
        }
        Ok(self
            .position(id)
            .map(|idx| self.entries.remove(idx)))
    }

    /// Returns whether the flag changed.
    ///
    /// # Errors
    /// `UnknownParticipant`.
    pub fn set_muted(&mut self, id: &ParticipantId, muted: bool) -> Result<bool, RosterError> {
        let p = self.get_mut(id)?;
        let changed = p.is_muted != muted;
        p.is_muted = muted;
        Ok(changed)
    }

    /// Returns whether the flag changed.
    ///
    /// # Errors
    /// `UnknownParticipant`.
    pub fn set_hand_raised(
        &mut self,
        id: &ParticipantId,
        raised: bool,
    ) -> Result<bool, RosterError> {
        let p = self.get_mut(id)?;
        let changed = p.hand_raised != raised;
        p.hand_raised = raised;
        Ok(changed)
    }

    /// Replaces the whole roster with `snapshot`.
    ///
    /// Duplicate ids keep their first occurrence. If the snapshot omits the
    /// local participant, its current entry is appended. Returns whether the
    /// content changed.
    ///
    /// # Errors
    /// `MultipleHosts`; the roster is left untouched.
    pub fn replace(&mut self, snapshot: Vec<Participant>) -> Result<bool, RosterError> {
        let mut next: Vec<Participant> = Vec::with_capacity(snapshot.len() + 1);
        for p in snapshot {
            if !next.iter().any(|q| q.id == p.id) {
                next.push(p);
            }
        }
        if !next.iter().any(|p| p.id == self.local_id) {
            if let Some(local) = self.local().cloned() {
                next.push(Participant {
                    is_host: false,
                    ..local
                });
            }
        }
        let hosts = next.iter().filter(|p| p.is_host).count();
        if hosts > 1 {
            return Err(RosterError::MultipleHosts(hosts));
        }
        let changed = next != self.entries;
        self.entries = next;
        Ok(changed)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Participant> {
        self.entries.clone()
    }

    /// Applies a message received from a peer and reports what the session
    /// has to do about it.
    ///
    /// Host-only messages (snapshots and moderation commands) are ignored when
    /// `local_is_host`: only the host emits them. Self-reported flags
    /// (`HandRaise`, `MuteStatus`) about the local participant are ignored
    /// since the local side owns them.
    ///
    /// # Errors
    /// `MultipleHosts` for a snapshot that would break the single-host invariant.
    pub fn apply_remote(
        &mut self,
        msg: &ControlMessage,
        local_is_host: bool,
    ) -> Result<Vec<RosterEffect>, RosterError> {
        use RosterEffect::{
            Changed, Ignored, LocalHandLowered, LocalRemoved, PeerRemoved, SilenceLocalAudio,
        };

        if local_is_host && msg.is_host_only() {
            return Ok(vec![Ignored("host-only message received by the host")]);
        }

        let effects = match msg {
            ControlMessage::Chat(_) | ControlMessage::Unknown { .. } => {
                vec![Ignored("not a roster message")]
            }
            ControlMessage::RosterSnapshot(entries) => {
                if self.replace(entries.clone())? {
                    vec![Changed]
                } else {
                    Vec::new()
                }
            }
            ControlMessage::HandRaise {
                participant,
                raised,
            } => self.apply_self_reported(participant, |r, id| r.set_hand_raised(id, *raised)),
            ControlMessage::MuteStatus { participant, muted } => {
                self.apply_self_reported(participant, |r, id| r.set_muted(id, *muted))
            }
            ControlMessage::MuteCommand { participant } => match self.set_muted(participant, true) {
                Err(_) => vec![Ignored("mute for unknown participant")],
                Ok(changed) => {
                    let mut out = Vec::new();
                    if changed {
                        out.push(Changed);
                    }
                    if participant == &self.local_id {
                        out.push(SilenceLocalAudio);
                    }
                    out
                }
            },
            ControlMessage::LowerHandCommand { participant } => {
                match self.set_hand_raised(participant, false) {
                    Err(_) => vec![Ignored("lower hand for unknown participant")],
                    Ok(changed) => {
                        let mut out = Vec::new();
                        if changed {
                            out.push(Changed);
                        }
                        if participant == &self.local_id {
                            out.push(LocalHandLowered);
                        }
                        out
                    }
                }
            }
            ControlMessage::RemoveCommand { participant } => {
                if participant == &self.local_id {
                    vec![LocalRemoved]
                } else {
                    match self.remove(participant)? {
                        Some(_) => vec![Changed, PeerRemoved(participant.clone())],
                        None => vec![PeerRemoved(participant.clone())],
                    }
                }
            }
        };
        Ok(effects)
    }

    fn apply_self_reported<F>(&mut self, participant: &ParticipantId, set: F) -> Vec<RosterEffect>
    where
        F: FnOnce(&mut Self, &ParticipantId) -> Result<bool, RosterError>,
    {
        if participant == &self.local_id {
            return vec![RosterEffect::Ignored("peer reported a local flag")];
        }
        match set(self, participant) {
            Ok(true) => vec![RosterEffect::Changed],
            Ok(false) => Vec::new(),
            Err(_) => vec![RosterEffect::Ignored("flag for unknown participant")],
        }
    }

    fn debug_check(&self) {
        debug_assert!(self.host_count() <= 1, "roster holds more than one host");
        debug_assert!(self.contains(&self.local_id), "local participant missing");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn guest_roster() -> Roster {
        let mut r = Roster::new(Participant::new(pid("P"), "Pat"));
        r.replace(vec![
            Participant::host(pid("H"), "Hal"),
            Participant::new(pid("P"), "Pat"),
        ])
        .unwrap();
        r
    }

    #[test]
    fn snapshot_replacement_is_idempotent() {
        let mut r = Roster::new(Participant::new(pid("P"), "Pat"));
        let snap = vec![
            Participant::host(pid("H"), "Hal"),
            Participant::new(pid("P"), "Pat"),
            Participant::new(pid("Q"), "Quin"),
        ];
        let msg = ControlMessage::RosterSnapshot(snap.clone());
        assert_eq!(r.apply_remote(&msg, false).unwrap(), vec![RosterEffect::Changed]);
        let once = r.clone();
        assert!(r.apply_remote(&msg, false).unwrap().is_empty());
        assert_eq!(r, once);
        assert_eq!(r.entries(), snap.as_slice());
        assert_eq!(r.host_count(), 1);
    }

    #[test]
    fn snapshot_without_local_keeps_local_entry() {
        let mut r = Roster::new(Participant::new(pid("P"), "Pat"));
        r.replace(vec![Participant::host(pid("H"), "Hal")]).unwrap();
        let ids: Vec<&str> = r.entries().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["H", "P"]);
    }

    #[test]
    fn snapshot_with_two_hosts_is_rejected() {
        let mut r = guest_roster();
        let before = r.clone();
        let bad = vec![
            Participant::host(pid("H"), "Hal"),
            Participant::host(pid("X"), "Xen"),
        ];
        assert_eq!(r.replace(bad), Err(RosterError::MultipleHosts(2)));
        assert_eq!(r, before);
    }

    #[test]
    fn mute_command_on_guest_silences_local_audio() {
        let mut r = guest_roster();
        let msg = ControlMessage::MuteCommand {
            participant: pid("P"),
        };
        assert_eq!(
            r.apply_remote(&msg, false).unwrap(),
            vec![RosterEffect::Changed, RosterEffect::SilenceLocalAudio]
        );
        assert!(r.local().unwrap().is_muted);
        // Already muted: still silence, no roster change.
        assert_eq!(
            r.apply_remote(&msg, false).unwrap(),
            vec![RosterEffect::SilenceLocalAudio]
        );
    }

    #[test]
    fn host_ignores_host_only_messages() {
        let mut r = Roster::new(Participant::host(pid("H"), "Hal"));
        r.add(Participant::new(pid("P"), "Pat")).unwrap();
        let before = r.clone();
        for msg in [
            ControlMessage::MuteCommand {
                participant: pid("P"),
            },
            ControlMessage::RemoveCommand {
                participant: pid("P"),
            },
            ControlMessage::RosterSnapshot(Vec::new()),
        ] {
            let effects = r.apply_remote(&msg, true).unwrap();
            assert!(matches!(effects.as_slice(), [RosterEffect::Ignored(_)]));
        }
        assert_eq!(r, before);
    }

    #[test]
    fn hand_raise_updates_only_that_participant() {
        let mut r = guest_roster();
        let msg = ControlMessage::HandRaise {
            participant: pid("H"),
            raised: true,
        };
        assert_eq!(r.apply_remote(&msg, false).unwrap(), vec![RosterEffect::Changed]);
        assert!(r.get(&pid("H")).unwrap().hand_raised);
        assert!(!r.local().unwrap().hand_raised);

        let about_me = ControlMessage::HandRaise {
            participant: pid("P"),
            raised: true,
        };
        assert!(matches!(
            r.apply_remote(&about_me, false).unwrap().as_slice(),
            [RosterEffect::Ignored(_)]
        ));
    }

    #[test]
    fn remove_command_reports_peer_or_local_removal() {
        let mut r = guest_roster();
        r.add(Participant::new(pid("Q"), "Quin")).unwrap();
        assert_eq!(
            r.apply_remote(
                &ControlMessage::RemoveCommand {
                    participant: pid("Q")
                },
                false
            )
            .unwrap(),
            vec![RosterEffect::Changed, RosterEffect::PeerRemoved(pid("Q"))]
        );
        assert!(!r.contains(&pid("Q")));
        assert_eq!(
            r.apply_remote(
                &ControlMessage::RemoveCommand {
                    participant: pid("P")
                },
                false
            )
            .unwrap(),
            vec![RosterEffect::LocalRemoved]
        );
        assert!(r.contains(&pid("P")));
    }

    #[test]
    fn lower_hand_command_targets_local() {
        let mut r = guest_roster();
        r.set_hand_raised(&pid("P"), true).unwrap();
        assert_eq!(
            r.apply_remote(
                &ControlMessage::LowerHandCommand {
                    participant: pid("P")
                },
                false
            )
            .unwrap(),
            vec![RosterEffect::Changed, RosterEffect::LocalHandLowered]
        );
        assert!(!r.local().unwrap().hand_raised);
    }

    #[test]
    fn add_refuses_second_host_and_local_removal() {
        let mut r = Roster::new(Participant::host(pid("H"), "Hal"));
        assert_eq!(
            r.add(Participant::host(pid("X"), "Xen")),
            Err(RosterError::MultipleHosts(2))
        );
        assert_eq!(r.add(Participant::new(pid("P"), "Pat")), Ok(true));
        assert_eq!(r.add(Participant::new(pid("P"), "Pat")), Ok(false));
        assert_eq!(r.remove(&pid("H")), Err(RosterError::LocalEntry));
        assert_eq!(r.remove(&pid("P")).unwrap().unwrap().display_name, "Pat");
    }
}
