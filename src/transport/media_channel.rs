use std::sync::{Arc, Mutex};

use crate::media_source_manager::track::{MediaKind, Track};

#[derive(Debug, Default)]
struct MediaSlot {
    track: Option<Track>,
    generation: u64,
}

/// Outbound sender for one media kind. Replacing its track keeps the
/// connection and this sender intact.
#[derive(Debug)]
pub struct MediaSender {
    kind: MediaKind,
    slot: Arc<Mutex<MediaSlot>>,
}

impl MediaSender {
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Starts sending `track` (or nothing) in place of the current one.
    /// Returns `false` when the same track was already installed.
    pub fn replace_track(&self, track: Option<Track>) -> bool {
        let Ok(mut slot) = self.slot.lock() else {
            return false;
        };
        if slot.track == track {
            return false;
        }
        slot.track = track;
        slot.generation = slot.generation.wrapping_add(1);
        true
    }

    #[must_use]
    pub fn track(&self) -> Option<Track> {
        self.slot.lock().ok().and_then(|s| s.track.clone())
    }
}

/// The peer's view of a [`MediaSender`].
#[derive(Debug, Clone)]
pub struct MediaReceiver {
    kind: MediaKind,
    slot: Arc<Mutex<MediaSlot>>,
}

impl MediaReceiver {
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    #[must_use]
    pub fn track(&self) -> Option<Track> {
        self.slot.lock().ok().and_then(|s| s.track.clone())
    }

    /// True while a live, enabled track is being sent.
    #[must_use]
    pub fn is_receiving(&self) -> bool {
        self.track()
            .is_some_and(|t| t.is_enabled() && !t.is_ended())
    }

    /// Number of track replacements seen on this slot.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slot.lock().map(|s| s.generation).unwrap_or(0)
    }
}

/// Media sub-channel of one endpoint: our senders and the peer's.
#[derive(Debug)]
pub struct MediaChannel {
    pub audio: MediaSender,
    pub video: MediaSender,
    pub remote_audio: MediaReceiver,
    pub remote_video: MediaReceiver,
}

impl MediaChannel {
    #[must_use]
    pub fn sender(&self, kind: MediaKind) -> &MediaSender {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }

    #[must_use]
    pub fn receiver(&self, kind: MediaKind) -> &MediaReceiver {
        match kind {
            MediaKind::Audio => &self.remote_audio,
            MediaKind::Video => &self.remote_video,
        }
    }

    /// Stops sending on both slots.
    pub fn clear(&self) {
        self.audio.replace_track(None);
        self.video.replace_track(None);
    }
}

fn slot(kind: MediaKind) -> (MediaSender, MediaReceiver) {
    let slot = Arc::new(Mutex::new(MediaSlot::default()));
    (
        MediaSender {
            kind,
            slot: Arc::clone(&slot),
        },
        MediaReceiver { kind, slot },
    )
}

/// Two mirrored media sub-channels: what `a` sends, `b` receives and vice versa.
pub(super) fn pair() -> (MediaChannel, MediaChannel) {
    let (a_audio, b_remote_audio) = slot(MediaKind::Audio);
    let (a_video, b_remote_video) = slot(MediaKind::Video);
    let (b_audio, a_remote_audio) = slot(MediaKind::Audio);
    let (b_video, a_remote_video) = slot(MediaKind::Video);
    (
        MediaChannel {
            audio: a_audio,
            video: a_video,
            remote_audio: a_remote_audio,
            remote_video: a_remote_video,
        },
        MediaChannel {
            audio: b_audio,
            video: b_video,
            remote_audio: b_remote_audio,
            remote_video: b_remote_video,
        },
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::media_source_manager::track::TrackKind;

    #[test]
    fn replacement_is_visible_to_peer_without_new_channel() {
        let (a, b) = pair();
        let cam = Track::new(TrackKind::Camera, "cam-0", "Camera", None);
        let screen = Track::new(TrackKind::Screen, "screen-0", "Screen", None);

        assert!(a.video.replace_track(Some(cam.clone())));
        assert_eq!(b.remote_video.track(), Some(cam.clone()));
        assert!(!a.video.replace_track(Some(cam)));
        assert_eq!(b.remote_video.generation(), 1);

        assert!(a.video.replace_track(Some(screen.clone())));
        assert_eq!(b.remote_video.track(), Some(screen));
        assert_eq!(b.remote_video.generation(), 2);
        assert!(b.remote_audio.track().is_none());
    }

    #[test]
    fn receiver_sees_disabled_track() {
        let (a, b) = pair();
        let mic = Track::new(TrackKind::Microphone, "mic-0", "Mic", None);
        a.audio.replace_track(Some(mic.clone()));
        assert!(b.remote_audio.is_receiving());
        mic.set_enabled(false);
        assert!(!b.remote_audio.is_receiving());
        a.clear();
        assert!(b.remote_audio.track().is_none());
    }
}
