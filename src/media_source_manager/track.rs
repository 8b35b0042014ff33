use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u64);

impl TrackId {
    fn next() -> Self {
        Self(NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Capture source a track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Camera,
    Microphone,
    Screen,
}

impl TrackKind {
    #[must_use]
    pub const fn media_kind(self) -> MediaKind {
        match self {
            Self::Camera | Self::Screen => MediaKind::Video,
            Self::Microphone => MediaKind::Audio,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Microphone => write!(f, "microphone"),
            Self::Screen => write!(f, "screen"),
        }
    }
}

/// Kind of outbound sender slot on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

struct TrackInner {
    id: TrackId,
    kind: TrackKind,
    device_id: String,
    label: String,
    enabled: AtomicBool,
    ended: AtomicBool,
    /// Frees the capture device. Runs exactly once.
    release: Mutex<Option<Hook>>,
    /// Fired only when capture is ended out-of-band.
    on_ended: Mutex<Option<Hook>>,
}

impl TrackInner {
    fn run_release(&self) {
        let hook = self.release.lock().ok().and_then(|mut g| g.take());
        if let Some(f) = hook {
            f();
        }
    }
}

impl Drop for TrackInner {
    fn drop(&mut self) {
        self.run_release();
    }
}

/// Cloneable handle to one live capture.
///
/// Clones share state: disabling a track through any clone (including the one
/// installed on a connection's media sender) is visible through all of them.
#[derive(Clone)]
pub struct Track {
    inner: Arc<TrackInner>,
}

impl Track {
    /// Creates a track. `release` is invoked once, when the track is stopped,
    /// ended, or its last handle is dropped.
    pub fn new(
        kind: TrackKind,
        device_id: impl Into<String>,
        label: impl Into<String>,
        release: Option<Box<dyn FnOnce() + Send>>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: TrackId::next(),
                kind,
                device_id: device_id.into(),
                label: label.into(),
                enabled: AtomicBool::new(true),
                ended: AtomicBool::new(false),
                release: Mutex::new(release),
                on_ended: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> TrackId {
        self.inner.id
    }

    #[must_use]
    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::SeqCst)
    }

    /// Registers the callback fired by [`Track::end`]. Replaces any previous one.
    pub fn set_on_ended<F: FnOnce() + Send + 'static>(&self, f: F) {
        if let Ok(mut slot) = self.inner.on_ended.lock() {
            *slot = Some(Box::new(f));
        }
    }

    /// Local release. Frees the device and never fires the ended callback.
    pub fn stop(&self) {
        if self.inner.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut slot) = self.inner.on_ended.lock() {
            slot.take();
        }
        self.inner.run_release();
    }

    /// Capture ended out-of-band (device unplugged, OS stopped the share).
    pub fn end(&self) {
        if self.inner.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.run_release();
        let hook = self.inner.on_ended.lock().ok().and_then(|mut g| g.take());
        if let Some(f) = hook {
            f();
        }
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Track {}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("device_id", &self.inner.device_id)
            .field("enabled", &self.is_enabled())
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_track(kind: TrackKind) -> (Track, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let ended = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&released);
        let track = Track::new(
            kind,
            "dev",
            "Device",
            Some(Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            })),
        );
        let e = Arc::clone(&ended);
        track.set_on_ended(move || {
            e.fetch_add(1, Ordering::SeqCst);
        });
        (track, released, ended)
    }

    #[test]
    fn stop_releases_without_firing_ended() {
        let (track, released, ended) = counting_track(TrackKind::Camera);
        track.stop();
        track.stop();
        assert!(track.is_ended());
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(ended.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn end_fires_callback_once() {
        let (track, released, ended) = counting_track(TrackKind::Screen);
        track.end();
        track.end();
        track.stop();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_last_handle_releases() {
        let (track, released, _) = counting_track(TrackKind::Microphone);
        let clone = track.clone();
        drop(track);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(clone);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn enabled_flag_is_shared_by_clones() {
        let (track, _, _) = counting_track(TrackKind::Microphone);
        let remote_view = track.clone();
        track.set_enabled(false);
        assert!(!remote_view.is_enabled());
        assert_eq!(track.kind().media_kind(), MediaKind::Audio);
    }
}
