use std::sync::{Arc, mpsc::Sender};

use crate::{
    connection_manager::connection::Connection,
    core::events::EngineInput,
    log::LogSink,
    media_source_manager::{
        device_error::DeviceError,
        devices::{DeviceDescriptor, MediaDevices},
        track::{MediaKind, Track, TrackId, TrackKind},
    },
    sink_debug, sink_info, sink_warn,
};

/// Owns the local capture handles (microphone, camera, screen) and decides
/// which track each outbound sender should carry.
///
/// Only one handle per kind is ever held. Replacing a source releases the old
/// handle before the new device is opened.
pub struct MediaSourceManager {
    devices: Box<dyn MediaDevices>,
    /// Where out-of-band track endings are reported.
    events_tx: Sender<EngineInput>,
    logger: Arc<dyn LogSink>,
    microphone: Option<Track>,
    camera: Option<Track>,
    screen: Option<Track>,
    audio_enabled: bool,
    video_enabled: bool,
}

impl MediaSourceManager {
    pub fn new(
        devices: Box<dyn MediaDevices>,
        events_tx: Sender<EngineInput>,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            devices,
            events_tx,
            logger,
            microphone: None,
            camera: None,
            screen: None,
            audio_enabled: true,
            video_enabled: true,
        }
    }

    fn slot_mut(&mut self, kind: TrackKind) -> &mut Option<Track> {
        match kind {
            TrackKind::Microphone => &mut self.microphone,
            TrackKind::Camera => &mut self.camera,
            TrackKind::Screen => &mut self.screen,
        }
    }

    #[must_use]
    pub fn track(&self, kind: TrackKind) -> Option<&Track> {
        match kind {
            TrackKind::Microphone => self.microphone.as_ref(),
            TrackKind::Camera => self.camera.as_ref(),
            TrackKind::Screen => self.screen.as_ref(),
        }
    }

    /// Opens a capture of `kind` and makes it the active source of that kind.
    /// Any previous handle of the same kind is released first.
    ///
    /// # Errors
    /// The backend's `DeviceError`; the slot is then left empty.
    pub fn acquire(
        &mut self,
        kind: TrackKind,
        device_id: Option<&str>,
    ) -> Result<Track, DeviceError> {
        self.release(kind);
        let track = match self.devices.acquire(kind, device_id) {
            Ok(t) => t,
            Err(e) => {
                sink_warn!(self.logger, "[media] {kind} acquisition failed: {e}");
                return Err(e);
            }
        };
        track.set_enabled(match kind {
            TrackKind::Microphone => self.audio_enabled,
            TrackKind::Camera => self.video_enabled,
            TrackKind::Screen => true,
        });

        let tx = self.events_tx.clone();
        let id = track.id();
        track.set_on_ended(move || {
            let _ = tx.send(EngineInput::TrackEnded { track: id, kind });
        });

        sink_info!(
            self.logger,
            "[media] acquired {kind} {} ({})",
            track.device_id(),
            track.id()
        );
        *self.slot_mut(kind) = Some(track.clone());
        Ok(track)
    }

    /// Stops and forgets the active source of `kind`. Returns whether one existed.
    pub fn release(&mut self, kind: TrackKind) -> bool {
        match self.slot_mut(kind).take() {
            Some(track) => {
                track.stop();
                sink_debug!(self.logger, "[media] released {kind} {}", track.device_id());
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        for kind in [TrackKind::Screen, TrackKind::Camera, TrackKind::Microphone] {
            self.release(kind);
        }
    }

    /// Moves the camera or microphone to another device.
    ///
    /// The old handle is released before the new one is opened. If the new
    /// device cannot be opened the previous device is reopened when possible
    /// and the original error is still returned.
    ///
    /// # Errors
    /// `Unsupported` for screens, otherwise the backend's `DeviceError`.
    pub fn switch_device(&mut self, kind: TrackKind, device_id: &str) -> Result<Track, DeviceError> {
        if kind == TrackKind::Screen {
            return Err(DeviceError::Unsupported(kind));
        }
        let previous = self.track(kind).map(|t| t.device_id().to_owned());
        match self.acquire(kind, Some(device_id)) {
            Ok(track) => Ok(track),
            Err(e) => {
                if let Some(prev) = previous {
                    if self.acquire(kind, Some(&prev)).is_ok() {
                        sink_info!(self.logger, "[media] kept {kind} on {prev}");
                    }
                }
                Err(e)
            }
        }
    }

    /// # Errors
    /// The backend's `DeviceError`.
    pub fn list_devices(&self, kind: TrackKind) -> Result<Vec<DeviceDescriptor>, DeviceError> {
        self.devices.list(kind)
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
        if let Some(mic) = &self.microphone {
            mic.set_enabled(enabled);
        }
    }

    #[must_use]
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn set_video_enabled(&mut self, enabled: bool) {
        self.video_enabled = enabled;
        if let Some(cam) = &self.camera {
            cam.set_enabled(enabled);
        }
    }

    #[must_use]
    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    /// # Errors
    /// The backend's `DeviceError`; the camera keeps being sent.
    pub fn start_screen_share(&mut self) -> Result<Track, DeviceError> {
        self.acquire(TrackKind::Screen, None)
    }

    pub fn stop_screen_share(&mut self) -> bool {
        self.release(TrackKind::Screen)
    }

    #[must_use]
    pub fn is_screen_sharing(&self) -> bool {
        self.screen.is_some()
    }

    /// Handles an out-of-band end reported through [`EngineInput::TrackEnded`].
    ///
    /// Returns the kind whose active source just went away, or `None` when the
    /// report is about a track that was already replaced or released.
    pub fn on_track_ended(&mut self, id: TrackId) -> Option<TrackKind> {
        let kind = [TrackKind::Screen, TrackKind::Camera, TrackKind::Microphone]
            .into_iter()
            .find(|k| self.track(*k).is_some_and(|t| t.id() == id))?;
        self.slot_mut(kind).take();
        sink_info!(self.logger, "[media] {kind} capture ended ({id})");
        Some(kind)
    }

    #[must_use]
    pub fn outbound_audio(&self) -> Option<Track> {
        self.microphone.clone()
    }

    /// Screen capture takes the video sender while it is active.
    #[must_use]
    pub fn outbound_video(&self) -> Option<Track> {
        self.screen.clone().or_else(|| self.camera.clone())
    }

    #[must_use]
    pub fn outbound(&self, kind: MediaKind) -> Option<Track> {
        match kind {
            MediaKind::Audio => self.outbound_audio(),
            MediaKind::Video => self.outbound_video(),
        }
    }

    /// Points `connection`'s sender for `kind` at `track` without renegotiating.
    /// Returns whether the sender changed.
    pub fn replace(connection: &Connection, kind: MediaKind, track: Option<Track>) -> bool {
        connection.replace_track(kind, track)
    }
}

impl Drop for MediaSourceManager {
    fn drop(&mut self) {
        self.release_all();
    }
}
