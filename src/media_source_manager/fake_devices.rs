use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use crate::media_source_manager::{
    device_error::DeviceError,
    devices::{DeviceDescriptor, MediaDevices},
    track::{Track, TrackKind},
};

#[derive(Default)]
struct FakeState {
    devices: Vec<DeviceDescriptor>,
    held: HashSet<String>,
    denied: HashSet<TrackKind>,
    active_screen: Option<Track>,
    acquisitions: usize,
}

/// Deterministic device backend for tests and the loopback demo.
///
/// Devices are exclusive: acquiring a device that a live track still holds
/// fails with `DeviceBusy`. Clones share state, so a test can keep one clone
/// to inject failures while the session owns another.
#[derive(Clone)]
pub struct FakeDevices {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDevices {
    #[must_use]
    pub fn new() -> Self {
        let d = |id: &str, label: &str, kind| DeviceDescriptor {
            id: id.into(),
            label: label.into(),
            kind,
        };
        let state = FakeState {
            devices: vec![
                d("cam-0", "Integrated Camera", TrackKind::Camera),
                d("cam-1", "USB Camera", TrackKind::Camera),
                d("mic-0", "Built-in Microphone", TrackKind::Microphone),
                d("mic-1", "Headset Microphone", TrackKind::Microphone),
                d("screen-0", "Entire Screen", TrackKind::Screen),
            ],
            ..FakeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Makes every later `acquire`/`list` of `kind` fail with `PermissionDenied`.
    pub fn deny(&self, kind: TrackKind) {
        if let Ok(mut s) = self.state.lock() {
            s.denied.insert(kind);
        }
    }

    pub fn allow(&self, kind: TrackKind) {
        if let Ok(mut s) = self.state.lock() {
            s.denied.remove(&kind);
        }
    }

    /// Simulates the OS or user ending the current screen capture.
    /// Returns `false` when nothing was being captured.
    pub fn end_active_screen_capture(&self) -> bool {
        let track = self.state.lock().ok().and_then(|mut s| s.active_screen.take());
        match track {
            Some(t) if !t.is_ended() => {
                t.end();
                true
            }
            _ => false,
        }
    }

    /// Ids of devices currently held by live tracks, sorted.
    #[must_use]
    pub fn held_devices(&self) -> Vec<String> {
        let mut held: Vec<String> = self
            .state
            .lock()
            .map(|s| s.held.iter().cloned().collect())
            .unwrap_or_default();
        held.sort();
        held
    }

    /// Total successful acquisitions so far.
    #[must_use]
    pub fn acquisitions(&self) -> usize {
        self.state.lock().map(|s| s.acquisitions).unwrap_or(0)
    }
}

impl MediaDevices for FakeDevices {
    fn list(&self, kind: TrackKind) -> Result<Vec<DeviceDescriptor>, DeviceError> {
        let s = self
            .state
            .lock()
            .map_err(|_| DeviceError::Backend("fake device state poisoned".into()))?;
        if s.denied.contains(&kind) {
            return Err(DeviceError::PermissionDenied(kind));
        }
        Ok(s.devices.iter().filter(|d| d.kind == kind).cloned().collect())
    }

    fn acquire(
        &mut self,
        kind: TrackKind,
        device_id: Option<&str>,
    ) -> Result<Track, DeviceError> {
        let mut s = self
            .state
            .lock()
            .map_err(|_| DeviceError::Backend("fake device state poisoned".into()))?;
        if s.denied.contains(&kind) {
            return Err(DeviceError::PermissionDenied(kind));
        }
        let desc = s
            .devices
            .iter()
            .find(|d| d.kind == kind && device_id.is_none_or(|id| d.id == id))
            .cloned()
            .ok_or_else(|| {
                DeviceError::DeviceUnavailable(device_id.unwrap_or("default").to_owned())
            })?;
        if s.held.contains(&desc.id) {
            return Err(DeviceError::DeviceBusy(desc.id));
        }
        s.held.insert(desc.id.clone());
        s.acquisitions += 1;

        let state = Arc::clone(&self.state);
        let held_id = desc.id.clone();
        let track = Track::new(
            kind,
            desc.id,
            desc.label,
            Some(Box::new(move || {
                if let Ok(mut s) = state.lock() {
                    s.held.remove(&held_id);
                }
            })),
        );
        let previous = if kind == TrackKind::Screen {
            s.active_screen.replace(track.clone())
        } else {
            None
        };
        // A stale handle may run its release hook, which takes this lock.
        drop(s);
        drop(previous);
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn lists_devices_per_kind() {
        let devices = FakeDevices::new();
        let cams = devices.list(TrackKind::Camera).unwrap();
        assert_eq!(cams.len(), 2);
        assert_eq!(devices.list(TrackKind::Screen).unwrap().len(), 1);
    }

    #[test]
    fn devices_are_exclusive_until_stopped() {
        let mut devices = FakeDevices::new();
        let mic = devices.acquire(TrackKind::Microphone, None).unwrap();
        assert_eq!(mic.device_id(), "mic-0");
        assert_eq!(
            devices.acquire(TrackKind::Microphone, Some("mic-0")).err(),
            Some(DeviceError::DeviceBusy("mic-0".into()))
        );
        let other = devices.acquire(TrackKind::Microphone, Some("mic-1")).unwrap();
        assert_eq!(devices.held_devices(), vec!["mic-0", "mic-1"]);
        mic.stop();
        other.stop();
        assert!(devices.held_devices().is_empty());
        assert!(devices.acquire(TrackKind::Microphone, Some("mic-0")).is_ok());
    }

    #[test]
    fn unknown_device_and_denied_kind() {
        let mut devices = FakeDevices::new();
        assert_eq!(
            devices.acquire(TrackKind::Camera, Some("cam-9")).err(),
            Some(DeviceError::DeviceUnavailable("cam-9".into()))
        );
        devices.deny(TrackKind::Camera);
        assert_eq!(
            devices.acquire(TrackKind::Camera, None).err(),
            Some(DeviceError::PermissionDenied(TrackKind::Camera))
        );
        devices.allow(TrackKind::Camera);
        assert!(devices.acquire(TrackKind::Camera, None).is_ok());
    }

    #[test]
    fn ending_screen_capture_fires_callback_and_frees_device() {
        let mut devices = FakeDevices::new();
        let screen = devices.acquire(TrackKind::Screen, None).unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&fired);
        screen.set_on_ended(move || f.store(true, Ordering::SeqCst));

        assert!(devices.end_active_screen_capture());
        assert!(fired.load(Ordering::SeqCst));
        assert!(screen.is_ended());
        assert!(devices.held_devices().is_empty());
        assert!(!devices.end_active_screen_capture());
    }
}
