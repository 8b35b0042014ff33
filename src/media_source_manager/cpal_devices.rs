use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use cpal::traits::{DeviceTrait, HostTrait};

use crate::media_source_manager::{
    device_error::DeviceError,
    devices::{DeviceDescriptor, MediaDevices},
    track::{Track, TrackKind},
};

/// Microphones from the default `cpal` host. Cameras and screens are not
/// available through this backend.
///
/// Acquisition validates the device and its input configuration and holds it
/// exclusively; sample capture itself belongs to the media pipeline.
#[derive(Default)]
pub struct CpalDevices {
    held: Arc<Mutex<HashSet<String>>>,
}

impl CpalDevices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn input_devices() -> Result<Vec<(String, cpal::Device)>, DeviceError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| DeviceError::Backend(format!("enumerating input devices: {e}")))?;
        Ok(devices
            .filter_map(|d| d.name().ok().map(|name| (name, d)))
            .collect())
    }
}

impl MediaDevices for CpalDevices {
    fn list(&self, kind: TrackKind) -> Result<Vec<DeviceDescriptor>, DeviceError> {
        if kind != TrackKind::Microphone {
            return Err(DeviceError::Unsupported(kind));
        }
        Ok(Self::input_devices()?
            .into_iter()
            .map(|(name, _)| DeviceDescriptor {
                id: name.clone(),
                label: name,
                kind,
            })
            .collect())
    }

    fn acquire(
        &mut self,
        kind: TrackKind,
        device_id: Option<&str>,
    ) -> Result<Track, DeviceError> {
        if kind != TrackKind::Microphone {
            return Err(DeviceError::Unsupported(kind));
        }
        let (name, device) = match device_id {
            Some(id) => Self::input_devices()?
                .into_iter()
                .find(|(name, _)| name == id)
                .ok_or_else(|| DeviceError::DeviceUnavailable(id.to_owned()))?,
            None => {
                let device = cpal::default_host()
                    .default_input_device()
                    .ok_or_else(|| DeviceError::DeviceUnavailable("default".into()))?;
                let name = device
                    .name()
                    .map_err(|e| DeviceError::Backend(e.to_string()))?;
                (name, device)
            }
        };
        device
            .default_input_config()
            .map_err(|e| DeviceError::DeviceUnavailable(format!("{name}: {e}")))?;

        {
            let mut held = self
                .held
                .lock()
                .map_err(|_| DeviceError::Backend("device registry poisoned".into()))?;
            if !held.insert(name.clone()) {
                return Err(DeviceError::DeviceBusy(name));
            }
        }

        let held = Arc::clone(&self.held);
        let held_name = name.clone();
        Ok(Track::new(
            kind,
            name.clone(),
            name,
            Some(Box::new(move || {
                if let Ok(mut h) = held.lock() {
                    h.remove(&held_name);
                }
            })),
        ))
    }
}
