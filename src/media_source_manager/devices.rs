use crate::media_source_manager::{
    device_error::DeviceError,
    track::{Track, TrackKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub label: String,
    pub kind: TrackKind,
}

/// Access to capture devices.
pub trait MediaDevices: Send {
    /// # Errors
    /// `PermissionDenied` or `Unsupported` when the kind cannot be enumerated.
    fn list(&self, kind: TrackKind) -> Result<Vec<DeviceDescriptor>, DeviceError>;

    /// Opens `device_id`, or the default device of `kind` when `None`.
    /// The returned track holds the device until stopped or dropped.
    ///
    /// # Errors
    /// `PermissionDenied`, `DeviceUnavailable`, `DeviceBusy` or `Unsupported`.
    fn acquire(&mut self, kind: TrackKind, device_id: Option<&str>)
    -> Result<Track, DeviceError>;
}
