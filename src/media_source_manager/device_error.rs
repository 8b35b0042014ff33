use std::fmt;

use crate::media_source_manager::track::TrackKind;

/// Capture failures. Always recoverable: the call continues without that source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    PermissionDenied(TrackKind),
    DeviceUnavailable(String),
    DeviceBusy(String),
    Unsupported(TrackKind),
    Backend(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DeviceError::{Backend, DeviceBusy, DeviceUnavailable, PermissionDenied, Unsupported};
        match self {
            PermissionDenied(kind) => write!(f, "permission denied for {kind}"),
            DeviceUnavailable(id) => write!(f, "device unavailable: {id}"),
            DeviceBusy(id) => write!(f, "device busy: {id}"),
            Unsupported(kind) => write!(f, "{kind} capture not supported by this backend"),
            Backend(msg) => write!(f, "device backend error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}
