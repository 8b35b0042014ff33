//! Local capture sources and the tracks sent on every connection.
#[cfg(feature = "cpal-devices")]
pub mod cpal_devices;
pub mod device_error;
pub mod devices;
pub mod fake_devices;
pub mod media_source_manager;
pub mod track;
#[cfg(feature = "cpal-devices")]
pub use cpal_devices::CpalDevices;
pub use device_error::DeviceError;
pub use devices::{DeviceDescriptor, MediaDevices};
pub use fake_devices::FakeDevices;
pub use media_source_manager::MediaSourceManager;
pub use track::{MediaKind, Track, TrackId, TrackKind};
