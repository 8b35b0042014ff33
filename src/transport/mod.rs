//! Media and control sub-channels of one connection.
pub mod control_channel;
pub mod media_channel;
pub mod transport;
pub mod transport_error;
pub use control_channel::{ControlChannel, ControlReceiver, ControlSender};
pub use media_channel::{MediaChannel, MediaReceiver, MediaSender};
pub use transport::Transport;
pub use transport_error::TransportError;
