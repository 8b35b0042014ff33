//! Tagged control messages and their binary frame format.
pub mod codec;
pub mod errors;
pub mod message;
pub mod msg_kind;
pub use codec::{decode, encode};
pub use errors::MalformedMessage;
pub use message::{ChatMessage, ControlMessage};
pub use msg_kind::{MsgKind, PROTOCOL_VERSION};
