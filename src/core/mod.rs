//! Session orchestration: the single owner of roster, connections and media.
pub mod constants;
pub mod events;
pub mod session;
pub mod session_error;
pub use events::{EngineInput, SessionEvent};
pub use session::{CallSession, MediaRequest, SessionState};
pub use session_error::SessionError;
