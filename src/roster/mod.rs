//! Replicated participant roster with host authority.
pub mod participant;
pub mod roster;
pub mod roster_effect;
pub mod roster_error;
pub use participant::Participant;
pub use roster::Roster;
pub use roster_effect::RosterEffect;
pub use roster_error::RosterError;
