// ---- Frame header ---------------------------------------------------------

/// Version byte that opens every control frame.
pub const PROTOCOL_VERSION: u8 = 1;

/// Roster entry flag bits. Unknown bits are ignored on decode.
pub const FLAG_HOST: u8 = 0b0000_0001;
pub const FLAG_MUTED: u8 = 0b0000_0010;
pub const FLAG_HAND_RAISED: u8 = 0b0000_0100;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MsgKind {
    Chat = 0x01,
    RosterSnapshot = 0x02,
    HandRaise = 0x03,
    MuteCommand = 0x04,
    RemoveCommand = 0x05,
    LowerHandCommand = 0x06,
    MuteStatus = 0x07,
}

impl MsgKind {
    /// `None` for kinds this build does not know.
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        use MsgKind::{
            Chat, HandRaise, LowerHandCommand, MuteCommand, MuteStatus, RemoveCommand,
            RosterSnapshot,
        };
        match v {
            0x01 => Some(Chat),
            0x02 => Some(RosterSnapshot),
            0x03 => Some(HandRaise),
            0x04 => Some(MuteCommand),
            0x05 => Some(RemoveCommand),
            0x06 => Some(LowerHandCommand),
            0x07 => Some(MuteStatus),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
