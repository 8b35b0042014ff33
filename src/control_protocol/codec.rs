//! Control frame layout:
//!
//! ```text
//! version u8 | kind u8 | body
//! ```
//!
//! Integers are big-endian and strings are `u16 length + UTF-8`. Trailing
//! bytes after a known body are ignored so newer peers can append fields.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    control_protocol::{
        errors::MalformedMessage,
        message::{ChatMessage, ControlMessage},
        msg_kind::{FLAG_HAND_RAISED, FLAG_HOST, FLAG_MUTED, MsgKind, PROTOCOL_VERSION},
    },
    roster::participant::Participant,
    signaling_client::participant_id::ParticipantId,
};

const MAX_STR16: usize = u16::MAX as usize;

// ---- Encode ---------------------------------------------------------------

/// Serializes one message into a frame.
///
/// # Errors
/// `StringTooLong` or `TooManyParticipants` when a field does not fit its
/// length prefix.
pub fn encode(msg: &ControlMessage) -> Result<Bytes, MalformedMessage> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(PROTOCOL_VERSION);

    match msg {
        ControlMessage::Chat(chat) => {
            buf.put_u8(MsgKind::Chat.as_u8());
            put_str16(&mut buf, &chat.id)?;
            put_str16(&mut buf, chat.sender.as_str())?;
            put_str16(&mut buf, &chat.content)?;
            buf.put_u64(chat.sent_at);
        }
        ControlMessage::RosterSnapshot(entries) => {
            buf.put_u8(MsgKind::RosterSnapshot.as_u8());
            let count = u16::try_from(entries.len())
                .map_err(|_| MalformedMessage::TooManyParticipants(entries.len()))?;
            buf.put_u16(count);
            for p in entries {
                put_str16(&mut buf, p.id.as_str())?;
                put_str16(&mut buf, &p.display_name)?;
                buf.put_u8(flags_of(p));
            }
        }
        ControlMessage::HandRaise {
            participant,
            raised,
        } => {
            buf.put_u8(MsgKind::HandRaise.as_u8());
            put_str16(&mut buf, participant.as_str())?;
            buf.put_u8(u8::from(*raised));
        }
        ControlMessage::MuteStatus { participant, muted } => {
            buf.put_u8(MsgKind::MuteStatus.as_u8());
            put_str16(&mut buf, participant.as_str())?;
            buf.put_u8(u8::from(*muted));
        }
        ControlMessage::MuteCommand { participant } => {
            buf.put_u8(MsgKind::MuteCommand.as_u8());
            put_str16(&mut buf, participant.as_str())?;
        }
        ControlMessage::RemoveCommand { participant } => {
            buf.put_u8(MsgKind::RemoveCommand.as_u8());
            put_str16(&mut buf, participant.as_str())?;
        }
        ControlMessage::LowerHandCommand { participant } => {
            buf.put_u8(MsgKind::LowerHandCommand.as_u8());
            put_str16(&mut buf, participant.as_str())?;
        }
        ControlMessage::Unknown { kind, payload } => {
            buf.put_u8(*kind);
            buf.put_slice(payload);
        }
    }
    Ok(buf.freeze())
}

fn put_str16(buf: &mut BytesMut, s: &str) -> Result<(), MalformedMessage> {
    let len = u16::try_from(s.len()).map_err(|_| MalformedMessage::StringTooLong {
        max: MAX_STR16,
        actual: s.len(),
    })?;
    buf.put_u16(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn flags_of(p: &Participant) -> u8 {
    let mut flags = 0;
    if p.is_host {
        flags |= FLAG_HOST;
    }
    if p.is_muted {
        flags |= FLAG_MUTED;
    }
    if p.hand_raised {
        flags |= FLAG_HAND_RAISED;
    }
    flags
}

// ---- Decode ---------------------------------------------------------------

/// Parses one frame.
///
/// # Errors
/// `MalformedMessage` for empty frames, a foreign version, truncated bodies,
/// bad UTF-8 or empty participant ids. Unknown kinds are not errors.
pub fn decode(frame: &[u8]) -> Result<ControlMessage, MalformedMessage> {
    let mut cur = Cursor::new(frame);
    let version = cur.read_u8().map_err(|_| MalformedMessage::Empty)?;
    if version != PROTOCOL_VERSION {
        return Err(MalformedMessage::UnsupportedVersion(version));
    }
    let kind_byte = cur.read_u8()?;

    let Some(kind) = MsgKind::from_u8(kind_byte) else {
        let start = usize::try_from(cur.position()).unwrap_or(frame.len());
        return Ok(ControlMessage::Unknown {
            kind: kind_byte,
            payload: Bytes::copy_from_slice(frame.get(start..).unwrap_or_default()),
        });
    };

    let msg = match kind {
        MsgKind::Chat => {
            let id = get_str16(&mut cur)?;
            let sender = get_id(&mut cur)?;
            let content = get_str16(&mut cur)?;
            let sent_at = cur.read_u64::<BigEndian>()?;
            ControlMessage::Chat(ChatMessage {
                id,
                sender,
                content,
                sent_at,
            })
        }
        MsgKind::RosterSnapshot => {
            let count = cur.read_u16::<BigEndian>()?;
            let mut entries = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                let id = get_id(&mut cur)?;
                let display_name = get_str16(&mut cur)?;
                let flags = cur.read_u8()?;
                entries.push(Participant {
                    id,
                    display_name,
                    is_host: flags & FLAG_HOST != 0,
                    is_muted: flags & FLAG_MUTED != 0,
                    hand_raised: flags & FLAG_HAND_RAISED != 0,
                });
            }
            ControlMessage::RosterSnapshot(entries)
        }
        MsgKind::HandRaise => ControlMessage::HandRaise {
            participant: get_id(&mut cur)?,
            raised: cur.read_u8()? != 0,
        },
        MsgKind::MuteStatus => ControlMessage::MuteStatus {
            participant: get_id(&mut cur)?,
            muted: cur.read_u8()? != 0,
        },
        MsgKind::MuteCommand => ControlMessage::MuteCommand {
            participant: get_id(&mut cur)?,
        },
        MsgKind::RemoveCommand => ControlMessage::RemoveCommand {
            participant: get_id(&mut cur)?,
        },
        MsgKind::LowerHandCommand => ControlMessage::LowerHandCommand {
            participant: get_id(&mut cur)?,
        },
    };
    Ok(msg)
}

fn get_str16(cur: &mut Cursor<&[u8]>) -> Result<String, MalformedMessage> {
    let len = usize::from(cur.read_u16::<BigEndian>()?);
    let mut raw = vec![0u8; len];
    cur.read_exact(&mut raw)?;
    String::from_utf8(raw).map_err(|_| MalformedMessage::InvalidUtf8)
}

fn get_id(cur: &mut Cursor<&[u8]>) -> Result<ParticipantId, MalformedMessage> {
    ParticipantId::new(get_str16(cur)?).ok_or(MalformedMessage::EmptyId)
}
