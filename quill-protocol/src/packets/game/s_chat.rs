//! Serverbound chat packet - a chat message the player typed, signed if they have a session.

use std::io::{Read, Result, Write};

use chrono::{DateTime, Utc};
use quill_chat::body::MAX_CONTENT_LENGTH;
use quill_chat::{LastSeenUpdate, MessageSignature, SubmittedChat};
use quill_utils::serial::{ReadFrom, WriteTo, read_bounded_string, write_bounded_str};

use super::S_CHAT;
use crate::packet_traits::{Packet, ServerPacket};

/// Serverbound packet carrying a chat message typed by the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SChat {
    /// The plain message text, at most 256 UTF-16 units.
    pub message: String,
    /// When the message was written.
    pub time_stamp: DateTime<Utc>,
    /// The signature salt.
    pub salt: i64,
    /// The signature, absent without a chat session.
    pub signature: Option<MessageSignature>,
    /// Acknowledgments since the player's previous message.
    pub last_seen: LastSeenUpdate,
}

impl WriteTo for SChat {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        write_bounded_str(writer, &self.message, MAX_CONTENT_LENGTH)?;
        self.time_stamp.write(writer)?;
        self.salt.write(writer)?;
        self.signature.write(writer)?;
        self.last_seen.write(writer)
    }
}

impl ReadFrom for SChat {
    fn read(data: &mut impl Read) -> Result<Self> {
        Ok(Self {
            message: read_bounded_string(data, MAX_CONTENT_LENGTH)?,
            time_stamp: DateTime::<Utc>::read(data)?,
            salt: i64::read(data)?,
            signature: Option::<MessageSignature>::read(data)?,
            last_seen: LastSeenUpdate::read(data)?,
        })
    }
}

impl Packet for SChat {
    const ID: i32 = S_CHAT;
}

impl ServerPacket for SChat {}

impl From<SubmittedChat> for SChat {
    fn from(chat: SubmittedChat) -> Self {
        Self {
            message: chat.content,
            time_stamp: chat.time_stamp,
            salt: chat.salt,
            signature: chat.signature,
            last_seen: chat.last_seen,
        }
    }
}

impl From<SChat> for SubmittedChat {
    fn from(packet: SChat) -> Self {
        Self {
            content: packet.message,
            time_stamp: packet.time_stamp,
            salt: packet.salt,
            signature: packet.signature,
            last_seen: packet.last_seen,
        }
    }
}
