//! Clientbound system chat packet - a message from the server itself.

use std::io::{Read, Result, Write};

use quill_utils::serial::{ReadFrom, WriteTo, read_bounded_string, write_bounded_str};

use super::{C_SYSTEM_CHAT, MAX_DISPLAY_LENGTH};
use crate::packet_traits::{ClientPacket, Packet};

/// Clientbound packet for unsigned server messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CSystemChat {
    /// The message text.
    pub content: String,
    /// Show above the hotbar instead of in the chat window.
    pub overlay: bool,
}

impl WriteTo for CSystemChat {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        write_bounded_str(writer, &self.content, MAX_DISPLAY_LENGTH)?;
        self.overlay.write(writer)
    }
}

impl ReadFrom for CSystemChat {
    fn read(data: &mut impl Read) -> Result<Self> {
        Ok(Self {
            content: read_bounded_string(data, MAX_DISPLAY_LENGTH)?,
            overlay: bool::read(data)?,
        })
    }
}

impl Packet for CSystemChat {
    const ID: i32 = C_SYSTEM_CHAT;
}

impl ClientPacket for CSystemChat {}
