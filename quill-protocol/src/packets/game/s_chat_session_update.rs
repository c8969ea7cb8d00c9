//! Serverbound chat session update packet - announces the player's new chat session.

use std::io::{Read, Result, Write};

use quill_chat::RemoteChatSessionData;
use quill_utils::serial::{ReadFrom, WriteTo};

use super::S_CHAT_SESSION_UPDATE;
use crate::packet_traits::{Packet, ServerPacket};

/// Serverbound packet announcing a new chat session and its profile key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SChatSessionUpdate {
    /// The session, still to be validated against the key authority.
    pub session: RemoteChatSessionData,
}

impl WriteTo for SChatSessionUpdate {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        self.session.write(writer)
    }
}

impl ReadFrom for SChatSessionUpdate {
    fn read(data: &mut impl Read) -> Result<Self> {
        Ok(Self {
            session: RemoteChatSessionData::read(data)?,
        })
    }
}

impl Packet for SChatSessionUpdate {
    const ID: i32 = S_CHAT_SESSION_UPDATE;
}

impl ServerPacket for SChatSessionUpdate {}
