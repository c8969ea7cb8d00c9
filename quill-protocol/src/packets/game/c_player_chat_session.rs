//! Clientbound player chat session packet - tells clients which session a player signs with.

use std::io::{Read, Result, Write};

use quill_chat::RemoteChatSessionData;
use quill_utils::serial::{ReadFrom, WriteTo};
use uuid::Uuid;

use super::C_PLAYER_CHAT_SESSION;
use crate::packet_traits::{ClientPacket, Packet};

/// Clientbound packet telling clients which chat session a player uses.
///
/// Sent when a player joins and whenever they start a new session. A missing
/// session means the player's chat will be unsigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CPlayerChatSession {
    /// The player the session belongs to.
    pub player: Uuid,
    /// The player's session, if they have one.
    pub session: Option<RemoteChatSessionData>,
}

impl WriteTo for CPlayerChatSession {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        self.player.write(writer)?;
        self.session.write(writer)
    }
}

impl ReadFrom for CPlayerChatSession {
    fn read(data: &mut impl Read) -> Result<Self> {
        Ok(Self {
            player: Uuid::read(data)?,
            session: Option::<RemoteChatSessionData>::read(data)?,
        })
    }
}

impl Packet for CPlayerChatSession {
    const ID: i32 = C_PLAYER_CHAT_SESSION;
}

impl ClientPacket for CPlayerChatSession {}
