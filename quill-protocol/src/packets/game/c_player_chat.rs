//! Clientbound player chat packet - relays a player's chat message to a client.

use std::io::{Read, Result, Write};

use quill_chat::{FilterMask, MessageSignature, PackedSignedMessageBody, RelayedChat};
use quill_utils::codec::VarInt;
use quill_utils::serial::{ReadFrom, WriteTo, read_bounded_string, write_bounded_str};
use uuid::Uuid;

use super::{C_PLAYER_CHAT, MAX_DISPLAY_LENGTH};
use crate::packet_traits::{ClientPacket, Packet};

/// Clientbound packet relaying another player's chat message.
///
/// The signature travels in full, while the last-seen signatures inside the
/// body are packed against the recipient's signature cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CPlayerChat {
    /// Running count of chat messages sent to this client.
    pub global_index: i32,
    /// The sending player.
    pub sender: Uuid,
    /// Index of the message in the sender's chain.
    pub index: i32,
    /// The signature, if the message is signed.
    pub signature: Option<MessageSignature>,
    /// The signed body, packed.
    pub body: PackedSignedMessageBody,
    /// Decorated text shown instead of the signed content.
    pub unsigned_content: Option<String>,
    /// What the server's filter hid.
    pub filter_mask: FilterMask,
}

impl WriteTo for CPlayerChat {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        VarInt(self.global_index).write(writer)?;
        self.sender.write(writer)?;
        VarInt(self.index).write(writer)?;
        self.signature.write(writer)?;
        self.body.write(writer)?;
        self.unsigned_content.is_some().write(writer)?;
        if let Some(content) = &self.unsigned_content {
            write_bounded_str(writer, content, MAX_DISPLAY_LENGTH)?;
        }
        self.filter_mask.write(writer)
    }
}

impl ReadFrom for CPlayerChat {
    fn read(data: &mut impl Read) -> Result<Self> {
        let global_index = VarInt::read(data)?.0;
        let sender = Uuid::read(data)?;
        let index = VarInt::read(data)?.0;
        let signature = Option::<MessageSignature>::read(data)?;
        let body = PackedSignedMessageBody::read(data)?;
        let unsigned_content = if bool::read(data)? {
            Some(read_bounded_string(data, MAX_DISPLAY_LENGTH)?)
        } else {
            None
        };
        Ok(Self {
            global_index,
            sender,
            index,
            signature,
            body,
            unsigned_content,
            filter_mask: FilterMask::read(data)?,
        })
    }
}

impl Packet for CPlayerChat {
    const ID: i32 = C_PLAYER_CHAT;
}

impl ClientPacket for CPlayerChat {}

impl From<RelayedChat> for CPlayerChat {
    fn from(chat: RelayedChat) -> Self {
        Self {
            global_index: chat.global_index,
            sender: chat.sender,
            index: chat.index,
            signature: chat.signature,
            body: chat.body,
            unsigned_content: chat.unsigned_content,
            filter_mask: chat.filter_mask,
        }
    }
}

impl From<CPlayerChat> for RelayedChat {
    fn from(packet: CPlayerChat) -> Self {
        Self {
            global_index: packet.global_index,
            sender: packet.sender,
            index: packet.index,
            signature: packet.signature,
            body: packet.body,
            unsigned_content: packet.unsigned_content,
            filter_mask: packet.filter_mask,
        }
    }
}
