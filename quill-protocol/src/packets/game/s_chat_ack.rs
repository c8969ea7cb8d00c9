//! Serverbound chat acknowledgment packet - tells the server how many messages the client has seen.

use std::io::{Read, Result, Write};

use quill_utils::codec::VarInt;
use quill_utils::serial::{ReadFrom, WriteTo};

use super::S_CHAT_ACK;
use crate::packet_traits::{Packet, ServerPacket};

/// Serverbound packet acknowledging chat without sending a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SChatAck {
    /// Messages received since the last acknowledgment.
    pub offset: i32,
}

impl WriteTo for SChatAck {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        VarInt(self.offset).write(writer)
    }
}

impl ReadFrom for SChatAck {
    fn read(data: &mut impl Read) -> Result<Self> {
        Ok(Self {
            offset: VarInt::read(data)?.0,
        })
    }
}

impl Packet for SChatAck {
    const ID: i32 = S_CHAT_ACK;
}

impl ServerPacket for SChatAck {}
