//! Play-state chat packets and their id dispatch.

mod c_player_chat;
mod c_player_chat_session;
mod c_system_chat;
mod s_chat;
mod s_chat_ack;
mod s_chat_session_update;

pub use c_player_chat::CPlayerChat;
pub use c_player_chat_session::CPlayerChatSession;
pub use c_system_chat::CSystemChat;
pub use s_chat::SChat;
pub use s_chat_ack::SChatAck;
pub use s_chat_session_update::SChatSessionUpdate;

use crate::packet_traits::{Packet, PacketError, read_packet_id, read_payload};

/// Serverbound chat acknowledgment.
pub const S_CHAT_ACK: i32 = 0x05;
/// Serverbound chat message.
pub const S_CHAT: i32 = 0x08;
/// Serverbound chat session update.
pub const S_CHAT_SESSION_UPDATE: i32 = 0x09;
/// Clientbound player chat message.
pub const C_PLAYER_CHAT: i32 = 0x3B;
/// Clientbound player chat session announcement.
pub const C_PLAYER_CHAT_SESSION: i32 = 0x40;
/// Clientbound system chat message.
pub const C_SYSTEM_CHAT: i32 = 0x73;

/// Longest displayable text component, in UTF-16 units.
pub const MAX_DISPLAY_LENGTH: usize = 262_144;

/// Every chat packet a client can send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerboundGamePacket {
    /// See [`SChat`].
    Chat(SChat),
    /// See [`SChatAck`].
    ChatAck(SChatAck),
    /// See [`SChatSessionUpdate`].
    ChatSessionUpdate(SChatSessionUpdate),
}

impl ServerboundGamePacket {
    /// Decodes a frame by its packet id.
    pub fn decode(frame: &[u8]) -> Result<Self, PacketError> {
        let (id, payload) = read_packet_id(frame)?;
        Ok(match id {
            S_CHAT => Self::Chat(read_payload(payload)?),
            S_CHAT_ACK => Self::ChatAck(read_payload(payload)?),
            S_CHAT_SESSION_UPDATE => Self::ChatSessionUpdate(read_payload(payload)?),
            _ => return Err(PacketError::UnknownPacket(id)),
        })
    }

    /// Encodes the packet with its id.
    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Chat(packet) => packet.encode(),
            Self::ChatAck(packet) => packet.encode(),
            Self::ChatSessionUpdate(packet) => packet.encode(),
        }
    }
}

/// Every chat packet a server can send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientboundGamePacket {
    /// See [`CPlayerChat`].
    PlayerChat(CPlayerChat),
    /// See [`CPlayerChatSession`].
    PlayerChatSession(CPlayerChatSession),
    /// See [`CSystemChat`].
    SystemChat(CSystemChat),
}

impl ClientboundGamePacket {
    /// Decodes a frame by its packet id.
    pub fn decode(frame: &[u8]) -> Result<Self, PacketError> {
        let (id, payload) = read_packet_id(frame)?;
        Ok(match id {
            C_PLAYER_CHAT => Self::PlayerChat(read_payload(payload)?),
            C_PLAYER_CHAT_SESSION => Self::PlayerChatSession(read_payload(payload)?),
            C_SYSTEM_CHAT => Self::SystemChat(read_payload(payload)?),
            _ => return Err(PacketError::UnknownPacket(id)),
        })
    }

    /// Encodes the packet with its id.
    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::PlayerChat(packet) => packet.encode(),
            Self::PlayerChatSession(packet) => packet.encode(),
            Self::SystemChat(packet) => packet.encode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use quill_chat::{
        FilterMask, LastSeenUpdate, MessageSignature, PackedLastSeenMessages, PackedSignature,
        PackedSignedMessageBody,
    };
    use uuid::Uuid;

    use super::*;

    fn signature(byte: u8) -> MessageSignature {
        MessageSignature::new([byte; 256])
    }

    #[test]
    fn test_chat_frame_layout() {
        let packet = SChat {
            message: "hi".to_string(),
            time_stamp: DateTime::from_timestamp_millis(1_000).expect("in range"),
            salt: 2,
            signature: None,
            last_seen: LastSeenUpdate {
                offset: 1,
                acknowledged: [19].into_iter().collect(),
            },
        };
        let frame = packet.encode().expect("encode");
        let expected: Vec<u8> = [
            &[S_CHAT as u8, 2, b'h', b'i'][..],
            &1_000i64.to_be_bytes(),
            &2i64.to_be_bytes(),
            &[0, 1, 0, 0, 0b0000_1000],
        ]
        .concat();
        assert_eq!(frame, expected);
        assert_eq!(
            ServerboundGamePacket::decode(&frame).expect("decode"),
            ServerboundGamePacket::Chat(packet)
        );
    }

    #[test]
    fn test_player_chat_frame() {
        let packet = CPlayerChat {
            global_index: 3,
            sender: Uuid::new_v4(),
            index: 7,
            signature: Some(signature(1)),
            body: PackedSignedMessageBody {
                content: "hello".to_string(),
                time_stamp: DateTime::from_timestamp_millis(1_700_000_000_123).expect("in range"),
                salt: -5,
                last_seen: PackedLastSeenMessages {
                    entries: vec![PackedSignature::Cached(4), PackedSignature::Full(signature(2))],
                },
            },
            unsigned_content: Some("[hello]".to_string()),
            filter_mask: FilterMask::partially([0, 2].into_iter().collect()),
        };
        let frame = packet.encode().expect("encode");
        assert_eq!(
            ClientboundGamePacket::decode(&frame).expect("decode"),
            ClientboundGamePacket::PlayerChat(packet)
        );
    }

    #[test]
    fn test_unknown_id_and_trailing_bytes() {
        assert!(matches!(
            ServerboundGamePacket::decode(&[0x7f]),
            Err(PacketError::UnknownPacket(0x7f))
        ));

        let mut frame = SChatAck { offset: 3 }.encode().expect("encode");
        frame.push(0);
        assert!(matches!(
            ServerboundGamePacket::decode(&frame),
            Err(PacketError::TrailingBytes { id: S_CHAT_ACK, remaining: 1 })
        ));
    }

    #[test]
    fn test_system_chat_and_truncated_frame() {
        let packet = CSystemChat {
            content: "Server restarting".to_string(),
            overlay: false,
        };
        let frame = packet.encode().expect("encode");
        assert_eq!(
            ClientboundGamePacket::decode(&frame).expect("decode"),
            ClientboundGamePacket::SystemChat(packet)
        );

        let mut chat = SChat {
            message: String::new(),
            time_stamp: DateTime::from_timestamp_millis(0).expect("in range"),
            salt: 0,
            signature: Some(signature(9)),
            last_seen: LastSeenUpdate::default(),
        }
        .encode()
        .expect("encode");
        chat.truncate(chat.len() - 10);
        assert!(matches!(
            ServerboundGamePacket::decode(&chat),
            Err(PacketError::Io(_))
        ));
    }
}
