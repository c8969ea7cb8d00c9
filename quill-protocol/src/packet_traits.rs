//! Packet ids and frame encoding.

use std::io::{self, Cursor};

use quill_utils::codec::VarInt;
use quill_utils::serial::{ReadFrom, WriteTo};
use thiserror::Error;

/// An error that can occur while decoding a packet frame.
#[derive(Error, Debug)]
pub enum PacketError {
    /// The payload is malformed.
    #[error("Malformed packet: {0}")]
    Io(#[from] io::Error),
    /// No packet with this id exists in this direction.
    #[error("Unknown packet id {0:#04x}")]
    UnknownPacket(i32),
    /// The packet was decoded but bytes are left over.
    #[error("Packet {id:#04x} had {remaining} extra bytes")]
    TrailingBytes {
        /// The packet id.
        id: i32,
        /// Number of unread bytes.
        remaining: usize,
    },
}

/// A packet with a fixed id.
pub trait Packet: WriteTo + ReadFrom {
    /// The id written before the payload.
    const ID: i32;

    /// Encodes the id followed by the payload.
    fn encode(&self) -> io::Result<Vec<u8>> {
        let mut frame = Vec::new();
        VarInt(Self::ID).write(&mut frame)?;
        self.write(&mut frame)?;
        Ok(frame)
    }
}

/// A packet sent by the client.
pub trait ServerPacket: Packet {}

/// A packet sent by the server.
pub trait ClientPacket: Packet {}

/// Splits a frame into its packet id and a cursor over the payload.
pub fn read_packet_id(frame: &[u8]) -> io::Result<(i32, Cursor<&[u8]>)> {
    let mut cursor = Cursor::new(frame);
    let id = VarInt::read(&mut cursor)?.0;
    Ok((id, cursor))
}

/// Reads a `P` from `payload`, requiring it to consume every byte.
pub fn read_payload<P: Packet>(mut payload: Cursor<&[u8]>) -> Result<P, PacketError> {
    let packet = P::read(&mut payload)?;
    let remaining = payload.get_ref().len() - payload.position() as usize;
    if remaining > 0 {
        return Err(PacketError::TrailingBytes {
            id: P::ID,
            remaining,
        });
    }
    Ok(packet)
}
