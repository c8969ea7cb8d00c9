//! Chat packets of the play protocol.
//!
//! Only the packets secure chat needs are defined here. Each one is a plain
//! struct with [`WriteTo`](quill_utils::serial::WriteTo) and
//! [`ReadFrom`](quill_utils::serial::ReadFrom) impls; [`packet_traits`] adds
//! the packet ids and framing on top.

pub mod packet_traits;
pub mod packets;

pub use packet_traits::{ClientPacket, Packet, PacketError, ServerPacket};
