//! Signed chat message chains.
//!
//! A sender signs every chat message it sends and links it to the previous one
//! through a [`SignedMessageLink`]. Receivers verify the signature, check that
//! the link continues the chain, and cross-check the "last seen" window the
//! sender acknowledged against their own view of the conversation.
//!
//! # Key Types
//!
//! - [`MessageSignature`] - a 256-byte signature, optionally packed into a cache id
//! - [`SignedMessageBody`] - the signed payload: content, time stamp, salt, last seen
//! - [`MessageSignatureCache`] - the signature dictionary both ends keep in sync
//! - [`LastSeenMessagesTracker`] / [`LastSeenMessagesValidator`] - acknowledgment window
//! - [`SignedMessageChain`] - link bookkeeping behind [`MessageEncoder`] and [`MessageDecoder`]
//! - [`PlayerChatMessage`] - the full message envelope
//! - [`SignedMessageValidator`] - per-sender, stateful validation on the receiving client
//! - [`ServerChatState`] / [`ClientChatState`] - per-connection glue tying it all together

pub mod body;
pub mod chat_state;
pub mod config;
pub mod filter_mask;
pub mod last_seen;
pub mod link;
pub mod message;
pub mod message_chain;
pub mod session;
pub mod signature;
pub mod signature_cache;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use body::{PackedSignedMessageBody, SignedMessageBody};
pub use chat_state::{
    ChatError, ClientChatState, ReceivedChat, RelayedChat, ServerChatState, SubmittedChat,
};
pub use config::ChatConfig;
pub use filter_mask::FilterMask;
pub use last_seen::{
    LastSeenMessages, LastSeenMessagesTracker, LastSeenMessagesValidator, LastSeenTrackedEntry,
    LastSeenUpdate, LastSeenValidationError, PackedLastSeenMessages, TrackerUpdate,
};
pub use link::SignedMessageLink;
pub use message::PlayerChatMessage;
pub use message_chain::{DecodeError, MessageDecoder, MessageEncoder, SignedMessageChain};
pub use session::{LocalChatSession, RemoteChatSession, RemoteChatSessionData};
pub use signature::{MessageSignature, PackedSignature};
pub use signature_cache::MessageSignatureCache;
pub use validator::{ChainState, KeyBasedValidator, SignedMessageValidator};
