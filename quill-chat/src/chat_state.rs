//! Per-connection secure chat state.
//!
//! [`ServerChatState`] is what the server keeps for each connected player: it
//! decodes the chat the player sends and tracks what was relayed to them.
//! [`ClientChatState`] is the player's side of the same connection. Each
//! pair shares one signature cache, kept in sync by pushing the same accepted
//! messages on both ends.

use chrono::{DateTime, Utc};
use quill_crypto::{CryptoError, ProfileKeyError, SignatureValidator};
use rustc_hash::FxHashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::body::{PackedSignedMessageBody, SignedMessageBody, now};
use crate::config::ChatConfig;
use crate::filter_mask::FilterMask;
use crate::last_seen::{
    LAST_SEEN_MESSAGES_MAX_LENGTH, LastSeenMessagesTracker, LastSeenMessagesValidator,
    LastSeenUpdate, LastSeenValidationError,
};
use crate::link::SignedMessageLink;
use crate::message::PlayerChatMessage;
use crate::message_chain::{DecodeError, MessageDecoder, MessageEncoder};
use crate::session::{LocalChatSession, RemoteChatSession, RemoteChatSessionData};
use crate::signature::MessageSignature;
use crate::signature_cache::MessageSignatureCache;
use crate::validator::SignedMessageValidator;

/// An error that can occur while handling chat on either end of a connection.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The message was rejected by the sender's chain.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The acknowledgments do not match what was sent.
    #[error("Chat message validation failure: {0}")]
    LastSeen(#[from] LastSeenValidationError),
    /// The player stopped acknowledging chat.
    #[error("Too many unacknowledged chat messages ({0})")]
    TooManyPendingMessages(usize),
    /// A packed body referred to an empty cache slot.
    #[error("Chat referenced a signature that is not cached")]
    UnknownCachedSignature,
    /// The content contains characters that may not be typed in chat.
    #[error("Illegal characters in chat")]
    IllegalCharacters,
    /// Signing an outgoing message failed.
    #[error(transparent)]
    Signing(#[from] CryptoError),
    /// The local chain is used up; a new session is needed.
    #[error("Chat chain exhausted. Please start a new chat session.")]
    ChainExhausted,
    /// The player's session key was rejected.
    #[error("Invalid chat session: {0}")]
    ProfileKey(#[from] ProfileKeyError),
    /// The player replaced their key with one that expires earlier.
    #[error("Outdated profile public key")]
    OutdatedProfileKey,
}

impl ChatError {
    /// Whether the connection has to be closed.
    #[must_use]
    pub const fn should_disconnect(&self) -> bool {
        match self {
            Self::Decode(error) => error.should_disconnect(),
            Self::LastSeen(_)
            | Self::TooManyPendingMessages(_)
            | Self::UnknownCachedSignature
            | Self::IllegalCharacters
            | Self::ProfileKey(_)
            | Self::OutdatedProfileKey => true,
            Self::Signing(_) | Self::ChainExhausted => false,
        }
    }
}

/// A chat message as a client submits it to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedChat {
    /// The plain message text.
    pub content: String,
    /// When the message was written.
    pub time_stamp: DateTime<Utc>,
    /// The signature salt.
    pub salt: i64,
    /// The signature, if the client has a chat session.
    pub signature: Option<MessageSignature>,
    /// What the client acknowledged since its last message.
    pub last_seen: LastSeenUpdate,
}

/// A player's chat message as the server relays it to one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayedChat {
    /// Number of chat messages relayed to this recipient before this one.
    pub global_index: i32,
    /// The sending player.
    pub sender: Uuid,
    /// The message's index in the sender's chain.
    pub index: i32,
    /// The signature, sent in full.
    pub signature: Option<MessageSignature>,
    /// The body, packed against the recipient's cache.
    pub body: PackedSignedMessageBody,
    /// Decorated text shown instead of the signed content.
    pub unsigned_content: Option<String>,
    /// What the server's filter hid.
    pub filter_mask: FilterMask,
}

/// Outcome of [`ClientChatState::receive_chat`].
#[derive(Clone, Debug)]
pub struct ReceivedChat {
    /// The reassembled message.
    pub message: PlayerChatMessage,
    /// Whether the sender's validator accepted it.
    pub trusted: bool,
    /// Offset to acknowledge right away, if enough messages piled up.
    pub ack: Option<i32>,
}

/// Whether `content` contains a character players may not type.
fn is_chat_message_illegal(content: &str) -> bool {
    content
        .chars()
        .any(|c| c == '\u{a7}' || c < ' ' || c == '\u{7f}')
}

/// The server's chat state for one connected player.
pub struct ServerChatState {
    player_id: Uuid,
    /// Chat messages relayed to this player.
    pub messages_sent: i32,
    /// Chat messages accepted from this player.
    pub messages_received: i32,
    /// The cache shared with this player's client.
    pub signature_cache: MessageSignatureCache,
    /// Checks the player's acknowledgments of messages relayed to them.
    pub message_validator: LastSeenMessagesValidator,
    /// The player's chat session, if they have one.
    pub chat_session: Option<RemoteChatSession>,
    message_decoder: MessageDecoder,
    max_unacknowledged: usize,
}

impl ServerChatState {
    /// Creates the state for a newly joined player without a chat session.
    #[must_use]
    pub fn new(player_id: Uuid, config: &ChatConfig) -> Self {
        Self {
            player_id,
            messages_sent: 0,
            messages_received: 0,
            signature_cache: MessageSignatureCache::new(config.signature_cache_size),
            message_validator: LastSeenMessagesValidator::new(LAST_SEEN_MESSAGES_MAX_LENGTH),
            chat_session: None,
            message_decoder: MessageDecoder::Unsigned {
                sender: player_id,
                enforce_secure_chat: config.enforce_secure_chat,
            },
            max_unacknowledged: config.max_unacknowledged,
        }
    }

    /// The player this state belongs to.
    #[must_use]
    pub const fn player_id(&self) -> Uuid {
        self.player_id
    }

    /// Accepts a new chat session from the player and restarts their chain.
    ///
    /// Returns `None` if `data` is the session already in use, which leaves
    /// the chain where it is.
    pub fn update_session(
        &mut self,
        data: RemoteChatSessionData,
        authority: &dyn SignatureValidator,
    ) -> Result<Option<&RemoteChatSession>, ChatError> {
        if let Some(current) = &self.chat_session {
            if current.as_data() == data {
                return Ok(None);
            }
            if data.profile_public_key.expires_at
                < current.profile_public_key().data().expires_at
            {
                return Err(ChatError::OutdatedProfileKey);
            }
        }
        let session = data.validate(self.player_id, authority)?;
        log::debug!(
            "Player {} started chat session {}",
            self.player_id,
            session.session_id()
        );
        self.message_decoder = session.create_message_decoder(self.player_id);
        Ok(Some(self.chat_session.insert(session)))
    }

    /// Validates a chat message the player sent.
    ///
    /// The acknowledgments are checked first; any mismatch there means the
    /// two ends disagree on history and the returned error asks for a disconnect.
    pub fn handle_chat(&mut self, chat: SubmittedChat) -> Result<PlayerChatMessage, ChatError> {
        if is_chat_message_illegal(&chat.content) {
            return Err(ChatError::IllegalCharacters);
        }
        let last_seen = self
            .message_validator
            .apply_update(&chat.last_seen)
            .inspect_err(|_| {
                log::warn!(
                    "Failed to validate message acknowledgements from {}",
                    self.player_id
                );
            })?;

        let body = SignedMessageBody::new(chat.content, chat.time_stamp, chat.salt, last_seen);
        let message = self
            .message_decoder
            .unpack(chat.signature, body)
            .inspect_err(|e| {
                log::warn!(
                    "Failed to update secure chat state for {}: '{e}'",
                    self.player_id
                );
            })?;
        self.messages_received += 1;
        Ok(message)
    }

    /// Applies a standalone acknowledgment from the player.
    pub fn handle_ack(&mut self, offset: i32) -> Result<(), ChatError> {
        self.message_validator.apply_offset(offset).map_err(|e| {
            log::warn!(
                "Failed to validate message acknowledgements from {}",
                self.player_id
            );
            ChatError::from(e)
        })
    }

    /// Prepares `message` for relay to this player and records it as sent.
    ///
    /// The body is packed before the cache is updated, so that the client,
    /// which unpacks before pushing, resolves the same slots.
    pub fn send_chat_message(
        &mut self,
        message: &PlayerChatMessage,
    ) -> Result<RelayedChat, ChatError> {
        let relayed = RelayedChat {
            global_index: self.messages_sent,
            sender: message.sender(),
            index: message.link().index,
            signature: message.signature().cloned(),
            body: message.signed_body().pack(&self.signature_cache),
            unsigned_content: message.unsigned_content().map(str::to_string),
            filter_mask: message.filter_mask().clone(),
        };
        self.messages_sent += 1;

        if let Some(signature) = message.signature() {
            self.signature_cache
                .push_body(message.signed_body(), Some(signature));
            self.message_validator.add_pending(signature.clone());
            let pending = self.message_validator.unacknowledged_count();
            if pending > self.max_unacknowledged {
                return Err(ChatError::TooManyPendingMessages(pending));
            }
        }
        Ok(relayed)
    }
}

struct SenderState {
    session: Option<RemoteChatSession>,
    validator: SignedMessageValidator,
}

/// A player client's chat state for its connection to the server.
pub struct ClientChatState {
    player_id: Uuid,
    config: ChatConfig,
    signature_cache: MessageSignatureCache,
    tracker: LastSeenMessagesTracker,
    encoder: MessageEncoder,
    senders: FxHashMap<Uuid, SenderState>,
}

impl ClientChatState {
    /// Creates the state for `player_id`, which starts without a chat session.
    #[must_use]
    pub fn new(player_id: Uuid, config: ChatConfig) -> Self {
        Self {
            player_id,
            signature_cache: MessageSignatureCache::new(config.signature_cache_size),
            tracker: LastSeenMessagesTracker::new(LAST_SEEN_MESSAGES_MAX_LENGTH),
            encoder: MessageEncoder::Unsigned,
            senders: FxHashMap::default(),
            config,
        }
    }

    /// The local player.
    #[must_use]
    pub const fn player_id(&self) -> Uuid {
        self.player_id
    }

    /// Starts signing with `session` and returns what to announce to the server.
    pub fn start_session(&mut self, session: &LocalChatSession) -> RemoteChatSessionData {
        self.encoder = session.create_message_encoder(self.player_id);
        session.as_remote().as_data()
    }

    /// Builds the next chat message, signing it if there is a session.
    pub fn prepare_chat(&mut self, content: impl Into<String>) -> Result<SubmittedChat, ChatError> {
        // Checked up front: generating the update below acknowledges entries
        // that would otherwise never reach the server.
        if self.encoder.is_exhausted() {
            return Err(ChatError::ChainExhausted);
        }
        let update = self.tracker.generate_and_apply_update();
        let body = SignedMessageBody::new(content.into(), now(), rand::random(), update.last_seen);
        let signature = self.encoder.pack(&body)?;
        if signature.is_none() && self.encoder.is_signed() {
            return Err(ChatError::ChainExhausted);
        }
        Ok(SubmittedChat {
            content: body.content,
            time_stamp: body.time_stamp,
            salt: body.salt,
            signature,
            last_seen: update.update,
        })
    }

    /// Registers another player's chat session, or their lack of one.
    ///
    /// Their validator starts over, so an earlier invalidation is forgotten.
    pub fn set_sender_session(&mut self, sender: Uuid, session: Option<RemoteChatSession>) {
        let validator = self.validator_for(session.as_ref());
        self.senders.insert(sender, SenderState { session, validator });
    }

    /// Forgets a player who left.
    pub fn remove_sender(&mut self, sender: Uuid) {
        self.senders.remove(&sender);
    }

    fn validator_for(&self, session: Option<&RemoteChatSession>) -> SignedMessageValidator {
        match session {
            Some(session) => {
                session.create_message_validator(self.config.key_expiry_grace_period())
            }
            None if self.config.enforce_secure_chat => SignedMessageValidator::RejectAll,
            None => SignedMessageValidator::AcceptUnsigned,
        }
    }

    /// Reassembles and validates a relayed chat message.
    ///
    /// Untrusted messages are still returned, and still take a slot in the
    /// acknowledgment window, so that both ends keep counting the same messages.
    pub fn receive_chat(&mut self, chat: RelayedChat) -> Result<ReceivedChat, ChatError> {
        let body = chat
            .body
            .unpack(&self.signature_cache)
            .ok_or(ChatError::UnknownCachedSignature)?;
        self.signature_cache
            .push_body(&body, chat.signature.as_ref());

        let link = match self.senders.get(&chat.sender).and_then(|s| s.session.as_ref()) {
            Some(session) => SignedMessageLink {
                index: chat.index,
                sender: chat.sender,
                session_id: session.session_id(),
            },
            None => SignedMessageLink::unsigned(chat.sender),
        };
        let signature = chat.signature.clone();
        let message = PlayerChatMessage::new(
            link,
            chat.signature,
            body,
            chat.unsigned_content,
            chat.filter_mask,
        );

        let trusted = match self.senders.get_mut(&chat.sender) {
            Some(state) => state.validator.update_and_validate(&message),
            None => {
                log::error!(
                    "Received player chat packet for unknown player with ID: {}",
                    chat.sender
                );
                false
            }
        };

        let displayed = trusted && !message.is_fully_filtered();
        let mut ack = None;
        if let Some(signature) = signature
            && self.tracker.add_pending(signature, displayed)
            && self.tracker.offset() > self.config.ack_threshold
        {
            ack = self.acknowledge();
        }
        Ok(ReceivedChat {
            message,
            trusted,
            ack,
        })
    }

    /// Flushes the pending acknowledgment offset, if there is one.
    pub fn acknowledge(&mut self) -> Option<i32> {
        let offset = self.tracker.get_and_clear_offset();
        (offset > 0).then_some(offset)
    }
}
