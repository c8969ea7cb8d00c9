//! Chat sessions: a session id bound to a player's profile key.
//!
//! A new session starts a new chain at index 0, so a player whose chain was
//! exhausted or broken recovers by opening one.

use std::io::{Read, Result as IoResult, Write};
use std::sync::Arc;

use chrono::TimeDelta;
use quill_crypto::{
    ProfileKeyError, ProfileKeyPair, ProfilePublicKey, ProfilePublicKeyData, SignatureValidator,
};
use quill_utils::serial::{ReadFrom, WriteTo};
use uuid::Uuid;

use crate::message_chain::{MessageDecoder, MessageEncoder, SignedMessageChain};
use crate::validator::{KeyBasedValidator, SignedMessageValidator};

/// The sending side of a chat session, holding the private key.
#[derive(Clone, Debug)]
pub struct LocalChatSession {
    session_id: Uuid,
    key_pair: ProfileKeyPair,
}

impl LocalChatSession {
    /// Opens a session with a random id.
    #[must_use]
    pub fn create(key_pair: ProfileKeyPair) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            key_pair,
        }
    }

    /// The session id.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The key pair messages are signed with.
    #[must_use]
    pub const fn key_pair(&self) -> &ProfileKeyPair {
        &self.key_pair
    }

    /// The session as peers see it.
    #[must_use]
    pub fn as_remote(&self) -> RemoteChatSession {
        RemoteChatSession::new(self.session_id, self.key_pair.public_key.clone())
    }

    /// An encoder for a fresh chain of `sender`'s messages.
    #[must_use]
    pub fn create_message_encoder(&self, sender: Uuid) -> MessageEncoder {
        SignedMessageChain::new(sender, self.session_id).encoder(Arc::new(self.key_pair.signer()))
    }
}

/// A peer's chat session, holding its verified public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteChatSession {
    session_id: Uuid,
    profile_public_key: ProfilePublicKey,
}

impl RemoteChatSession {
    /// Wraps an already validated key.
    #[must_use]
    pub const fn new(session_id: Uuid, profile_public_key: ProfilePublicKey) -> Self {
        Self {
            session_id,
            profile_public_key,
        }
    }

    /// The session id.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The session's key.
    #[must_use]
    pub const fn profile_public_key(&self) -> &ProfilePublicKey {
        &self.profile_public_key
    }

    /// A decoder for a fresh chain of `sender`'s messages.
    #[must_use]
    pub fn create_message_decoder(&self, sender: Uuid) -> MessageDecoder {
        SignedMessageChain::new(sender, self.session_id).decoder(self.profile_public_key.clone())
    }

    /// A validator for the session, tolerating the key for `grace_period` past its expiry.
    #[must_use]
    pub fn create_message_validator(&self, grace_period: TimeDelta) -> SignedMessageValidator {
        SignedMessageValidator::KeyBased(KeyBasedValidator::new(
            Box::new(self.profile_public_key.create_signature_validator()),
            self.profile_public_key.data().expires_at,
            grace_period,
        ))
    }

    /// Whether the session's key has expired.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.profile_public_key.data().has_expired()
    }

    /// The wire form.
    #[must_use]
    pub fn as_data(&self) -> RemoteChatSessionData {
        RemoteChatSessionData {
            session_id: self.session_id,
            profile_public_key: self.profile_public_key.data().clone(),
        }
    }
}

/// Wire form of a [`RemoteChatSession`], not yet validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteChatSessionData {
    /// The session id.
    pub session_id: Uuid,
    /// The key the player claims.
    pub profile_public_key: ProfilePublicKeyData,
}

impl RemoteChatSessionData {
    /// Accepts the session for `profile_id` if `authority` signed its key and
    /// the key has not expired.
    pub fn validate(
        self,
        profile_id: Uuid,
        authority: &dyn SignatureValidator,
    ) -> Result<RemoteChatSession, ProfileKeyError> {
        let key = ProfilePublicKey::create_validated(authority, profile_id, self.profile_public_key)?;
        if key.data().has_expired() {
            return Err(ProfileKeyError::Expired);
        }
        Ok(RemoteChatSession::new(self.session_id, key))
    }
}

impl WriteTo for RemoteChatSessionData {
    fn write(&self, writer: &mut impl Write) -> IoResult<()> {
        self.session_id.write(writer)?;
        self.profile_public_key.write(writer)
    }
}

impl ReadFrom for RemoteChatSessionData {
    fn read(data: &mut impl Read) -> IoResult<Self> {
        Ok(Self {
            session_id: Uuid::read(data)?,
            profile_public_key: ProfilePublicKeyData::read(data)?,
        })
    }
}
