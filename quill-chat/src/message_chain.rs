//! Link bookkeeping for one sender's chain of signed messages.
//!
//! A [`SignedMessageChain`] is either active, holding the next link to use,
//! or exhausted. The sending side wraps it in a [`MessageEncoder`] that signs
//! bodies, the receiving side in a [`MessageDecoder`] that verifies them. An
//! exhausted or broken chain refuses every further message until the sender
//! starts a new session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quill_crypto::{CryptoError, ProfilePublicKey, RsaSignatureValidator, Signer};
use thiserror::Error;
use uuid::Uuid;

use crate::body::SignedMessageBody;
use crate::filter_mask::FilterMask;
use crate::link::SignedMessageLink;
use crate::message::PlayerChatMessage;
use crate::signature::MessageSignature;

/// Why an incoming chat message was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The sender has no chat session, or sent an unsigned message over a signed one.
    #[error("Chat disabled due to missing profile public key. Please try reconnecting.")]
    MissingProfileKey,
    /// The sender's profile key has expired.
    #[error("Chat disabled due to expired profile public key. Please try reconnecting.")]
    ExpiredProfileKey,
    /// The chain is exhausted or was broken by an earlier message.
    #[error("Chat disabled due to broken chain. Please try reconnecting.")]
    ChainBroken,
    /// The message is older than one accepted before it.
    #[error("Chat received out-of-order. Did your system time change?")]
    OutOfOrderChat,
    /// The signature does not match the message.
    #[error("Chat had an invalid signature. Please try reconnecting.")]
    InvalidSignature,
}

impl DecodeError {
    /// Whether the sender should be disconnected. Only a forged or tampered
    /// signature warrants it; everything else only rejects the message.
    #[must_use]
    pub const fn should_disconnect(self) -> bool {
        matches!(self, Self::InvalidSignature)
    }
}

/// The next link of a chain and the time stamp of the last accepted message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedMessageChain {
    next_link: Option<SignedMessageLink>,
    last_time_stamp: DateTime<Utc>,
}

impl SignedMessageChain {
    /// A fresh chain for `sender` in `session_id`, starting at index 0.
    #[must_use]
    pub const fn new(sender: Uuid, session_id: Uuid) -> Self {
        Self {
            next_link: Some(SignedMessageLink::root(sender, session_id)),
            last_time_stamp: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// The link the next message will carry.
    #[must_use]
    pub const fn next_link(&self) -> Option<&SignedMessageLink> {
        self.next_link.as_ref()
    }

    /// Whether no more messages can be sent on this chain.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.next_link.is_none()
    }

    /// Breaks the chain for good.
    pub const fn set_chain_broken(&mut self) {
        self.next_link = None;
    }

    /// Takes the current link and advances past it.
    fn advance(&mut self) -> Option<SignedMessageLink> {
        let link = self.next_link?;
        self.next_link = link.advance();
        Some(link)
    }

    /// Turns the chain into an encoder signing with `signer`.
    #[must_use]
    pub fn encoder(self, signer: Arc<dyn Signer>) -> MessageEncoder {
        MessageEncoder::Signed {
            chain: self,
            signer,
        }
    }

    /// Turns the chain into a decoder checking against `public_key`.
    #[must_use]
    pub fn decoder(self, public_key: ProfilePublicKey) -> MessageDecoder {
        let validator = public_key.create_signature_validator();
        MessageDecoder::Signed {
            chain: self,
            public_key,
            validator,
        }
    }
}

/// Signs outgoing message bodies.
pub enum MessageEncoder {
    /// The sender has no chat session; nothing is signed.
    Unsigned,
    /// Signs with the session's private key.
    Signed {
        /// The sender's chain.
        chain: SignedMessageChain,
        /// Signs with the session's private key.
        signer: Arc<dyn Signer>,
    },
}

impl MessageEncoder {
    /// Signs `body` with the next link.
    ///
    /// Returns `Ok(None)` when no signature can be made: the encoder is
    /// unsigned or the chain is exhausted. The caller must not send such a
    /// message as if it were deliberately unsigned.
    pub fn pack(&mut self, body: &SignedMessageBody) -> Result<Option<MessageSignature>, CryptoError> {
        let Self::Signed { chain, signer } = self else {
            return Ok(None);
        };
        let Some(link) = chain.advance() else {
            return Ok(None);
        };
        let bytes = signer.sign(&PlayerChatMessage::signed_payload(&link, body))?;
        MessageSignature::from_slice(&bytes).map(Some)
    }

    /// Whether a signed encoder has run out of links. Unsigned encoders never do.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        match self {
            Self::Unsigned => false,
            Self::Signed { chain, .. } => chain.is_exhausted(),
        }
    }

    /// Whether this encoder produces signatures at all.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Signed { .. })
    }
}

/// Verifies incoming message bodies against one sender's chain.
pub enum MessageDecoder {
    /// The sender has no chat session.
    Unsigned {
        /// The sending player.
        sender: Uuid,
        /// Reject all chat from the sender instead of accepting it unsigned.
        enforce_secure_chat: bool,
    },
    /// The sender has a chat session.
    Signed {
        /// The sender's chain.
        chain: SignedMessageChain,
        /// The session's profile key.
        public_key: ProfilePublicKey,
        /// Checks signatures made with the session key.
        validator: RsaSignatureValidator,
    },
}

impl MessageDecoder {
    /// Checks `signature` over `body` and, if it holds, advances the chain.
    pub fn unpack(
        &mut self,
        signature: Option<MessageSignature>,
        body: SignedMessageBody,
    ) -> Result<PlayerChatMessage, DecodeError> {
        match self {
            Self::Unsigned {
                sender,
                enforce_secure_chat,
            } => {
                if *enforce_secure_chat {
                    return Err(DecodeError::MissingProfileKey);
                }
                Ok(PlayerChatMessage::unsigned(*sender, body.content))
            }
            Self::Signed {
                chain,
                public_key,
                validator,
            } => {
                let Some(signature) = signature else {
                    return Err(DecodeError::MissingProfileKey);
                };
                if public_key.data().has_expired() {
                    return Err(DecodeError::ExpiredProfileKey);
                }
                let Some(link) = chain.next_link else {
                    return Err(DecodeError::ChainBroken);
                };
                if body.time_stamp < chain.last_time_stamp {
                    chain.set_chain_broken();
                    return Err(DecodeError::OutOfOrderChat);
                }
                chain.last_time_stamp = body.time_stamp;

                let message =
                    PlayerChatMessage::new(link, Some(signature), body, None, FilterMask::PassThrough);
                if !message.verify(&*validator) {
                    chain.set_chain_broken();
                    return Err(DecodeError::InvalidSignature);
                }
                if message.has_expired_server(Utc::now()) {
                    log::warn!(
                        "Received expired chat: '{}'. Is the client/server system time unsynchronized?",
                        message.signed_content()
                    );
                }
                chain.next_link = link.advance();
                Ok(message)
            }
        }
    }

    /// Rejects every further message.
    pub const fn set_chain_broken(&mut self) {
        if let Self::Signed { chain, .. } = self {
            chain.set_chain_broken();
        }
    }
}
