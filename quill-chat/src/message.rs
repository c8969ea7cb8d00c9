//! The full chat message envelope.

use std::borrow::Cow;

use chrono::{DateTime, TimeDelta, Utc};
use quill_crypto::SignatureValidator;
use uuid::Uuid;

use crate::body::SignedMessageBody;
use crate::filter_mask::FilterMask;
use crate::last_seen::LastSeenMessages;
use crate::link::SignedMessageLink;
use crate::signature::MessageSignature;

/// Server-side lifetime of a message, after which its arrival is logged as clock skew.
pub const MESSAGE_EXPIRES_AFTER_SERVER: TimeDelta = TimeDelta::minutes(5);
/// Client-side lifetime of a message.
pub const MESSAGE_EXPIRES_AFTER_CLIENT: TimeDelta = TimeDelta::minutes(7);

/// Version prefix of the signed payload.
const SIGNED_PAYLOAD_VERSION: i32 = 1;

/// A chat message as it travels from sender to receivers.
///
/// Decorating or filtering a message never touches what was signed: both are
/// layered on top through `unsigned_content` and `filter_mask`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerChatMessage {
    link: SignedMessageLink,
    signature: Option<MessageSignature>,
    signed_body: SignedMessageBody,
    unsigned_content: Option<String>,
    filter_mask: FilterMask,
}

impl PlayerChatMessage {
    /// Assembles a message.
    #[must_use]
    pub const fn new(
        link: SignedMessageLink,
        signature: Option<MessageSignature>,
        signed_body: SignedMessageBody,
        unsigned_content: Option<String>,
        filter_mask: FilterMask,
    ) -> Self {
        Self {
            link,
            signature,
            signed_body,
            unsigned_content,
            filter_mask,
        }
    }

    /// A message from the server itself.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::unsigned(Uuid::nil(), content)
    }

    /// A message from `sender` that carries no signature.
    #[must_use]
    pub fn unsigned(sender: Uuid, content: impl Into<String>) -> Self {
        Self::new(
            SignedMessageLink::unsigned(sender),
            None,
            SignedMessageBody::unsigned(content.into()),
            None,
            FilterMask::PassThrough,
        )
    }

    /// Shows `content` instead of the signed text. Passing the signed text
    /// itself clears the override.
    #[must_use]
    pub fn with_unsigned_content(self, content: impl Into<String>) -> Self {
        let content = content.into();
        let unsigned_content = (content != self.signed_body.content).then_some(content);
        Self {
            unsigned_content,
            ..self
        }
    }

    /// Drops the unsigned override.
    #[must_use]
    pub fn remove_unsigned_content(self) -> Self {
        Self {
            unsigned_content: None,
            ..self
        }
    }

    /// Replaces the filter mask.
    #[must_use]
    pub fn filter(self, filter_mask: FilterMask) -> Self {
        Self {
            filter_mask,
            ..self
        }
    }

    /// Hides the whole message when `filtered`, otherwise leaves it as is.
    #[must_use]
    pub fn filter_if(self, filtered: bool) -> Self {
        if filtered {
            self.filter(FilterMask::FullyFiltered)
        } else {
            self
        }
    }

    /// The same message without signature or signed history.
    ///
    /// Receivers will treat it as unsigned.
    #[must_use]
    pub fn remove_signature(self) -> Self {
        let body = SignedMessageBody::new(
            self.signed_body.content.clone(),
            self.signed_body.time_stamp,
            0,
            LastSeenMessages::empty(),
        );
        Self {
            link: SignedMessageLink::unsigned(self.link.sender),
            signature: None,
            signed_body: body,
            ..self
        }
    }

    /// Appends the bytes a sender signs for `body` at `link`.
    pub fn update_signature(output: &mut Vec<u8>, link: &SignedMessageLink, body: &SignedMessageBody) {
        output.extend_from_slice(&SIGNED_PAYLOAD_VERSION.to_be_bytes());
        link.update_signature(output);
        body.update_signature(output);
    }

    /// The bytes the signature of `body` at `link` covers.
    #[must_use]
    pub fn signed_payload(link: &SignedMessageLink, body: &SignedMessageBody) -> Vec<u8> {
        let mut payload = Vec::new();
        Self::update_signature(&mut payload, link, body);
        payload
    }

    /// Checks the signature. Messages without one never verify.
    #[must_use]
    pub fn verify(&self, validator: &dyn SignatureValidator) -> bool {
        self.signature.as_ref().is_some_and(|signature| {
            signature.verify(validator, &Self::signed_payload(&self.link, &self.signed_body))
        })
    }

    /// The text covered by the signature.
    #[must_use]
    pub fn signed_content(&self) -> &str {
        &self.signed_body.content
    }

    /// The text to display: the unsigned override if there is one.
    #[must_use]
    pub fn decorated_content(&self) -> &str {
        self.unsigned_content
            .as_deref()
            .unwrap_or(&self.signed_body.content)
    }

    /// The decorated content with the filter mask applied, or `None` if fully filtered.
    #[must_use]
    pub fn filtered_content(&self) -> Option<Cow<'_, str>> {
        self.filter_mask.apply(self.decorated_content())
    }

    /// Whether a server would consider the message stale at `now`.
    #[must_use]
    pub fn has_expired_server(&self, now: DateTime<Utc>) -> bool {
        now > self.time_stamp() + MESSAGE_EXPIRES_AFTER_SERVER
    }

    /// Whether a client would consider the message stale at `now`.
    #[must_use]
    pub fn has_expired_client(&self, now: DateTime<Utc>) -> bool {
        now > self.time_stamp() + MESSAGE_EXPIRES_AFTER_CLIENT
    }

    /// The message's position in its sender's chain.
    #[must_use]
    pub const fn link(&self) -> &SignedMessageLink {
        &self.link
    }

    /// The signature, if the message is signed.
    #[must_use]
    pub const fn signature(&self) -> Option<&MessageSignature> {
        self.signature.as_ref()
    }

    /// The signed payload.
    #[must_use]
    pub const fn signed_body(&self) -> &SignedMessageBody {
        &self.signed_body
    }

    /// The unsigned override, if any.
    #[must_use]
    pub fn unsigned_content(&self) -> Option<&str> {
        self.unsigned_content.as_deref()
    }

    /// What a filter hid from the message.
    #[must_use]
    pub const fn filter_mask(&self) -> &FilterMask {
        &self.filter_mask
    }

    /// When the sender wrote the message.
    #[must_use]
    pub const fn time_stamp(&self) -> DateTime<Utc> {
        self.signed_body.time_stamp
    }

    /// The signature salt.
    #[must_use]
    pub const fn salt(&self) -> i64 {
        self.signed_body.salt
    }

    /// The sending player, nil for system messages.
    #[must_use]
    pub const fn sender(&self) -> Uuid {
        self.link.sender
    }

    /// Whether the server sent the message.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.link.sender.is_nil()
    }

    /// Whether the message is signed.
    #[must_use]
    pub const fn has_signature(&self) -> bool {
        self.signature.is_some()
    }

    /// Whether the message is signed and was sent by `sender`.
    #[must_use]
    pub fn has_signature_from(&self, sender: Uuid) -> bool {
        self.has_signature() && self.link.sender == sender
    }

    /// Whether a filter hid the whole message.
    #[must_use]
    pub const fn is_fully_filtered(&self) -> bool {
        self.filter_mask.is_fully_filtered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{key_pair, signature};
    use quill_crypto::Signer;

    fn signed(content: &str) -> (PlayerChatMessage, quill_crypto::ProfileKeyPair) {
        let keys = key_pair();
        let link = SignedMessageLink::root(Uuid::new_v4(), Uuid::new_v4());
        let body = SignedMessageBody::new(
            content.to_string(),
            crate::body::now(),
            42,
            LastSeenMessages::new(vec![signature(9)]),
        );
        let bytes = keys
            .signer()
            .sign(&PlayerChatMessage::signed_payload(&link, &body))
            .expect("sign");
        let sig = MessageSignature::from_slice(&bytes).expect("256 bytes");
        let message = PlayerChatMessage::new(link, Some(sig), body, None, FilterMask::PassThrough);
        (message, keys)
    }

    #[test]
    fn test_payload_starts_with_version() {
        let link = SignedMessageLink::root(Uuid::new_v4(), Uuid::new_v4());
        let body = SignedMessageBody::unsigned("x".to_string());
        let payload = PlayerChatMessage::signed_payload(&link, &body);
        assert_eq!(&payload[..4], &[0, 0, 0, 1]);
        assert_eq!(&payload[4..20], link.sender.as_bytes());
    }

    #[test]
    fn test_verify_signed_message() {
        let (message, keys) = signed("hello");
        let validator = keys.public_key.create_signature_validator();
        assert!(message.verify(&validator));
        assert!(message.has_signature_from(message.sender()));
        assert!(!message.has_signature_from(Uuid::new_v4()));

        // Decoration and filtering leave the signature intact.
        let decorated = message
            .clone()
            .with_unsigned_content("[hello]")
            .filter_if(true);
        assert!(decorated.verify(&validator));
        assert!(decorated.is_fully_filtered());
        assert_eq!(decorated.filtered_content(), None);

        let stripped = message.remove_signature();
        assert!(!stripped.has_signature());
        assert!(!stripped.verify(&validator));
        assert_eq!(stripped.signed_content(), "hello");
        assert!(stripped.signed_body().last_seen.entries().is_empty());
    }

    #[test]
    fn test_decorated_content() {
        let message = PlayerChatMessage::unsigned(Uuid::new_v4(), "hi");
        assert_eq!(message.decorated_content(), "hi");
        assert!(!message.is_system());

        let decorated = message.with_unsigned_content("<b>hi</b>");
        assert_eq!(decorated.decorated_content(), "<b>hi</b>");
        assert_eq!(decorated.signed_content(), "hi");

        // Same text as the signed content is not an override.
        let same = decorated.clone().with_unsigned_content("hi");
        assert_eq!(same.unsigned_content(), None);
        assert_eq!(decorated.remove_unsigned_content().unsigned_content(), None);
    }

    #[test]
    fn test_system_message() {
        let message = PlayerChatMessage::system("Server restarting");
        assert!(message.is_system());
        assert!(!message.has_signature());
        assert_eq!(message.salt(), 0);
    }

    #[test]
    fn test_expiry() {
        let message = PlayerChatMessage::system("x");
        let sent = message.time_stamp();
        assert!(!message.has_expired_server(sent + TimeDelta::minutes(5)));
        assert!(message.has_expired_server(sent + TimeDelta::minutes(6)));
        assert!(!message.has_expired_client(sent + TimeDelta::minutes(6)));
        assert!(message.has_expired_client(sent + TimeDelta::minutes(8)));
    }
}
