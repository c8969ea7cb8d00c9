//! Per-sender validation of received chat on the client.

use chrono::{DateTime, TimeDelta, Utc};
use quill_crypto::SignatureValidator;

use crate::message::PlayerChatMessage;

/// Whether a [`KeyBasedValidator`] still trusts its sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainState {
    /// Every message so far checked out.
    Valid,
    /// A message failed. Nothing from this session will be trusted again.
    Invalidated,
}

/// Validates one sender's messages against their session key and chain.
pub struct KeyBasedValidator {
    validator: Box<dyn SignatureValidator>,
    expires_at: DateTime<Utc>,
    grace_period: TimeDelta,
    last_message: Option<PlayerChatMessage>,
    state: ChainState,
}

impl KeyBasedValidator {
    /// Creates a validator for a key expiring at `expires_at`, tolerated for
    /// `grace_period` afterwards.
    #[must_use]
    pub fn new(
        validator: Box<dyn SignatureValidator>,
        expires_at: DateTime<Utc>,
        grace_period: TimeDelta,
    ) -> Self {
        Self {
            validator,
            expires_at,
            grace_period,
            last_message: None,
            state: ChainState::Valid,
        }
    }

    /// Current state of the chain.
    #[must_use]
    pub const fn state(&self) -> ChainState {
        self.state
    }

    /// The last message that was accepted.
    #[must_use]
    pub const fn last_message(&self) -> Option<&PlayerChatMessage> {
        self.last_message.as_ref()
    }

    /// Checks `message` and remembers it if it is trusted. Once a message
    /// fails, every later call returns `false`.
    pub fn update_and_validate(&mut self, message: &PlayerChatMessage) -> bool {
        if self.state == ChainState::Invalidated {
            return false;
        }
        if !self.validate(message) {
            self.state = ChainState::Invalidated;
            return false;
        }
        self.last_message = Some(message.clone());
        true
    }

    fn validate(&self, message: &PlayerChatMessage) -> bool {
        if self.expires_at + self.grace_period < Utc::now() {
            log::error!(
                "Received message with expired profile public key from {} with session {}",
                message.sender(),
                message.link().session_id
            );
            return false;
        }
        if !message.verify(self.validator.as_ref()) {
            log::error!(
                "Received message with invalid signature (is the session wrong, or signature cache out of sync?): '{}' from {}",
                message.signed_content(),
                message.sender()
            );
            return false;
        }
        self.validate_chain(message)
    }

    fn validate_chain(&self, message: &PlayerChatMessage) -> bool {
        let Some(last) = &self.last_message else {
            return true;
        };
        if message == last || message.link().is_descendant_of(last.link()) {
            return true;
        }
        log::error!(
            "Received out-of-order chat message from {}: expected index > {} for session {}, but was {} for session {}",
            message.sender(),
            last.link().index,
            last.link().session_id,
            message.link().index,
            message.link().session_id
        );
        false
    }
}

/// How a client treats the messages of one sender.
pub enum SignedMessageValidator {
    /// The sender has no session: only unsigned messages are accepted.
    AcceptUnsigned,
    /// The sender has no session and secure chat is enforced.
    RejectAll,
    /// The sender has a session.
    KeyBased(KeyBasedValidator),
}

impl SignedMessageValidator {
    /// Whether `message` can be trusted, updating the sender's state.
    pub fn update_and_validate(&mut self, message: &PlayerChatMessage) -> bool {
        match self {
            Self::AcceptUnsigned => {
                if message.has_signature() {
                    log::error!(
                        "Received message with signature from {}, but they have no public key",
                        message.sender()
                    );
                    return false;
                }
                true
            }
            Self::RejectAll => {
                log::error!(
                    "Received chat message from {}, but they have no chat session initialized and secure chat is enforced",
                    message.sender()
                );
                false
            }
            Self::KeyBased(validator) => validator.update_and_validate(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::body::SignedMessageBody;
    use crate::filter_mask::FilterMask;
    use crate::link::SignedMessageLink;
    use crate::test_support::signature;

    /// Accepts every signature that does not start with a zero byte.
    struct FirstByteValidator;

    impl SignatureValidator for FirstByteValidator {
        fn validate(&self, _data: &[u8], signature: &[u8]) -> bool {
            signature.first().is_some_and(|&b| b != 0)
        }
    }

    fn validator(expires_in: TimeDelta) -> KeyBasedValidator {
        KeyBasedValidator::new(
            Box::new(FirstByteValidator),
            Utc::now() + expires_in,
            TimeDelta::hours(8),
        )
    }

    fn message(link: SignedMessageLink, sig: u8) -> PlayerChatMessage {
        PlayerChatMessage::new(
            link,
            Some(signature(sig)),
            SignedMessageBody::unsigned(format!("#{}", link.index)),
            None,
            FilterMask::PassThrough,
        )
    }

    fn links(count: usize) -> Vec<SignedMessageLink> {
        std::iter::successors(
            Some(SignedMessageLink::root(Uuid::new_v4(), Uuid::new_v4())),
            SignedMessageLink::advance,
        )
        .take(count)
        .collect()
    }

    #[test]
    fn test_accepts_ascending_chain_and_redelivery() {
        let mut validator = validator(TimeDelta::hours(1));
        let links = links(3);

        let first = message(links[0], 1);
        assert!(validator.update_and_validate(&first));
        assert!(validator.update_and_validate(&first));
        // Gaps are fine as long as the index grows.
        assert!(validator.update_and_validate(&message(links[2], 1)));
        assert_eq!(validator.state(), ChainState::Valid);
        assert_eq!(validator.last_message().map(|m| m.link().index), Some(2));
    }

    #[test]
    fn test_out_of_order_invalidates() {
        let mut validator = validator(TimeDelta::hours(1));
        let links = links(2);
        assert!(validator.update_and_validate(&message(links[1], 1)));
        assert!(!validator.update_and_validate(&message(links[0], 1)));
        assert_eq!(validator.state(), ChainState::Invalidated);
    }

    #[test]
    fn test_invalidation_is_sticky() {
        let mut validator = validator(TimeDelta::hours(1));
        let links = links(4);
        assert!(validator.update_and_validate(&message(links[0], 1)));
        assert!(!validator.update_and_validate(&message(links[1], 0)));

        // Perfectly valid messages are refused from now on.
        assert!(!validator.update_and_validate(&message(links[2], 1)));
        assert!(!validator.update_and_validate(&message(links[3], 1)));
        assert_eq!(validator.last_message().map(|m| m.link().index), Some(0));
    }

    #[test]
    fn test_key_expiry_respects_grace_period() {
        let links = links(1);
        let mut within_grace = validator(TimeDelta::hours(-1));
        assert!(within_grace.update_and_validate(&message(links[0], 1)));

        let mut past_grace = validator(TimeDelta::hours(-9));
        assert!(!past_grace.update_and_validate(&message(links[0], 1)));
    }

    #[test]
    fn test_session_less_validators() {
        let sender = Uuid::new_v4();
        let unsigned = PlayerChatMessage::unsigned(sender, "hi");
        let signed = message(SignedMessageLink::root(sender, Uuid::new_v4()), 1);

        let mut accept = SignedMessageValidator::AcceptUnsigned;
        assert!(accept.update_and_validate(&unsigned));
        assert!(!accept.update_and_validate(&signed));

        let mut reject = SignedMessageValidator::RejectAll;
        assert!(!reject.update_and_validate(&unsigned));

        let mut key_based = SignedMessageValidator::KeyBased(validator(TimeDelta::hours(1)));
        assert!(key_based.update_and_validate(&signed));
        assert!(!key_based.update_and_validate(&unsigned));
    }
}
