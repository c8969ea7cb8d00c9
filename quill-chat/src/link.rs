//! A message's position in its sender's chain.

use uuid::Uuid;

/// Identifies the `index`-th message a sender signed in one chat session.
///
/// Indices start at 0 and grow by exactly one per message. A chain cannot be
/// advanced past `i32::MAX`; the sender has to open a new session instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignedMessageLink {
    /// Position in the chain, never negative.
    pub index: i32,
    /// The player who signed the message.
    pub sender: Uuid,
    /// The chat session the message belongs to.
    pub session_id: Uuid,
}

impl SignedMessageLink {
    /// The first link of a chain.
    #[must_use]
    pub const fn root(sender: Uuid, session_id: Uuid) -> Self {
        Self {
            index: 0,
            sender,
            session_id,
        }
    }

    /// The link carried by unsigned messages: no session.
    #[must_use]
    pub const fn unsigned(sender: Uuid) -> Self {
        Self::root(sender, Uuid::nil())
    }

    /// The next link, or `None` once the chain is exhausted.
    #[must_use]
    pub const fn advance(&self) -> Option<Self> {
        if self.index == i32::MAX {
            return None;
        }
        Some(Self {
            index: self.index + 1,
            sender: self.sender,
            session_id: self.session_id,
        })
    }

    /// Whether `self` comes strictly after `other` in the same chain.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        self.index > other.index && self.sender == other.sender && self.session_id == other.session_id
    }

    /// Appends the signed form: sender, session, then the big-endian index.
    pub fn update_signature(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(self.sender.as_bytes());
        output.extend_from_slice(self.session_id.as_bytes());
        output.extend_from_slice(&self.index.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_increments_by_one() {
        let root = SignedMessageLink::root(Uuid::new_v4(), Uuid::new_v4());
        let next = root.advance().expect("not exhausted");
        assert_eq!(next.index, 1);
        assert_eq!(next.sender, root.sender);
        assert_eq!(next.session_id, root.session_id);
    }

    #[test]
    fn test_advance_at_max_is_exhausted() {
        let link = SignedMessageLink {
            index: i32::MAX,
            sender: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
        };
        assert_eq!(link.advance(), None);

        let almost = SignedMessageLink {
            index: i32::MAX - 1,
            ..link
        };
        assert_eq!(almost.advance(), Some(link));
    }

    #[test]
    fn test_descendant_requires_same_chain_and_greater_index() {
        let root = SignedMessageLink::root(Uuid::new_v4(), Uuid::new_v4());
        let next = root.advance().expect("not exhausted");

        assert!(next.is_descendant_of(&root));
        assert!(!root.is_descendant_of(&next));
        assert!(!root.is_descendant_of(&root));

        let other_session = SignedMessageLink {
            session_id: Uuid::new_v4(),
            ..next
        };
        assert!(!other_session.is_descendant_of(&root));

        let other_sender = SignedMessageLink {
            sender: Uuid::new_v4(),
            ..next
        };
        assert!(!other_sender.is_descendant_of(&root));
    }

    #[test]
    fn test_signed_layout() {
        let sender = Uuid::from_u128(0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10);
        let link = SignedMessageLink {
            index: 0x0A0B_0C0D,
            sender,
            session_id: Uuid::nil(),
        };
        let mut out = Vec::new();
        link.update_signature(&mut out);

        assert_eq!(out.len(), 36);
        assert_eq!(&out[..16], sender.as_bytes());
        assert_eq!(&out[16..32], &[0u8; 16]);
        assert_eq!(&out[32..], &[0x0A, 0x0B, 0x0C, 0x0D]);
    }
}
