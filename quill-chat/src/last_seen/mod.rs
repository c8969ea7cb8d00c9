//! The "last seen" acknowledgment window.
//!
//! Every signed message carries the signatures of the most recent messages
//! its sender had seen. The sender side keeps a [`LastSeenMessagesTracker`]
//! and sends a compact [`LastSeenUpdate`] with each chat; the receiving side
//! replays it through a [`LastSeenMessagesValidator`] to rebuild the exact
//! list, failing if the two views of history disagree.

mod tracker;
mod validator;

use std::io::{Read, Result, Write};

use quill_utils::BitSet;
use quill_utils::codec::VarInt;
use quill_utils::serial::{ReadFrom, WriteTo, read_list, write_list};

use crate::signature::{MessageSignature, PackedSignature};
use crate::signature_cache::MessageSignatureCache;

pub use tracker::{LastSeenMessagesTracker, TrackerUpdate};
pub use validator::{LastSeenMessagesValidator, LastSeenValidationError};

/// Largest number of signatures a last-seen list may hold.
pub const LAST_SEEN_MESSAGES_MAX_LENGTH: usize = 20;

/// The signatures a sender acknowledges, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LastSeenMessages {
    entries: Vec<MessageSignature>,
}

impl LastSeenMessages {
    /// An empty list.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Wraps a list of signatures.
    #[must_use]
    pub const fn new(entries: Vec<MessageSignature>) -> Self {
        Self { entries }
    }

    /// The acknowledged signatures.
    #[must_use]
    pub fn entries(&self) -> &[MessageSignature] {
        &self.entries
    }

    /// Appends the signed form: the big-endian count, then each raw signature.
    pub fn update_signature(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&(self.entries.len() as i32).to_be_bytes());
        for signature in &self.entries {
            output.extend_from_slice(signature.bytes());
        }
    }

    /// Replaces each signature with its cache slot where possible.
    #[must_use]
    pub fn pack(&self, cache: &MessageSignatureCache) -> PackedLastSeenMessages {
        PackedLastSeenMessages {
            entries: self.entries.iter().map(|s| s.pack(cache)).collect(),
        }
    }
}

/// Wire form of [`LastSeenMessages`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedLastSeenMessages {
    /// Packed signatures, oldest first.
    pub entries: Vec<PackedSignature>,
}

impl PackedLastSeenMessages {
    /// Resolves every entry, or `None` if any of them names an empty cache slot.
    #[must_use]
    pub fn unpack(&self, cache: &MessageSignatureCache) -> Option<LastSeenMessages> {
        self.entries
            .iter()
            .map(|entry| entry.unpack(cache))
            .collect::<Option<Vec<_>>>()
            .map(LastSeenMessages::new)
    }
}

impl WriteTo for PackedLastSeenMessages {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        write_list(writer, &self.entries, LAST_SEEN_MESSAGES_MAX_LENGTH)
    }
}

impl ReadFrom for PackedLastSeenMessages {
    fn read(data: &mut impl Read) -> Result<Self> {
        Ok(Self {
            entries: read_list(data, LAST_SEEN_MESSAGES_MAX_LENGTH)?,
        })
    }
}

/// What the sender tells the receiver along with each chat message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LastSeenUpdate {
    /// How many messages arrived since the previous update.
    pub offset: i32,
    /// Bit `i` is set if window slot `i` holds an acknowledged message.
    pub acknowledged: BitSet,
}

impl WriteTo for LastSeenUpdate {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        VarInt(self.offset).write(writer)?;
        self.acknowledged
            .write_fixed(writer, LAST_SEEN_MESSAGES_MAX_LENGTH)
    }
}

impl ReadFrom for LastSeenUpdate {
    fn read(data: &mut impl Read) -> Result<Self> {
        Ok(Self {
            offset: VarInt::read(data)?.0,
            acknowledged: BitSet::read_fixed(data, LAST_SEEN_MESSAGES_MAX_LENGTH)?,
        })
    }
}

/// A window slot: the signature and whether it is still waiting to be acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastSeenTrackedEntry {
    /// The tracked signature.
    pub signature: MessageSignature,
    /// `true` until the entry has been reported in an update.
    pub pending: bool,
}

impl LastSeenTrackedEntry {
    /// A freshly tracked, not yet acknowledged entry.
    #[must_use]
    pub const fn pending(signature: MessageSignature) -> Self {
        Self {
            signature,
            pending: true,
        }
    }

    /// The same entry marked as acknowledged.
    #[must_use]
    pub fn acknowledge(self) -> Self {
        Self {
            pending: false,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::test_support::signature;

    #[test]
    fn test_signed_layout() {
        let last_seen = LastSeenMessages::new(vec![signature(1), signature(2)]);
        let mut out = Vec::new();
        last_seen.update_signature(&mut out);

        assert_eq!(out.len(), 4 + 2 * 256);
        assert_eq!(&out[..4], &[0, 0, 0, 2]);
        assert_eq!(out[4], 1);
        assert_eq!(out[4 + 256], 2);
    }

    #[test]
    fn test_pack_mixes_cached_and_full() {
        let mut cache = MessageSignatureCache::new(4);
        cache.push(&[signature(1)]);
        let last_seen = LastSeenMessages::new(vec![signature(1), signature(2)]);

        let packed = last_seen.pack(&cache);
        assert_eq!(
            packed.entries,
            vec![PackedSignature::Cached(0), PackedSignature::Full(signature(2))]
        );
        assert_eq!(packed.unpack(&cache), Some(last_seen));
    }

    #[test]
    fn test_unpack_fails_on_any_unknown_slot() {
        let cache = MessageSignatureCache::new(4);
        let packed = PackedLastSeenMessages {
            entries: vec![PackedSignature::Full(signature(1)), PackedSignature::Cached(3)],
        };
        assert_eq!(packed.unpack(&cache), None);
    }

    #[test]
    fn test_packed_list_is_capped_at_twenty() {
        let packed = PackedLastSeenMessages {
            entries: vec![PackedSignature::Cached(0); LAST_SEEN_MESSAGES_MAX_LENGTH + 1],
        };
        assert!(packed.write(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_update_wire_layout() {
        let update = LastSeenUpdate {
            offset: 3,
            acknowledged: [0, 19].into_iter().collect(),
        };
        let mut buf = Vec::new();
        update.write(&mut buf).expect("writing to a Vec cannot fail");
        assert_eq!(buf, [3, 0b0000_0001, 0, 0b0000_1000]);

        let read = LastSeenUpdate::read(&mut Cursor::new(buf)).expect("valid");
        assert_eq!(read, update);
    }

    #[test]
    fn test_acknowledge_clears_pending() {
        let entry = LastSeenTrackedEntry::pending(signature(5));
        assert!(entry.pending);
        let acknowledged = entry.acknowledge();
        assert!(!acknowledged.pending);
        assert_eq!(acknowledged.signature, signature(5));
    }
}
