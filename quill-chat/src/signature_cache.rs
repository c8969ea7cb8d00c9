//! Most-recently-used dictionary of message signatures.
//!
//! Both ends of a connection keep one of these and refer to signatures by slot
//! instead of sending all 256 bytes. The two caches are never exchanged; they
//! stay identical only because both sides call [`MessageSignatureCache::push_body`]
//! for exactly the same accepted messages, in the same order. Missing a single
//! push on either side desynchronizes the connection for good.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::body::SignedMessageBody;
use crate::signature::MessageSignature;

/// Default number of cache slots.
pub const DEFAULT_CAPACITY: usize = 128;

/// Fixed-size signature cache, most recent entry in slot 0.
#[derive(Clone, Debug)]
pub struct MessageSignatureCache {
    entries: Box<[Option<MessageSignature>]>,
}

impl MessageSignatureCache {
    /// Creates an empty cache with `size` slots.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![None; size].into_boxed_slice(),
        }
    }

    /// Creates an empty cache with [`DEFAULT_CAPACITY`] slots.
    #[must_use]
    pub fn create_default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Slot holding `signature`, or `None` if it has to be sent in full.
    #[must_use]
    pub fn pack(&self, signature: &MessageSignature) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.as_ref() == Some(signature))
    }

    /// Signature in slot `index`, or `None` if the slot is empty or out of range.
    #[must_use]
    pub fn unpack(&self, index: usize) -> Option<MessageSignature> {
        self.entries.get(index).cloned().flatten()
    }

    /// Records an accepted message: its last-seen signatures followed by its own signature.
    pub fn push_body(&mut self, body: &SignedMessageBody, signature: Option<&MessageSignature>) {
        let mut batch = Vec::with_capacity(body.last_seen.entries().len() + 1);
        batch.extend_from_slice(body.last_seen.entries());
        batch.extend(signature.cloned());
        self.push(&batch);
    }

    /// Pushes `batch` so that its last element ends up in slot 0.
    ///
    /// Existing entries move back behind the batch and the oldest fall off the
    /// end. A signature that appears more than once in `batch` is only kept at
    /// its first position, and is never duplicated by an older cached copy.
    pub fn push(&mut self, batch: &[MessageSignature]) {
        let mut in_batch = FxHashSet::default();
        let mut pending: VecDeque<MessageSignature> = batch
            .iter()
            .filter(|signature| in_batch.insert((*signature).clone()))
            .cloned()
            .collect();

        for slot in self.entries.iter_mut() {
            let Some(next) = pending.pop_back() else {
                break;
            };
            if let Some(previous) = slot.replace(next)
                && !in_batch.contains(&previous)
            {
                pending.push_front(previous);
            }
        }
    }
}

impl Default for MessageSignatureCache {
    fn default() -> Self {
        Self::create_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::last_seen::LastSeenMessages;
    use crate::test_support::signature;

    fn slots(cache: &MessageSignatureCache) -> Vec<Option<u8>> {
        (0..cache.capacity())
            .map(|i| cache.unpack(i).map(|s| s.bytes()[0]))
            .collect()
    }

    #[test]
    fn test_push_orders_most_recent_first() {
        let mut cache = MessageSignatureCache::new(4);
        cache.push(&[signature(1), signature(2)]);
        assert_eq!(slots(&cache), [Some(2), Some(1), None, None]);

        cache.push(&[signature(3)]);
        assert_eq!(slots(&cache), [Some(3), Some(2), Some(1), None]);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut cache = MessageSignatureCache::new(3);
        cache.push(&[signature(1), signature(2), signature(3)]);
        cache.push(&[signature(4), signature(5)]);
        assert_eq!(slots(&cache), [Some(5), Some(4), Some(3)]);
        assert_eq!(cache.pack(&signature(1)), None);
    }

    #[test]
    fn test_repushed_signature_moves_to_front_without_duplicate() {
        let mut cache = MessageSignatureCache::new(4);
        cache.push(&[signature(1), signature(2), signature(3)]);
        cache.push(&[signature(1)]);
        assert_eq!(slots(&cache), [Some(1), Some(3), Some(2), None]);
    }

    #[test]
    fn test_duplicate_in_batch_matches_deduplicated_batch() {
        let mut with_duplicates = MessageSignatureCache::new(5);
        let mut deduplicated = MessageSignatureCache::new(5);
        with_duplicates.push(&[signature(9)]);
        deduplicated.push(&[signature(9)]);

        with_duplicates.push(&[signature(1), signature(2), signature(1), signature(3)]);
        deduplicated.push(&[signature(1), signature(2), signature(3)]);

        assert_eq!(slots(&with_duplicates), slots(&deduplicated));
        assert_eq!(slots(&deduplicated), [Some(3), Some(2), Some(1), Some(9), None]);
    }

    #[test]
    fn test_identical_push_sequences_stay_in_sync() {
        let mut sender = MessageSignatureCache::new(8);
        let mut receiver = MessageSignatureCache::new(8);

        let batches: Vec<Vec<MessageSignature>> = (0u8..30)
            .map(|i| (0..=i % 4).map(|j| signature(i.wrapping_mul(7) + j)).collect())
            .collect();

        for batch in &batches {
            sender.push(batch);
            receiver.push(batch);
            for probe in 0u8..=255 {
                assert_eq!(sender.pack(&signature(probe)), receiver.pack(&signature(probe)));
            }
            for slot in 0..8 {
                assert_eq!(sender.unpack(slot), receiver.unpack(slot));
            }
        }
    }

    #[test]
    fn test_push_body_appends_own_signature_last() {
        let mut cache = MessageSignatureCache::new(4);
        let body = SignedMessageBody::new(
            "hi".to_string(),
            chrono::Utc::now(),
            0,
            LastSeenMessages::new(vec![signature(1), signature(2)]),
        );
        cache.push_body(&body, Some(&signature(3)));
        assert_eq!(slots(&cache), [Some(3), Some(2), Some(1), None]);

        cache.push_body(&SignedMessageBody::unsigned("plain".to_string()), None);
        assert_eq!(slots(&cache), [Some(3), Some(2), Some(1), None]);
    }
}
