//! Sender-side bookkeeping of which received messages have been seen.

use quill_utils::BitSet;

use super::{LastSeenMessages, LastSeenTrackedEntry, LastSeenUpdate};
use crate::signature::MessageSignature;

/// The result of flushing a [`LastSeenMessagesTracker`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerUpdate {
    /// The acknowledged signatures, to be included in the signed body.
    pub last_seen: LastSeenMessages,
    /// The compact form sent next to the message.
    pub update: LastSeenUpdate,
}

/// Fixed-size circular window over the most recently received signed messages.
///
/// Every received message takes one slot, displayed or not, so that the
/// receiver can shift its own window by the same offset.
#[derive(Clone, Debug)]
pub struct LastSeenMessagesTracker {
    tracked: Box<[Option<LastSeenTrackedEntry>]>,
    tail: usize,
    offset: i32,
    last_tracked: Option<MessageSignature>,
}

impl LastSeenMessagesTracker {
    /// Creates a tracker with a window of `size` slots.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            tracked: vec![None; size].into_boxed_slice(),
            tail: 0,
            offset: 0,
            last_tracked: None,
        }
    }

    /// Records a received message. Messages that were not displayed leave a
    /// hole in the window.
    ///
    /// Returns `false` if `signature` repeats the previously tracked message.
    pub fn add_pending(&mut self, signature: MessageSignature, displayed: bool) -> bool {
        if self.last_tracked.as_ref() == Some(&signature) {
            return false;
        }
        let entry = displayed.then(|| LastSeenTrackedEntry::pending(signature.clone()));
        self.last_tracked = Some(signature);
        self.add_entry(entry);
        true
    }

    fn add_entry(&mut self, entry: Option<LastSeenTrackedEntry>) {
        let index = self.tail;
        self.tail = (index + 1) % self.tracked.len();
        self.offset += 1;
        self.tracked[index] = entry;
    }

    /// Drops a message that is still waiting to be acknowledged.
    pub fn ignore_pending(&mut self, signature: &MessageSignature) {
        if let Some(slot) = self.tracked.iter_mut().find(|slot| {
            matches!(slot, Some(entry) if entry.pending && entry.signature == *signature)
        }) {
            *slot = None;
        }
    }

    /// Messages tracked since the last update.
    #[must_use]
    pub const fn offset(&self) -> i32 {
        self.offset
    }

    /// Returns [`offset`](Self::offset) and resets it to 0.
    pub const fn get_and_clear_offset(&mut self) -> i32 {
        let offset = self.offset;
        self.offset = 0;
        offset
    }

    /// Snapshots the window, oldest slot first, and acknowledges every entry in it.
    pub fn generate_and_apply_update(&mut self) -> TrackerUpdate {
        let offset = self.get_and_clear_offset();
        let size = self.tracked.len();
        let mut acknowledged = BitSet::new();
        let mut entries = Vec::with_capacity(size);

        for i in 0..size {
            let index = (self.tail + i) % size;
            if let Some(entry) = self.tracked[index].take() {
                acknowledged.set(i);
                entries.push(entry.signature.clone());
                self.tracked[index] = Some(entry.acknowledge());
            }
        }

        TrackerUpdate {
            last_seen: LastSeenMessages::new(entries),
            update: LastSeenUpdate {
                offset,
                acknowledged,
            },
        }
    }
}
