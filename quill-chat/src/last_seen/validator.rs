//! Receiver-side replay of the sender's last-seen window.

use std::collections::VecDeque;

use thiserror::Error;

use super::{LastSeenMessages, LastSeenTrackedEntry, LastSeenUpdate};
use crate::signature::MessageSignature;

/// The sender's acknowledgment does not match what was sent to it.
///
/// Every variant means the two ends no longer agree on the conversation history.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LastSeenValidationError {
    /// The offset is negative or skips messages that were never sent.
    #[error("Advanced last seen window by {offset} messages, but expected at most {max}")]
    OffsetOutOfRange {
        /// The offset the sender reported.
        offset: i32,
        /// The largest offset currently possible.
        max: usize,
    },
    /// The acknowledged bits reach past the window.
    #[error("Last seen update contained {len} messages, but maximum window size is {max}")]
    WindowTooLarge {
        /// Highest acknowledged bit plus one.
        len: usize,
        /// Window size.
        max: usize,
    },
    /// A set bit points at a slot with no message in it.
    #[error("Last seen update acknowledged unknown or previously ignored message at index {0}")]
    UnknownMessage(usize),
    /// A clear bit points at a message that was acknowledged before.
    #[error("Last seen update ignored previously acknowledged message at index {0}")]
    IgnoredAcknowledged(usize),
}

/// Tracks the messages sent to one peer until it acknowledges or skips them.
#[derive(Clone, Debug)]
pub struct LastSeenMessagesValidator {
    last_seen_count: usize,
    tracked: VecDeque<Option<LastSeenTrackedEntry>>,
    last_pending: Option<MessageSignature>,
}

impl LastSeenMessagesValidator {
    /// Creates a validator for a window of `last_seen_count` slots.
    #[must_use]
    pub fn new(last_seen_count: usize) -> Self {
        Self {
            last_seen_count,
            tracked: std::iter::repeat_n(None, last_seen_count).collect(),
            last_pending: None,
        }
    }

    /// Records a message that was just sent to the peer.
    pub fn add_pending(&mut self, signature: MessageSignature) {
        if self.last_pending.as_ref() == Some(&signature) {
            return;
        }
        self.tracked
            .push_back(Some(LastSeenTrackedEntry::pending(signature.clone())));
        self.last_pending = Some(signature);
    }

    /// Number of slots held, including the window itself.
    #[must_use]
    pub fn tracked_messages_count(&self) -> usize {
        self.tracked.len()
    }

    /// Number of messages sent to the peer that it has not yet shifted past.
    #[must_use]
    pub fn unacknowledged_count(&self) -> usize {
        self.tracked.len() - self.last_seen_count
    }

    /// Shifts the window forward by `offset` messages.
    pub fn apply_offset(&mut self, offset: i32) -> Result<(), LastSeenValidationError> {
        let max = self.unacknowledged_count();
        match usize::try_from(offset) {
            Ok(shift) if shift <= max => {
                self.tracked.drain(..shift);
                Ok(())
            }
            _ => Err(LastSeenValidationError::OffsetOutOfRange { offset, max }),
        }
    }

    /// Applies the peer's update and returns the signatures it acknowledged, oldest first.
    ///
    /// On error the validator is left in an unspecified state and the peer must
    /// not be trusted any further.
    pub fn apply_update(
        &mut self,
        update: &LastSeenUpdate,
    ) -> Result<LastSeenMessages, LastSeenValidationError> {
        self.apply_offset(update.offset)?;

        if update.acknowledged.len() > self.last_seen_count {
            return Err(LastSeenValidationError::WindowTooLarge {
                len: update.acknowledged.len(),
                max: self.last_seen_count,
            });
        }

        let mut entries = Vec::with_capacity(update.acknowledged.cardinality());
        for (i, slot) in self.tracked.iter_mut().take(self.last_seen_count).enumerate() {
            if update.acknowledged.get(i) {
                let entry = slot
                    .take()
                    .ok_or(LastSeenValidationError::UnknownMessage(i))?;
                entries.push(entry.signature.clone());
                *slot = Some(entry.acknowledge());
            } else {
                if slot.as_ref().is_some_and(|entry| !entry.pending) {
                    return Err(LastSeenValidationError::IgnoredAcknowledged(i));
                }
                *slot = None;
            }
        }

        Ok(LastSeenMessages::new(entries))
    }
}
