//! Chat configuration shared by both ends of a connection.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Secure chat settings.
///
/// `signature_cache_size` must be the same on the server and all clients, or
/// cached signature ids will not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Reject chat from players without a chat session.
    pub enforce_secure_chat: bool,
    /// How long after expiry a sender's profile key is still accepted by clients.
    pub key_expiry_grace_period_hours: i64,
    /// Number of slots in the message signature cache.
    pub signature_cache_size: usize,
    /// Clients acknowledge once this many messages arrived since their last update.
    pub ack_threshold: i32,
    /// Disconnect a client that leaves more than this many messages unacknowledged.
    pub max_unacknowledged: usize,
}

impl ChatConfig {
    /// The grace period as a duration.
    #[must_use]
    pub const fn key_expiry_grace_period(&self) -> TimeDelta {
        TimeDelta::hours(self.key_expiry_grace_period_hours)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enforce_secure_chat: true,
            key_expiry_grace_period_hours: 8,
            signature_cache_size: 128,
            ack_threshold: 64,
            max_unacknowledged: 4096,
        }
    }
}
