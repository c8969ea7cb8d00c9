//! The signed payload of a chat message.

use std::io::{Read, Result, Write};

use chrono::{DateTime, SubsecRound, Utc};
use quill_utils::serial::{ReadFrom, WriteTo, read_bounded_string, write_bounded_str};

use crate::last_seen::{LastSeenMessages, PackedLastSeenMessages};
use crate::signature_cache::MessageSignatureCache;

/// Longest chat message, in UTF-16 code units.
pub const MAX_CONTENT_LENGTH: usize = 256;

/// Content, time stamp, salt and acknowledged history: everything the sender signs
/// besides the link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedMessageBody {
    /// The plain message text.
    pub content: String,
    /// When the sender wrote the message.
    pub time_stamp: DateTime<Utc>,
    /// Random value that makes every signature unique.
    pub salt: i64,
    /// Messages the sender had seen when sending this one.
    pub last_seen: LastSeenMessages,
}

impl SignedMessageBody {
    /// Creates a body.
    #[must_use]
    pub const fn new(
        content: String,
        time_stamp: DateTime<Utc>,
        salt: i64,
        last_seen: LastSeenMessages,
    ) -> Self {
        Self {
            content,
            time_stamp,
            salt,
            last_seen,
        }
    }

    /// A body for a message that will never be signed: no salt, no history.
    #[must_use]
    pub fn unsigned(content: String) -> Self {
        Self::new(content, now(), 0, LastSeenMessages::empty())
    }

    /// Appends the signed form: salt, epoch seconds, UTF-8 length and bytes, then last seen.
    ///
    /// Peers verify against exactly this layout.
    pub fn update_signature(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.salt.to_be_bytes());
        output.extend_from_slice(&self.time_stamp.timestamp().to_be_bytes());
        let content = self.content.as_bytes();
        output.extend_from_slice(&(content.len() as i32).to_be_bytes());
        output.extend_from_slice(content);
        self.last_seen.update_signature(output);
    }

    /// The wire form, with cached signatures replaced by their slots.
    #[must_use]
    pub fn pack(&self, cache: &MessageSignatureCache) -> PackedSignedMessageBody {
        PackedSignedMessageBody {
            content: self.content.clone(),
            time_stamp: self.time_stamp,
            salt: self.salt,
            last_seen: self.last_seen.pack(cache),
        }
    }
}

/// The current time at the wire's millisecond precision, so that a body
/// survives a trip over the network unchanged.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Wire form of [`SignedMessageBody`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedSignedMessageBody {
    /// The plain message text.
    pub content: String,
    /// When the sender wrote the message.
    pub time_stamp: DateTime<Utc>,
    /// The signature salt.
    pub salt: i64,
    /// Packed last-seen signatures.
    pub last_seen: PackedLastSeenMessages,
}

impl PackedSignedMessageBody {
    /// Resolves cached signatures, or `None` if one of them is unknown.
    #[must_use]
    pub fn unpack(&self, cache: &MessageSignatureCache) -> Option<SignedMessageBody> {
        let last_seen = self.last_seen.unpack(cache)?;
        Some(SignedMessageBody::new(
            self.content.clone(),
            self.time_stamp,
            self.salt,
            last_seen,
        ))
    }
}

impl WriteTo for PackedSignedMessageBody {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        write_bounded_str(writer, &self.content, MAX_CONTENT_LENGTH)?;
        self.time_stamp.write(writer)?;
        self.salt.write(writer)?;
        self.last_seen.write(writer)
    }
}

impl ReadFrom for PackedSignedMessageBody {
    fn read(data: &mut impl Read) -> Result<Self> {
        Ok(Self {
            content: read_bounded_string(data, MAX_CONTENT_LENGTH)?,
            time_stamp: DateTime::<Utc>::read(data)?,
            salt: i64::read(data)?,
            last_seen: PackedLastSeenMessages::read(data)?,
        })
    }
}
