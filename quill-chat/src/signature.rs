//! Message signatures and their cache-packed wire form.

use std::fmt;
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::sync::Arc;

use quill_crypto::{CryptoError, SignatureValidator};
use quill_utils::codec::VarInt;
use quill_utils::serial::{ReadFrom, WriteTo};

use crate::signature_cache::MessageSignatureCache;

/// Size in bytes of every message signature.
pub const SIGNATURE_BYTES: usize = 256;

/// A 256-byte chat message signature.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MessageSignature(Arc<[u8; SIGNATURE_BYTES]>);

impl MessageSignature {
    /// Wraps raw signature bytes.
    #[must_use]
    pub fn new(bytes: [u8; SIGNATURE_BYTES]) -> Self {
        Self(Arc::new(bytes))
    }

    /// Wraps a signature produced by a [`Signer`](quill_crypto::Signer), which must be exactly 256 bytes.
    pub fn from_slice(bytes: &[u8]) -> std::result::Result<Self, CryptoError> {
        let bytes: [u8; SIGNATURE_BYTES] =
            bytes.try_into().map_err(|_| CryptoError::SignatureLength {
                expected: SIGNATURE_BYTES,
                actual: bytes.len(),
            })?;
        Ok(Self::new(bytes))
    }

    /// The raw signature bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8; SIGNATURE_BYTES] {
        &self.0
    }

    /// Checks this signature over `payload`.
    #[must_use]
    pub fn verify(&self, validator: &dyn SignatureValidator, payload: &[u8]) -> bool {
        validator.validate(payload, self.bytes())
    }

    /// Replaces the signature with its cache id when `cache` holds it.
    #[must_use]
    pub fn pack(&self, cache: &MessageSignatureCache) -> PackedSignature {
        match cache.pack(self) {
            Some(id) => PackedSignature::Cached(id),
            None => PackedSignature::Full(self.clone()),
        }
    }
}

impl fmt::Debug for MessageSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageSignature({}..)", hex::encode(&self.0[..8]))
    }
}

impl WriteTo for MessageSignature {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(self.bytes())
    }
}

impl ReadFrom for MessageSignature {
    fn read(data: &mut impl Read) -> Result<Self> {
        let mut bytes = [0u8; SIGNATURE_BYTES];
        data.read_exact(&mut bytes)?;
        Ok(Self::new(bytes))
    }
}

/// A signature on the wire: either a slot in the receiver's cache or the full bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackedSignature {
    /// Index into the shared [`MessageSignatureCache`].
    Cached(usize),
    /// The signature was not cached.
    Full(MessageSignature),
}

impl PackedSignature {
    /// Resolves the signature, or `None` if it names a cache slot that is empty.
    #[must_use]
    pub fn unpack(&self, cache: &MessageSignatureCache) -> Option<MessageSignature> {
        match self {
            Self::Cached(id) => cache.unpack(*id),
            Self::Full(signature) => Some(signature.clone()),
        }
    }
}

impl WriteTo for PackedSignature {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        match self {
            Self::Cached(id) => VarInt(*id as i32 + 1).write(writer),
            Self::Full(signature) => {
                VarInt(0).write(writer)?;
                signature.write(writer)
            }
        }
    }
}

impl ReadFrom for PackedSignature {
    fn read(data: &mut impl Read) -> Result<Self> {
        match VarInt::read(data)?.0 {
            0 => Ok(Self::Full(MessageSignature::read(data)?)),
            id if id > 0 => Ok(Self::Cached((id - 1) as usize)),
            id => Err(Error::new(
                ErrorKind::InvalidData,
                format!("Invalid packed signature id {id}"),
            )),
        }
    }
}
