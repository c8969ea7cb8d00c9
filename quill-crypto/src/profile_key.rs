//! Profile public keys: the expiring, authority-signed keys players sign chat with.

use std::io::{Error, ErrorKind, Read, Result as IoResult, Write};

use chrono::{DateTime, TimeDelta, Utc};
use quill_utils::serial::{ReadFrom, WriteTo, read_byte_array, write_byte_array};
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;
use uuid::Uuid;

use crate::signing::{
    RsaSignatureValidator, RsaSigner, SignatureValidator, decode_public_key, encode_public_key,
};

/// How long after expiry a key is still tolerated by validators that ask for a grace period.
pub const EXPIRY_GRACE_PERIOD: TimeDelta = TimeDelta::hours(8);

/// An error that can occur while accepting a profile public key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileKeyError {
    /// The key was not signed by the authority for this profile.
    #[error("Invalid signature for profile public key")]
    InvalidSignature,
    /// The key has already expired.
    #[error("Expired profile public key")]
    Expired,
}

/// The wire form of a profile public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfilePublicKeyData {
    /// When the key stops being valid.
    pub expires_at: DateTime<Utc>,
    /// The RSA public key.
    pub key: RsaPublicKey,
    /// The authority's signature over [`signed_payload`](Self::signed_payload).
    pub key_signature: Vec<u8>,
}

impl ProfilePublicKeyData {
    /// Largest accepted DER encoding of the key.
    pub const MAX_KEY_SIZE: usize = 512;
    /// Largest accepted authority signature.
    pub const MAX_KEY_SIGNATURE_SIZE: usize = 4096;

    /// The bytes the authority signs: profile id, expiry millis, then the DER-encoded key.
    #[must_use]
    pub fn signed_payload(&self, profile_id: Uuid) -> Vec<u8> {
        Self::payload(profile_id, self.expires_at, &self.key)
    }

    pub(crate) fn payload(profile_id: Uuid, expires_at: DateTime<Utc>, key: &RsaPublicKey) -> Vec<u8> {
        let encoded = encode_public_key(key);
        let mut payload = Vec::with_capacity(24 + encoded.len());
        payload.extend_from_slice(profile_id.as_bytes());
        payload.extend_from_slice(&expires_at.timestamp_millis().to_be_bytes());
        payload.extend_from_slice(&encoded);
        payload
    }

    /// Checks the authority's signature for `profile_id`.
    #[must_use]
    pub fn validate_signature(&self, authority: &dyn SignatureValidator, profile_id: Uuid) -> bool {
        authority.validate(&self.signed_payload(profile_id), &self.key_signature)
    }

    /// Whether the key has expired.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.has_expired_at(Utc::now())
    }

    /// Whether the key had expired at `now`.
    #[must_use]
    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Whether the key expired more than `grace_period` ago.
    #[must_use]
    pub fn has_expired_with_grace(&self, grace_period: TimeDelta) -> bool {
        self.expires_at + grace_period < Utc::now()
    }
}

impl WriteTo for ProfilePublicKeyData {
    fn write(&self, writer: &mut impl Write) -> IoResult<()> {
        self.expires_at.write(writer)?;
        write_byte_array(writer, &encode_public_key(&self.key))?;
        write_byte_array(writer, &self.key_signature)
    }
}

impl ReadFrom for ProfilePublicKeyData {
    fn read(data: &mut impl Read) -> IoResult<Self> {
        let expires_at = DateTime::<Utc>::read(data)?;
        let der = read_byte_array(data, Self::MAX_KEY_SIZE)?;
        let key =
            decode_public_key(&der).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        let key_signature = read_byte_array(data, Self::MAX_KEY_SIGNATURE_SIZE)?;
        Ok(Self {
            expires_at,
            key,
            key_signature,
        })
    }
}

/// A profile public key whose authority signature has been checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfilePublicKey {
    data: ProfilePublicKeyData,
}

impl ProfilePublicKey {
    /// Accepts `data` for `profile_id` if the authority signed it.
    pub fn create_validated(
        authority: &dyn SignatureValidator,
        profile_id: Uuid,
        data: ProfilePublicKeyData,
    ) -> Result<Self, ProfileKeyError> {
        if !data.validate_signature(authority, profile_id) {
            return Err(ProfileKeyError::InvalidSignature);
        }
        Ok(Self { data })
    }

    /// Wraps key data without checking its signature.
    ///
    /// Only for keys this process issued itself.
    #[must_use]
    pub const fn trusted(data: ProfilePublicKeyData) -> Self {
        Self { data }
    }

    /// The underlying key data.
    #[must_use]
    pub const fn data(&self) -> &ProfilePublicKeyData {
        &self.data
    }

    /// A validator for signatures made with the matching private key.
    #[must_use]
    pub fn create_signature_validator(&self) -> RsaSignatureValidator {
        RsaSignatureValidator::new(self.data.key.clone())
    }
}

/// A player's private key together with its authority-signed public half.
#[derive(Clone, Debug)]
pub struct ProfileKeyPair {
    /// The private key chat messages are signed with.
    pub private_key: RsaPrivateKey,
    /// The public half as handed out to peers.
    pub public_key: ProfilePublicKey,
    /// When the owner should fetch a new key pair.
    pub refreshed_after: DateTime<Utc>,
}

impl ProfileKeyPair {
    /// Whether it is time to fetch a new key pair.
    #[must_use]
    pub fn due_refresh(&self) -> bool {
        self.refreshed_after < Utc::now()
    }

    /// A signer for the private key.
    #[must_use]
    pub fn signer(&self) -> RsaSigner {
        RsaSigner::new(self.private_key.clone())
    }
}
