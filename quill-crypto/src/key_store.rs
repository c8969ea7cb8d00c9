//! The signing authority that vouches for players' profile keys.

use chrono::{TimeDelta, Utc};
use rsa::{RsaPrivateKey, RsaPublicKey};
use uuid::Uuid;

use crate::profile_key::{ProfileKeyPair, ProfilePublicKey, ProfilePublicKeyData};
use crate::signing::{CryptoError, RsaSignatureValidator, RsaSigner, Signer, generate_private_key};

/// Default lifetime of an issued profile key.
pub const PROFILE_KEY_LIFETIME: TimeDelta = TimeDelta::hours(48);

/// Holds the authority key pair and issues profile keys signed by it.
pub struct KeyStore {
    signer: RsaSigner,
    public_key: RsaPublicKey,
}

impl KeyStore {
    /// Creates a key store with a freshly generated authority key.
    pub fn create() -> Result<Self, CryptoError> {
        let private_key = generate_private_key()?;
        log::debug!("Generated profile key authority");
        Ok(Self::from_private_key(private_key))
    }

    /// Creates a key store around an existing authority key.
    #[must_use]
    pub fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        Self {
            signer: RsaSigner::new(private_key),
            public_key,
        }
    }

    /// The authority's public key.
    #[must_use]
    pub const fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// A validator that checks signatures made by this authority.
    #[must_use]
    pub fn signature_validator(&self) -> RsaSignatureValidator {
        RsaSignatureValidator::new(self.public_key.clone())
    }

    /// Generates and signs a new profile key pair for `profile_id`, valid for `lifetime`.
    pub fn issue_profile_keys(
        &self,
        profile_id: Uuid,
        lifetime: TimeDelta,
    ) -> Result<ProfileKeyPair, CryptoError> {
        self.issue_for_key(profile_id, generate_private_key()?, lifetime)
    }

    /// Signs `private_key`'s public half for `profile_id`, valid for `lifetime`.
    pub fn issue_for_key(
        &self,
        profile_id: Uuid,
        private_key: RsaPrivateKey,
        lifetime: TimeDelta,
    ) -> Result<ProfileKeyPair, CryptoError> {
        let now = Utc::now();
        let expires_at = now + lifetime;
        let key = private_key.to_public_key();
        let key_signature = self
            .signer
            .sign(&ProfilePublicKeyData::payload(profile_id, expires_at, &key))?;

        Ok(ProfileKeyPair {
            private_key,
            public_key: ProfilePublicKey::trusted(ProfilePublicKeyData {
                expires_at,
                key,
                key_signature,
            }),
            refreshed_after: now + lifetime * 5 / 6,
        })
    }
}
