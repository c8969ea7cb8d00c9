//! Shared fixtures for unit tests.

use std::sync::LazyLock;

use chrono::TimeDelta;
use quill_crypto::key_store::PROFILE_KEY_LIFETIME;
use quill_crypto::signing::generate_private_key;
use quill_crypto::{KeyStore, ProfileKeyPair};
use rsa::RsaPrivateKey;
use uuid::Uuid;

use crate::signature::{MessageSignature, SIGNATURE_BYTES};

/// The profile every test key is issued for.
pub(crate) const PLAYER_ID: Uuid = Uuid::from_u128(0x5d1c_9a2e_44f0_4b7c_9e31_0a6d_27c8_f15b);

static PRIVATE_KEY: LazyLock<RsaPrivateKey> =
    LazyLock::new(|| generate_private_key().expect("test key"));

/// Signs with the same key it issues, which keeps key generation to one per test binary.
pub(crate) static AUTHORITY: LazyLock<KeyStore> =
    LazyLock::new(|| KeyStore::from_private_key(PRIVATE_KEY.clone()));

/// A dummy signature filled with `byte`.
pub(crate) fn signature(byte: u8) -> MessageSignature {
    MessageSignature::new([byte; SIGNATURE_BYTES])
}

/// A key pair for [`PLAYER_ID`] with the default lifetime.
pub(crate) fn key_pair() -> ProfileKeyPair {
    key_pair_with_lifetime(PROFILE_KEY_LIFETIME)
}

/// A key pair for [`PLAYER_ID`] that expires `lifetime` from now.
pub(crate) fn key_pair_with_lifetime(lifetime: TimeDelta) -> ProfileKeyPair {
    AUTHORITY
        .issue_for_key(PLAYER_ID, PRIVATE_KEY.clone(), lifetime)
        .expect("issue test key")
}
