//! Keys shared by the integration tests.

use std::sync::LazyLock;

use chrono::TimeDelta;
use quill_crypto::key_store::PROFILE_KEY_LIFETIME;
use quill_crypto::signing::generate_private_key;
use quill_crypto::{KeyStore, ProfileKeyPair};
use rsa::RsaPrivateKey;
use uuid::Uuid;

static PRIVATE_KEY: LazyLock<RsaPrivateKey> =
    LazyLock::new(|| generate_private_key().expect("Failed to generate test key"));

/// Issues keys with the same private key it hands out, so each test binary
/// generates a single RSA key.
pub static AUTHORITY: LazyLock<KeyStore> =
    LazyLock::new(|| KeyStore::from_private_key(PRIVATE_KEY.clone()));

/// A valid key pair for `profile_id`.
pub fn key_pair(profile_id: Uuid) -> ProfileKeyPair {
    key_pair_with_lifetime(profile_id, PROFILE_KEY_LIFETIME)
}

/// A key pair for `profile_id` expiring `lifetime` from now.
pub fn key_pair_with_lifetime(profile_id: Uuid, lifetime: TimeDelta) -> ProfileKeyPair {
    AUTHORITY
        .issue_for_key(profile_id, PRIVATE_KEY.clone(), lifetime)
        .expect("Failed to issue test key")
}
