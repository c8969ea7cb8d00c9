//! Signing primitives for secure chat.
//!
//! The chat chain only sees the [`Signer`] and [`SignatureValidator`]
//! capabilities. This crate provides their SHA256withRSA implementations,
//! the expiring profile public keys players sign with, and the [`KeyStore`]
//! authority that vouches for those keys.

pub mod key_store;
pub mod profile_key;
pub mod signing;

pub use key_store::KeyStore;
pub use profile_key::{ProfileKeyError, ProfileKeyPair, ProfilePublicKey, ProfilePublicKeyData};
pub use signing::{CryptoError, RsaSignatureValidator, RsaSigner, SignatureValidator, Signer};
