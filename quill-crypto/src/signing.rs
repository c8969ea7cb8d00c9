//! Signing capabilities and their SHA256withRSA implementations.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer as _, Verifier as _};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

/// Modulus size of every key in the system. A 2048-bit key produces 256-byte signatures.
pub const KEY_BITS: usize = 2048;

/// An error that can occur while creating keys or signatures.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The signing backend refused to produce a signature.
    #[error("Failed to sign payload: {0}")]
    Signing(String),
    /// A public key could not be encoded or decoded.
    #[error("Invalid public key: {0}")]
    InvalidKey(String),
    /// Key generation failed.
    #[error("Failed to generate key pair: {0}")]
    KeyGeneration(String),
    /// The produced signature does not have the size the protocol expects.
    #[error("Signature has {actual} bytes, expected {expected}")]
    SignatureLength {
        /// Size the caller needs.
        expected: usize,
        /// Size that was produced.
        actual: usize,
    },
}

/// Something that can sign a payload with a private key.
pub trait Signer: Send + Sync {
    /// Signs `data`, returning the raw signature bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Something that can check a signature against a public key.
pub trait SignatureValidator: Send + Sync {
    /// Returns true if `signature` is a valid signature of `data`.
    fn validate(&self, data: &[u8], signature: &[u8]) -> bool;
}

/// SHA256withRSA (PKCS#1 v1.5) signer.
#[derive(Clone)]
pub struct RsaSigner {
    key: SigningKey<Sha256>,
}

impl RsaSigner {
    /// Creates a signer for `private_key`.
    #[must_use]
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self {
            key: SigningKey::new(private_key),
        }
    }
}

impl Signer for RsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.key
            .try_sign(data)
            .map(|signature| signature.to_vec())
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }
}

/// SHA256withRSA (PKCS#1 v1.5) signature validator.
#[derive(Clone)]
pub struct RsaSignatureValidator {
    key: VerifyingKey<Sha256>,
}

impl RsaSignatureValidator {
    /// Creates a validator for `public_key`.
    #[must_use]
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self {
            key: VerifyingKey::new(public_key),
        }
    }
}

impl SignatureValidator for RsaSignatureValidator {
    fn validate(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::try_from(signature) else {
            return false;
        };
        self.key.verify(data, &signature).is_ok()
    }
}

/// Generates a fresh [`KEY_BITS`] private key.
pub fn generate_private_key() -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::new(&mut rand::thread_rng(), KEY_BITS)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))
}

/// Encodes a public key as an X.509 `SubjectPublicKeyInfo` DER document.
#[must_use]
pub fn encode_public_key(key: &RsaPublicKey) -> Vec<u8> {
    rsa_der::public_key_to_der(&key.n().to_bytes_be(), &key.e().to_bytes_be())
}

/// Decodes an X.509 `SubjectPublicKeyInfo` DER document into a public key.
pub fn decode_public_key(der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let (n, e) = rsa_der::public_key_from_der(der)
        .map_err(|_| CryptoError::InvalidKey("malformed DER encoding".to_string()))?;
    RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))
}
