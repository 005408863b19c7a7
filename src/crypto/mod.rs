//! The encryption boundary between the link engine and storage
//!
//! The engine hands whole graphs to a [`GraphCipher`] and gets back an
//! opaque [`Ciphertext`]; only ciphertext ever reaches a payload store.
//! Key establishment happens elsewhere; this module only carries the key.

mod aes;

pub use aes::AesGcmCipher;

use crate::graph::Graph;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors from the encryption boundary
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Wrong key or corrupted payload. Always recoverable.
    #[error("Decryption failed: {0}")]
    DecryptFailure(String),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CryptoError {
    /// True for every failure that means "this payload cannot be read with this key"
    pub fn is_decrypt_failure(&self) -> bool {
        matches!(self, CryptoError::DecryptFailure(_) | CryptoError::InvalidEnvelope(_))
    }
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// A serialized, encrypted graph. Opaque to everything but a [`GraphCipher`].
#[derive(Clone, PartialEq, Eq)]
pub struct Ciphertext(String);

impl Ciphertext {
    pub fn new(envelope: impl Into<String>) -> Self {
        Self(envelope.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ciphertext({} bytes)", self.0.len())
    }
}

impl From<String> for Ciphertext {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Ciphertext {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Symmetric session key (32 bytes). Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// SHA-256 of a caller-held secret.
    ///
    /// Only meant for tooling; applications establish session keys themselves.
    pub fn derive_from_secret(secret: &[u8]) -> Self {
        let digest = Sha256::digest(secret);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// A random key
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Encrypts and decrypts whole graphs.
///
/// `decrypt(key, encrypt(key, g))` must equal `g`.
#[async_trait]
pub trait GraphCipher: Send + Sync {
    async fn encrypt(&self, key: &SessionKey, graph: &Graph) -> CryptoResult<Ciphertext>;

    async fn decrypt(&self, key: &SessionKey, ciphertext: &Ciphertext) -> CryptoResult<Graph>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_debug_is_redacted() {
        let key = SessionKey::from_bytes([7u8; 32]);
        assert_eq!(format!("{:?}", key), "SessionKey(..)");
    }

    #[test]
    fn derived_keys_are_stable_per_secret() {
        let a = SessionKey::derive_from_secret(b"secret");
        let b = SessionKey::derive_from_secret(b"secret");
        let c = SessionKey::derive_from_secret(b"other");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn ciphertext_debug_hides_content() {
        let ct = Ciphertext::from("abcdef");
        assert_eq!(format!("{:?}", ct), "Ciphertext(6 bytes)");
    }

    #[test]
    fn decrypt_failure_classification() {
        assert!(CryptoError::DecryptFailure("x".into()).is_decrypt_failure());
        assert!(CryptoError::InvalidEnvelope("x".into()).is_decrypt_failure());
        assert!(!CryptoError::Encryption("x".into()).is_decrypt_failure());
    }
}
