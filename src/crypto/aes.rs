//! AES-256-GCM envelope cipher.
//!
//! Envelope layout (JSON):
//!
//! ```text
//! { "v": 1, "nonce": "<base64, 12 bytes>", "data": "<base64 ciphertext + 16 byte tag>" }
//! ```
//!
//! The plaintext is the JSON serialization of the graph. A fresh random
//! nonce is drawn for every encryption.

use super::{Ciphertext, CryptoError, CryptoResult, GraphCipher, SessionKey};
use crate::graph::Graph;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};

const ENVELOPE_VERSION: u32 = 1;
const NONCE_LEN: usize = 12;

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u32,
    nonce: String,
    data: String,
}

/// [`GraphCipher`] backed by AES-256-GCM
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    pub fn new() -> Self {
        Self
    }

    fn seal(key: &SessionKey, plaintext: &[u8]) -> CryptoResult<Ciphertext> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let data = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))?;

        let envelope = Envelope {
            v: ENVELOPE_VERSION,
            nonce: STANDARD.encode(nonce),
            data: STANDARD.encode(data),
        };
        Ok(Ciphertext::new(serde_json::to_string(&envelope)?))
    }

    fn open(key: &SessionKey, ciphertext: &Ciphertext) -> CryptoResult<Vec<u8>> {
        let envelope: Envelope = serde_json::from_str(ciphertext.as_str())
            .map_err(|e| CryptoError::InvalidEnvelope(e.to_string()))?;
        if envelope.v != ENVELOPE_VERSION {
            return Err(CryptoError::InvalidEnvelope(format!(
                "unsupported envelope version {}",
                envelope.v
            )));
        }

        let nonce = STANDARD
            .decode(&envelope.nonce)
            .map_err(|e| CryptoError::InvalidEnvelope(format!("nonce: {}", e)))?;
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::InvalidEnvelope(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }
        let data = STANDARD
            .decode(&envelope.data)
            .map_err(|e| CryptoError::InvalidEnvelope(format!("data: {}", e)))?;

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| CryptoError::DecryptFailure("Invalid key".to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&nonce), data.as_slice())
            .map_err(|_| CryptoError::DecryptFailure("AES-GCM decryption failed".to_string()))
    }
}

#[async_trait]
impl GraphCipher for AesGcmCipher {
    async fn encrypt(&self, key: &SessionKey, graph: &Graph) -> CryptoResult<Ciphertext> {
        let plaintext = serde_json::to_vec(graph)?;
        Self::seal(key, &plaintext)
    }

    async fn decrypt(&self, key: &SessionKey, ciphertext: &Ciphertext) -> CryptoResult<Graph> {
        let plaintext = Self::open(key, ciphertext)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| CryptoError::DecryptFailure(format!("payload is not a graph: {}", e)))
    }
}
