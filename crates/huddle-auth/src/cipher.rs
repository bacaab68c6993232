//! Symmetric secret cipher.
//!
//! Clients ship their room secret encrypted under a shared 32-byte key:
//! ChaCha20-Poly1305 with a random 12-byte nonce, encoded as
//! base64(nonce || ciphertext). The server only ever decrypts; the `encrypt`
//! direction exists for provisioning tooling and tests.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

use crate::errors::AuthError;

/// ChaCha20-Poly1305 nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Shared-key AEAD cipher for client secrets.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: ChaCha20Poly1305,
}

impl SecretCipher {
    /// Build from a raw 32-byte key.
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Build from a base64-encoded 32-byte key (how the key is configured).
    pub fn from_base64(encoded: &str) -> Result<Self, AuthError> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| AuthError::Key(e.to_string()))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AuthError::Key("key must be exactly 32 bytes".to_owned()))?;
        Ok(Self::new(&key))
    }

    /// Encrypt a plaintext secret with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AuthError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| AuthError::Decrypt)?;
        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(payload))
    }

    /// Decrypt a base64(nonce || ciphertext) payload back to the plaintext
    /// secret. Tag verification failures and truncated payloads are both
    /// [`AuthError::Decrypt`].
    pub fn decrypt(&self, encoded: &str) -> Result<String, AuthError> {
        let payload = BASE64.decode(encoded)?;
        if payload.len() <= NONCE_LEN {
            return Err(AuthError::Decrypt);
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AuthError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| AuthError::Utf8)
    }
}
