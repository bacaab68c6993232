//! # huddle-auth
//!
//! Credential verification for the presence handshake. A client proves
//! possession of its room secret by sending it encrypted under a shared
//! symmetric key; the server decrypts and compares the plaintext against the
//! Argon2 hash held in the session store. Plaintext is never compared to
//! plaintext, and decrypt failures are indistinguishable from hash
//! mismatches.

#![deny(unsafe_code)]

pub mod cipher;
pub mod errors;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::debug;

pub use cipher::SecretCipher;
pub use errors::AuthError;

/// Hash a plaintext secret into an Argon2 PHC string (provisioning path).
pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut SaltRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Compare a plaintext secret against a stored PHC hash string. Unparseable
/// hashes count as a mismatch.
#[must_use]
pub fn verify_hash(plaintext: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Verifies client credentials: decrypt the supplied secret, then compare it
/// against the stored hash. Side-effect free and safe to share across tasks.
#[derive(Clone)]
pub struct CredentialVerifier {
    cipher: SecretCipher,
}

impl CredentialVerifier {
    /// Build a verifier over the shared secret cipher.
    #[must_use]
    pub fn new(cipher: SecretCipher) -> Self {
        Self { cipher }
    }

    /// Whether the encrypted secret matches the stored hash. All failure
    /// modes (decode, decrypt, hash parse, mismatch) yield `false`; the
    /// caller cannot tell which check failed.
    #[must_use]
    pub fn verify(&self, encrypted_secret: &str, stored_hash: &str) -> bool {
        match self.cipher.decrypt(encrypted_secret) {
            Ok(plaintext) => verify_hash(&plaintext, stored_hash),
            Err(err) => {
                debug!(error = %err, "secret decryption failed");
                false
            }
        }
    }

    /// [`verify`](Self::verify) on the blocking pool, so the Argon2 work of
    /// one client never stalls other connections' event handling.
    pub async fn verify_offloaded(&self, encrypted_secret: String, stored_hash: String) -> bool {
        let verifier = self.clone();
        tokio::task::spawn_blocking(move || verifier.verify(&encrypted_secret, &stored_hash))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> (CredentialVerifier, SecretCipher) {
        let key = [3u8; 32];
        (
            CredentialVerifier::new(SecretCipher::new(&key)),
            SecretCipher::new(&key),
        )
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_secret("hunter2").unwrap();
        assert!(verify_hash("hunter2", &hash));
        assert!(!verify_hash("hunter3", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_secret("same").unwrap();
        let b = hash_secret("same").unwrap();
        assert_ne!(a, b);
        assert!(verify_hash("same", &a));
        assert!(verify_hash("same", &b));
    }

    #[test]
    fn garbage_hash_is_mismatch() {
        assert!(!verify_hash("secret", "not a phc string"));
    }

    #[test]
    fn verify_accepts_matching_secret() {
        let (verifier, cipher) = verifier();
        let hash = hash_secret("tok-123").unwrap();
        let encrypted = cipher.encrypt("tok-123").unwrap();
        assert!(verifier.verify(&encrypted, &hash));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let (verifier, cipher) = verifier();
        let hash = hash_secret("tok-123").unwrap();
        let encrypted = cipher.encrypt("tok-999").unwrap();
        assert!(!verifier.verify(&encrypted, &hash));
    }

    #[test]
    fn verify_rejects_undecryptable_payload() {
        let (verifier, _) = verifier();
        let hash = hash_secret("tok-123").unwrap();
        // Encrypted under a different key
        let foreign = SecretCipher::new(&[4u8; 32]).encrypt("tok-123").unwrap();
        assert!(!verifier.verify(&foreign, &hash));
        assert!(!verifier.verify("!!not base64!!", &hash));
    }

    #[tokio::test]
    async fn offloaded_verify_matches_sync() {
        let key = [5u8; 32];
        let verifier = CredentialVerifier::new(SecretCipher::new(&key));
        let cipher = SecretCipher::new(&key);
        let hash = hash_secret("tok-1").unwrap();
        let encrypted = cipher.encrypt("tok-1").unwrap();

        assert!(verifier.verify_offloaded(encrypted, hash.clone()).await);
        assert!(
            !verifier
                .verify_offloaded("bogus".to_owned(), hash)
                .await
        );
    }
}
