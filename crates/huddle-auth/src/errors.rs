//! Auth error types.
//!
//! These never cross the wire: the verifier collapses every failure into a
//! uniform `false` so a caller cannot tell which check rejected it. They
//! exist for internal logging and for the provisioning helpers.

use thiserror::Error;

/// Errors from cipher and hash operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The shared key was not 32 bytes of valid base64.
    #[error("invalid shared key: {0}")]
    Key(String),

    /// The encrypted payload was not valid base64.
    #[error("ciphertext decode failed: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The payload was too short to carry a nonce, or AEAD decryption
    /// (including tag verification) failed.
    #[error("decryption failed")]
    Decrypt,

    /// The decrypted secret was not UTF-8.
    #[error("decrypted secret is not valid UTF-8")]
    Utf8,

    /// Password hashing failed (provisioning path only).
    #[error("password hashing failed: {0}")]
    Hash(String),
}
