//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Sealing a payload to a recipient failed
    #[error("Seal failed: {0}")]
    SealFailed(String),

    /// Opening a sealed blob failed (wrong key, tampered or truncated blob)
    #[error("Open failed")]
    OpenFailed,

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Key agreement produced an all-zero shared secret
    #[error("Non-contributory key agreement")]
    NonContributory,

    /// A qualified text value could not be decoded
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}
