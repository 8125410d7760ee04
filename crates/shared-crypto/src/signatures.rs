//! # Ed25519 Identities and Signatures
//!
//! Long-term identity keys. The same key material yields the X25519 pair used
//! for sealing, so a party only ever publishes one verification key.
//!
//! ## Security Properties
//!
//! - Deterministic signatures (no RNG dependency when signing)
//! - Points are validated when a public key is constructed
//! - Signing keys zeroize themselves on drop

use crate::encoding::{self, Code};
use crate::sealing::{DecryptionKey, EncryptionKey};
use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use std::fmt;

/// Ed25519 public (verification) key, 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes, rejecting invalid points.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Parse the qualified (`D...`) text form.
    pub fn from_qb64(text: &str) -> Result<Self, CryptoError> {
        let raw = encoding::decode(Code::VerificationKey, text)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        Self::from_bytes(bytes)
    }

    /// Qualified text form.
    pub fn to_qb64(&self) -> String {
        encoding::encode(Code::VerificationKey, &self.0)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Derive the X25519 key that payloads for this party are sealed to.
    ///
    /// This is the birational map from the Edwards point to its Montgomery
    /// u-coordinate.
    pub fn to_encryption_key(&self) -> Result<EncryptionKey, CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(EncryptionKey::from_bytes(
            verifying_key.to_montgomery().to_bytes(),
        ))
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", self.to_qb64())
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse the qualified (`0B...`) text form.
    pub fn from_qb64(text: &str) -> Result<Self, CryptoError> {
        let raw = encoding::decode(Code::Signature, text)?;
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }

    /// Qualified text form.
    pub fn to_qb64(&self) -> String {
        encoding::encode(Code::Signature, &self.0)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Signature({})", self.to_qb64())
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }

    /// X25519 secret matching [`Ed25519PublicKey::to_encryption_key`].
    pub fn decryption_key(&self) -> DecryptionKey {
        DecryptionKey::from_scalar_bytes(self.signing_key.to_scalar_bytes())
    }

    /// Get secret seed (for serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
