//! # Sealed Boxes
//!
//! Anonymous public-key encryption to a recipient's X25519 key.
//!
//! ## Construction
//!
//! 1. Fresh ephemeral X25519 secret per message
//! 2. HKDF-SHA256 over the shared secret, salted with `ephemeral_pk || recipient_pk`
//! 3. XChaCha20-Poly1305 with a random 192-bit nonce
//!
//! Blob layout: `ephemeral_pk (32) || nonce (24) || ciphertext+tag`.

use crate::encoding::{self, Code};
use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

const EPHEMERAL_LEN: usize = 32;
const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;
const HKDF_INFO: &[u8] = b"asx-sealed-box-v1";

/// Smallest well-formed blob (empty plaintext).
pub const MIN_SEALED_LEN: usize = EPHEMERAL_LEN + NONCE_LEN + TAG_LEN;

/// X25519 public key that payloads are sealed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Create from raw Montgomery u-coordinate bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// X25519 secret used to open sealed blobs.
pub struct DecryptionKey {
    secret: StaticSecret,
}

impl DecryptionKey {
    /// Build from (unclamped) scalar bytes; clamping happens inside X25519.
    pub fn from_scalar_bytes(bytes: [u8; 32]) -> Self {
        let bytes = Zeroizing::new(bytes);
        Self {
            secret: StaticSecret::from(*bytes),
        }
    }

    /// Public half of this key.
    pub fn encryption_key(&self) -> EncryptionKey {
        EncryptionKey(PublicKey::from(&self.secret).to_bytes())
    }
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKey")
            .field("encryption_key", &self.encryption_key())
            .finish_non_exhaustive()
    }
}

/// Sealed (encrypted) payload.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedBlob(Vec<u8>);

impl SealedBlob {
    /// Wrap raw blob bytes, checking the minimum length.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_SEALED_LEN {
            return Err(CryptoError::InvalidEncoding(format!(
                "sealed blob shorter than {} bytes",
                MIN_SEALED_LEN
            )));
        }
        Ok(Self(bytes))
    }

    /// Parse the qualified (`4C...`) text form.
    pub fn from_qb64(text: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(encoding::decode(Code::Sealed, text)?)
    }

    /// Qualified text form.
    pub fn to_qb64(&self) -> String {
        encoding::encode(Code::Sealed, &self.0)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SealedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedBlob({} bytes)", self.0.len())
    }
}

fn derive_key(
    shared: &[u8; 32],
    ephemeral_pk: &[u8; 32],
    recipient_pk: &[u8; 32],
) -> Option<Zeroizing<[u8; 32]>> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_pk);
    salt[32..].copy_from_slice(recipient_pk);

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut okm = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO, &mut okm[..]).ok()?;
    Some(okm)
}

/// Seal `plaintext` so only the holder of the matching [`DecryptionKey`] can open it.
///
/// # Errors
///
/// Returns `CryptoError::NonContributory` for low-order recipient keys and
/// `CryptoError::SealFailed` if key derivation or encryption fails.
pub fn seal(recipient: &EncryptionKey, plaintext: &[u8]) -> Result<SealedBlob, CryptoError> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_pk = PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(&PublicKey::from(recipient.0));
    if !shared.was_contributory() {
        return Err(CryptoError::NonContributory);
    }

    let key = derive_key(shared.as_bytes(), ephemeral_pk.as_bytes(), &recipient.0)
        .ok_or_else(|| CryptoError::SealFailed("key derivation".into()))?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::SealFailed(e.to_string()))?;

    let mut blob = Vec::with_capacity(EPHEMERAL_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(ephemeral_pk.as_bytes());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    Ok(SealedBlob(blob))
}

/// Open a sealed blob with the recipient's secret.
///
/// # Errors
///
/// Returns `CryptoError::OpenFailed` for any failure. The reason is not
/// distinguished so callers cannot be used as a decryption oracle.
pub fn open(recipient: &DecryptionKey, blob: &SealedBlob) -> Result<Vec<u8>, CryptoError> {
    let bytes = blob.as_bytes();
    if bytes.len() < MIN_SEALED_LEN {
        return Err(CryptoError::OpenFailed);
    }

    let mut ephemeral_bytes = [0u8; EPHEMERAL_LEN];
    ephemeral_bytes.copy_from_slice(&bytes[..EPHEMERAL_LEN]);
    let nonce = &bytes[EPHEMERAL_LEN..EPHEMERAL_LEN + NONCE_LEN];
    let ciphertext = &bytes[EPHEMERAL_LEN + NONCE_LEN..];

    let shared = recipient
        .secret
        .diffie_hellman(&PublicKey::from(ephemeral_bytes));
    if !shared.was_contributory() {
        return Err(CryptoError::OpenFailed);
    }

    let recipient_pk = recipient.encryption_key();
    let key = derive_key(shared.as_bytes(), &ephemeral_bytes, recipient_pk.as_bytes())
        .ok_or(CryptoError::OpenFailed)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::OpenFailed)
}
