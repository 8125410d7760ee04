//! # Shared Crypto - Identity and Sealing Primitives
//!
//! Cryptography provider for the Authenticated Sealed Exchange. The protocol
//! crate treats everything here as opaque "sign / verify / seal / open"
//! operations.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Long-term identities, header and body signatures |
//! | `sealing` | X25519 + HKDF-SHA256 + XChaCha20-Poly1305 | Sealing payloads to a recipient |
//! | `encoding` | code + base64url | Self-describing text forms on the wire |
//! | `hashing` | BLAKE3 | Replay fingerprints |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, strict verification
//! - **Sealed boxes**: Fresh ephemeral key per message, 192-bit random nonce
//! - **One key per party**: The X25519 pair is derived from the Ed25519 pair

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod errors;
pub mod hashing;
pub mod sealing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{blake3_hash, blake3_hex};
pub use sealing::{open, seal, DecryptionKey, EncryptionKey, SealedBlob};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
