//! # BLAKE3 Hashing
//!
//! Digests used for replay fingerprints.

use blake3::Hasher;

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Hash data with BLAKE3 (one-shot).
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple inputs as one stream.
pub fn blake3_hash_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    *hasher.finalize().as_bytes()
}

/// Lowercase hex digest of multiple inputs.
pub fn blake3_hex(inputs: &[&[u8]]) -> String {
    let mut hasher = Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().to_hex().to_string()
}
