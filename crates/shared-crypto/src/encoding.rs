//! # Qualified Text Encoding
//!
//! Self-describing text form for keys, signatures and sealed blobs: a short
//! derivation code followed by the unpadded base64url body.
//!
//! | Code | Material | Raw size |
//! |------|----------|----------|
//! | `D`  | Ed25519 verification key | 32 |
//! | `0B` | Ed25519 signature | 64 |
//! | `4C` | Sealed blob | variable, >= 56 |

use crate::CryptoError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// Derivation codes understood by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    /// Ed25519 verification key
    VerificationKey,
    /// Ed25519 signature
    Signature,
    /// X25519 / XChaCha20-Poly1305 sealed blob
    Sealed,
}

impl Code {
    /// Text prefix for this code.
    pub fn prefix(self) -> &'static str {
        match self {
            Code::VerificationKey => "D",
            Code::Signature => "0B",
            Code::Sealed => "4C",
        }
    }

    /// Fixed raw length, if the material has one.
    pub fn raw_len(self) -> Option<usize> {
        match self {
            Code::VerificationKey => Some(32),
            Code::Signature => Some(64),
            Code::Sealed => None,
        }
    }
}

/// Encode raw bytes under a derivation code.
pub fn encode(code: Code, raw: &[u8]) -> String {
    let mut out = String::with_capacity(code.prefix().len() + raw.len() * 4 / 3 + 4);
    out.push_str(code.prefix());
    out.push_str(&URL_SAFE_NO_PAD.encode(raw));
    out
}

/// Decode a qualified value, checking its code and (fixed) length.
///
/// # Errors
///
/// Returns `CryptoError::InvalidEncoding` on a wrong prefix, invalid base64
/// or a length mismatch.
pub fn decode(code: Code, text: &str) -> Result<Vec<u8>, CryptoError> {
    let body = text.strip_prefix(code.prefix()).ok_or_else(|| {
        CryptoError::InvalidEncoding(format!("expected code {}", code.prefix()))
    })?;

    let raw = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

    if let Some(expected) = code.raw_len() {
        if raw.len() != expected {
            return Err(CryptoError::InvalidEncoding(format!(
                "expected {} bytes, got {}",
                expected,
                raw.len()
            )));
        }
    }

    Ok(raw)
}
