//! # Exchange Errors
//!
//! Every rejection the pipelines and the session service can produce, with
//! the HTTP status and public message each one maps to.

use http::StatusCode;
use thiserror::Error;

/// Message returned for every authentication-class failure.
///
/// A single message keeps "bad signature", "bad ciphertext" and "wrong
/// source" indistinguishable to the caller.
pub const NOT_VALID_FOR_RESOURCE: &str = "request not valid for given resource";

/// Broad classes of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing protocol material, stale or replayed messages
    Protocol,
    /// Signature, decryption or source-binding failures
    Authentication,
    /// Missing, expired or unobtainable sessions
    Session,
    /// Key resolution or storage unavailable
    Dependency,
    /// Server-side fault while producing a response
    Internal,
}

/// Errors produced by the exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AsxError {
    // =========================================================================
    // Client protocol errors
    // =========================================================================
    /// A required header is absent
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// The timestamp header is not a valid instant
    #[error("invalid timestamp header: {0}")]
    InvalidTimestamp(String),

    /// The timestamp is outside the freshness window
    #[error("timestamp outside freshness window (skew {skew_ms} ms)")]
    StaleTimestamp { skew_ms: i64 },

    /// The message fingerprint was already admitted
    #[error("replay detected")]
    ReplayDetected,

    /// The signature header block cannot be parsed
    #[error("malformed signature headers: {0}")]
    MalformedSignatureHeaders(String),

    /// The body is not a well-formed `{sig, cipher}` envelope
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    // =========================================================================
    // Authentication failures
    // =========================================================================
    /// Header signature did not verify
    #[error("invalid header signature")]
    InvalidHeaderSignature,

    /// Body signature did not verify
    #[error("invalid body signature")]
    InvalidBodySignature,

    /// The sealed payload could not be opened
    #[error("decryption failed")]
    DecryptionFailed,

    /// The sealed `src` differs from the header-declared sender
    #[error("sealed source does not match sender")]
    SourceMismatch,

    // =========================================================================
    // Session errors
    // =========================================================================
    /// No session exists for the caller
    #[error("unauthenticated")]
    Unauthenticated,

    /// The caller's session has expired
    #[error("session expired")]
    SessionExpired,

    /// No credential disclosure names the caller
    #[error("credential not yet disclosed")]
    DisclosureNotFound,

    /// The latest disclosure is too old to open a session
    #[error("credential disclosure is stale ({age_ms} ms old)")]
    DisclosureStale { age_ms: i64 },

    // =========================================================================
    // Dependency and internal failures
    // =========================================================================
    /// The sender's key could not be resolved (unknown, unavailable, timed out)
    #[error("key resolution failed: {0}")]
    KeyResolutionFailed(String),

    /// The replay cache is at capacity
    #[error("replay cache full")]
    ReplayCacheFull,

    /// Session or disclosure storage failed
    #[error("storage failure: {0}")]
    Storage(String),

    /// Signing or sealing an outgoing message failed
    #[error("outbound sealing failed: {0}")]
    OutboundFailed(String),

    /// Any other server-side fault
    #[error("internal error: {0}")]
    Internal(String),
}

impl AsxError {
    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AsxError::MissingHeader(_)
            | AsxError::InvalidTimestamp(_)
            | AsxError::StaleTimestamp { .. }
            | AsxError::ReplayDetected
            | AsxError::MalformedSignatureHeaders(_)
            | AsxError::MalformedEnvelope(_) => ErrorCategory::Protocol,
            AsxError::InvalidHeaderSignature
            | AsxError::InvalidBodySignature
            | AsxError::DecryptionFailed
            | AsxError::SourceMismatch => ErrorCategory::Authentication,
            AsxError::Unauthenticated
            | AsxError::SessionExpired
            | AsxError::DisclosureNotFound
            | AsxError::DisclosureStale { .. } => ErrorCategory::Session,
            AsxError::KeyResolutionFailed(_)
            | AsxError::ReplayCacheFull
            | AsxError::Storage(_) => ErrorCategory::Dependency,
            AsxError::OutboundFailed(_) | AsxError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AsxError::StaleTimestamp { .. }
            | AsxError::ReplayDetected
            | AsxError::DisclosureNotFound
            | AsxError::DisclosureStale { .. } => StatusCode::CONFLICT,
            AsxError::Unauthenticated | AsxError::SessionExpired => StatusCode::UNAUTHORIZED,
            AsxError::KeyResolutionFailed(_)
            | AsxError::ReplayCacheFull
            | AsxError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            AsxError::OutboundFailed(_) | AsxError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Authentication failures collapse to [`NOT_VALID_FOR_RESOURCE`];
    /// dependency and internal failures hide their detail.
    pub fn public_message(&self) -> String {
        match self.category() {
            ErrorCategory::Authentication => NOT_VALID_FOR_RESOURCE.to_string(),
            ErrorCategory::Dependency => match self {
                AsxError::KeyResolutionFailed(_) => "key resolution unavailable".to_string(),
                _ => "service temporarily unavailable".to_string(),
            },
            ErrorCategory::Internal => "internal error".to_string(),
            ErrorCategory::Protocol | ErrorCategory::Session => self.to_string(),
        }
    }

    /// Whether the caller may retry the same operation later (with backoff).
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Dependency
    }
}

/// Result type for exchange operations
pub type AsxResult<T> = Result<T, AsxError>;
