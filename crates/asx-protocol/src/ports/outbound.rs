//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the exchange needs: key resolution, session storage,
//! credential disclosures and a clock.

use crate::domain::entities::ResourceId;
use crate::domain::session::{CredentialDisclosure, NewSession, Session, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_crypto::Ed25519PublicKey;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Key Resolution
// =============================================================================

/// Error from key resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The identifier is not known to the directory
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// The directory could not be reached or answered with an error
    #[error("key directory unavailable: {0}")]
    Unavailable(String),

    /// Resolution did not finish in time
    #[error("key resolution timed out after {0:?}")]
    Timeout(Duration),
}

/// Resolves a party's current verification key.
///
/// The encryption key is derived from the returned key, so one lookup serves
/// both verification and sealing.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Current verification key of `id`.
    ///
    /// # Errors
    /// * `ResolveError::UnknownIdentifier` - no key state for `id`
    /// * `ResolveError::Unavailable` - transient directory failure
    /// * `ResolveError::Timeout` - the lookup exceeded its bound
    async fn resolve(&self, id: &ResourceId) -> Result<Ed25519PublicKey, ResolveError>;
}

#[async_trait]
impl<T: KeyResolver + ?Sized> KeyResolver for Arc<T> {
    async fn resolve(&self, id: &ResourceId) -> Result<Ed25519PublicKey, ResolveError> {
        (**self).resolve(id).await
    }
}

// =============================================================================
// Session Storage
// =============================================================================

/// Error from session storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("session storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable session records, keyed by an auto-assigned id and queryable by subject.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session and return it with its assigned id.
    async fn insert(&self, session: NewSession) -> Result<Session, RepositoryError>;

    /// Oldest stored session of `subject`, expired or not.
    async fn find_by_subject(&self, subject: &ResourceId)
        -> Result<Option<Session>, RepositoryError>;

    /// Delete one session. Deleting an absent id is not an error.
    async fn delete(&self, subject: &ResourceId, id: SessionId) -> Result<(), RepositoryError>;

    /// Delete every session of `subject`; returns how many were removed.
    async fn delete_by_subject(&self, subject: &ResourceId) -> Result<usize, RepositoryError>;

    /// Delete every session whose `valid_until` is before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, RepositoryError>;
}

// =============================================================================
// Credential Disclosures
// =============================================================================

/// Error from the disclosure source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisclosureError {
    #[error("disclosure source unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of credentials disclosed to this service.
#[async_trait]
pub trait DisclosureSource: Send + Sync {
    /// All disclosures of `schema` credentials issued by `issuer`.
    async fn disclosures(
        &self,
        schema: &str,
        issuer: &ResourceId,
    ) -> Result<Vec<CredentialDisclosure>, DisclosureError>;
}

// =============================================================================
// Time
// =============================================================================

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Current wall-clock instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
