//! # Sessions and Credential Disclosures
//!
//! Session records, the disclosure records they are issued from, and the pure
//! decision logic for issuance and guarding. Storage lives behind ports.

use crate::domain::entities::ResourceId;
use crate::domain::errors::AsxError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Store-assigned session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub subject_identifier: ResourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl Session {
    /// Expired strictly after `valid_until`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until < now
    }
}

/// A session before the store has assigned its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSession {
    pub subject_identifier: ResourceId,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl NewSession {
    /// Attach the store-assigned id.
    pub fn with_id(self, id: SessionId) -> Session {
        Session {
            id,
            subject_identifier: self.subject_identifier,
            role: self.role,
            created_at: self.created_at,
            valid_until: self.valid_until,
        }
    }
}

/// Time-stamped proof that `subject` holds a credential of `schema`.
///
/// Read-only input; `issued_at` is the credential's `issuedAttributes.dt`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDisclosure {
    /// Credential digest
    pub said: String,
    /// Schema identifier
    pub schema: String,
    pub issuer: ResourceId,
    /// Subject attribute (`a.i`) of the credential
    pub subject: ResourceId,
    pub issued_at: DateTime<Utc>,
}

/// Role granted to holders of credentials of one schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRole {
    pub schema: String,
    /// Role name; `None` grants a plain session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Pick the caller's most recent disclosure.
///
/// # Errors
///
/// `DisclosureNotFound` when no disclosure names `subject`.
pub fn latest_disclosure_for<'a>(
    disclosures: &'a [CredentialDisclosure],
    subject: &ResourceId,
) -> Result<&'a CredentialDisclosure, AsxError> {
    disclosures
        .iter()
        .filter(|d| &d.subject == subject)
        .max_by_key(|d| d.issued_at)
        .ok_or(AsxError::DisclosureNotFound)
}

/// Reject disclosures older than `max_age` at `now`.
pub fn check_disclosure_age(
    disclosure: &CredentialDisclosure,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Result<(), AsxError> {
    let age_ms = now.signed_duration_since(disclosure.issued_at).num_milliseconds();
    if age_ms > max_age.as_millis() as i64 {
        return Err(AsxError::DisclosureStale { age_ms });
    }
    Ok(())
}

/// Role mapped to `schema`, if any.
pub fn role_for_schema(roles: &[SchemaRole], schema: &str) -> Option<String> {
    roles
        .iter()
        .find(|r| r.schema == schema)
        .and_then(|r| r.role.clone())
}

/// Session for `subject` created at `now`, valid for `duration`.
pub fn new_session(
    subject: ResourceId,
    role: Option<String>,
    now: DateTime<Utc>,
    duration: Duration,
) -> NewSession {
    NewSession {
        subject_identifier: subject,
        role,
        created_at: now,
        valid_until: now + chrono::Duration::milliseconds(duration.as_millis() as i64),
    }
}
