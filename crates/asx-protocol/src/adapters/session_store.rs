//! In-memory session repository.
//!
//! Sessions are grouped per subject in a sharded map, so writes for one
//! subject are serialized while different subjects proceed in parallel.
//! Ids come from a process-wide counter and grow with insertion order, which
//! keeps each subject's list oldest-first.

use crate::domain::entities::ResourceId;
use crate::domain::session::{NewSession, Session, SessionId};
use crate::ports::outbound::{RepositoryError, SessionRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: DashMap<ResourceId, Vec<Session>>,
    next_id: AtomicU64,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored sessions, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn insert(&self, session: NewSession) -> Result<Session, RepositoryError> {
        let mut entry = self
            .sessions
            .entry(session.subject_identifier.clone())
            .or_default();
        // Allocated under the subject's shard lock so the list stays id-ordered.
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = session.with_id(id);
        entry.push(session.clone());
        Ok(session)
    }

    async fn find_by_subject(
        &self,
        subject: &ResourceId,
    ) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .sessions
            .get(subject)
            .and_then(|sessions| sessions.first().cloned()))
    }

    async fn delete(&self, subject: &ResourceId, id: SessionId) -> Result<(), RepositoryError> {
        if let Some(mut sessions) = self.sessions.get_mut(subject) {
            sessions.retain(|s| s.id != id);
        }
        self.sessions.remove_if(subject, |_, sessions| sessions.is_empty());
        Ok(())
    }

    async fn delete_by_subject(&self, subject: &ResourceId) -> Result<usize, RepositoryError> {
        Ok(self
            .sessions
            .remove(subject)
            .map_or(0, |(_, sessions)| sessions.len()))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut removed = 0;
        self.sessions.retain(|_, sessions| {
            let before = sessions.len();
            sessions.retain(|s| !s.is_expired(now));
            removed += before - sessions.len();
            !sessions.is_empty()
        });
        Ok(removed)
    }
}
