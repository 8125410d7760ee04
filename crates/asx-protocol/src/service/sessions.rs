//! # Session Service
//!
//! Issuance from credential disclosures, the guard used by protected
//! operations, logout, and background reaping of inert expired rows.

use crate::config::SessionConfig;
use crate::domain::entities::ResourceId;
use crate::domain::errors::{AsxError, AsxResult};
use crate::domain::session::{
    check_disclosure_age, latest_disclosure_for, new_session, role_for_schema, SchemaRole,
    Session,
};
use crate::ports::outbound::{DisclosureSource, SessionRepository, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Session lifecycle over injected storage and disclosure ports.
pub struct SessionService {
    repository: Arc<dyn SessionRepository>,
    disclosures: Arc<dyn DisclosureSource>,
    clock: Arc<dyn TimeSource>,
    issuer: ResourceId,
    schemas: Vec<SchemaRole>,
    duration: Duration,
    max_disclosure_age: Duration,
}

impl SessionService {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        disclosures: Arc<dyn DisclosureSource>,
        clock: Arc<dyn TimeSource>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            repository,
            disclosures,
            clock,
            issuer: ResourceId::new(config.issuer.clone()),
            schemas: config.schemas.clone(),
            duration: config.duration(),
            max_disclosure_age: config.max_disclosure_age(),
        }
    }

    /// Open a session for `subject` from its most recent disclosure.
    ///
    /// Every configured schema from the configured issuer is consulted; the
    /// disclosure with the latest `issued_at` decides freshness and role.
    ///
    /// # Errors
    /// * `DisclosureNotFound` - nothing disclosed for `subject`
    /// * `DisclosureStale` - latest disclosure older than the allowed age
    /// * `Storage` - disclosure source or repository failed
    pub async fn issue(&self, subject: &ResourceId) -> AsxResult<Session> {
        let mut disclosures = Vec::new();
        for schema in &self.schemas {
            let found = self
                .disclosures
                .disclosures(&schema.schema, &self.issuer)
                .await
                .map_err(|e| AsxError::Storage(e.to_string()))?;
            disclosures.extend(found);
        }

        let latest = latest_disclosure_for(&disclosures, subject)?;
        let now = self.clock.now();

        if let Err(e) = check_disclosure_age(latest, now, self.max_disclosure_age) {
            warn!(subject = %subject, said = %latest.said, reason = %e, "Refused session");
            return Err(e);
        }

        let role = role_for_schema(&self.schemas, &latest.schema);
        let session = self
            .repository
            .insert(new_session(subject.clone(), role, now, self.duration))
            .await
            .map_err(|e| AsxError::Storage(e.to_string()))?;

        info!(
            subject = %subject,
            session_id = %session.id,
            role = session.role.as_deref().unwrap_or("-"),
            valid_until = %session.valid_until,
            "Session issued"
        );
        Ok(session)
    }

    /// Guard contract: the subject's session, or why there is none.
    ///
    /// The oldest record decides. An expired record is deleted on the spot.
    pub async fn guard(&self, subject: &ResourceId) -> AsxResult<Session> {
        let session = self
            .repository
            .find_by_subject(subject)
            .await
            .map_err(|e| AsxError::Storage(e.to_string()))?
            .ok_or(AsxError::Unauthenticated)?;

        if session.is_expired(self.clock.now()) {
            self.repository
                .delete(subject, session.id)
                .await
                .map_err(|e| AsxError::Storage(e.to_string()))?;
            info!(subject = %subject, session_id = %session.id, "Session expired");
            return Err(AsxError::SessionExpired);
        }

        Ok(session)
    }

    /// Delete every session of `subject`. Idempotent.
    pub async fn logout(&self, subject: &ResourceId) -> AsxResult<()> {
        let removed = self
            .repository
            .delete_by_subject(subject)
            .await
            .map_err(|e| AsxError::Storage(e.to_string()))?;

        info!(subject = %subject, removed, "Logged out");
        Ok(())
    }

    /// Delete every expired session; returns how many were removed.
    pub async fn reap_expired(&self) -> AsxResult<usize> {
        self.repository
            .delete_expired(self.clock.now())
            .await
            .map_err(|e| AsxError::Storage(e.to_string()))
    }
}

/// Run [`SessionService::reap_expired`] every `period` until the handle is aborted.
pub fn spawn_session_reaper(service: Arc<SessionService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match service.reap_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Reaped expired sessions"),
                Err(e) => warn!(error = %e, "Session reaping failed"),
            }
        }
    })
}
