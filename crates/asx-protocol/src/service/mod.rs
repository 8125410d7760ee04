//! # Service Layer
//!
//! Application services that wire domain logic to ports.
//!
//! - [`InboundPipeline`]: verify-and-unseal
//! - [`OutboundPipeline`]: sign-and-seal
//! - [`SessionService`]: issuance, guard, logout, reaping
//! - [`ExchangeService`]: all three behind the inbound port traits

pub mod inbound;
pub mod outbound;
pub mod sessions;

pub use inbound::InboundPipeline;
pub use outbound::OutboundPipeline;
pub use sessions::{spawn_session_reaper, SessionService};

use crate::config::AsxConfig;
use crate::domain::entities::{
    AuthenticatedRequest, ExchangeContext, Identity, InboundRequest, ResourceId, SealedResponse,
};
use crate::domain::errors::AsxError;
use crate::domain::replay::ReplayCache;
use crate::domain::session::Session;
use crate::ports::inbound::{SealedExchangeApi, SessionApi};
use crate::ports::outbound::{DisclosureSource, KeyResolver, SessionRepository, TimeSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// The exchange as one injectable unit.
///
/// Cloning shares the pipelines, the replay cache and session storage.
#[derive(Clone)]
pub struct ExchangeService {
    identity: Arc<Identity>,
    inbound: Arc<InboundPipeline>,
    outbound: Arc<OutboundPipeline>,
    sessions: Arc<SessionService>,
    clock: Arc<dyn TimeSource>,
}

/// Outbound port implementations the exchange is built from.
pub struct ExchangeDeps {
    pub resolver: Arc<dyn KeyResolver>,
    pub replay: Arc<ReplayCache>,
    pub sessions: Arc<dyn SessionRepository>,
    pub disclosures: Arc<dyn DisclosureSource>,
    pub clock: Arc<dyn TimeSource>,
}

impl ExchangeService {
    /// Wire the pipelines and the session service for `identity`.
    pub fn new(identity: Arc<Identity>, deps: ExchangeDeps, config: &AsxConfig) -> Self {
        let inbound = InboundPipeline::new(
            identity.clone(),
            deps.resolver.clone(),
            deps.replay,
            &config.exchange,
        );
        let outbound = OutboundPipeline::new(identity.clone(), deps.resolver, deps.clock.clone());
        let sessions = SessionService::new(
            deps.sessions,
            deps.disclosures,
            deps.clock.clone(),
            &config.session,
        );

        Self {
            identity,
            inbound: Arc::new(inbound),
            outbound: Arc::new(outbound),
            sessions: Arc::new(sessions),
            clock: deps.clock,
        }
    }

    /// This service's identifier.
    pub fn resource_id(&self) -> &ResourceId {
        self.identity.resource_id()
    }

    /// Clock used for timestamps and receipt times.
    pub fn clock(&self) -> &Arc<dyn TimeSource> {
        &self.clock
    }

    pub fn inbound(&self) -> &Arc<InboundPipeline> {
        &self.inbound
    }

    pub fn outbound(&self) -> &Arc<OutboundPipeline> {
        &self.outbound
    }

    pub fn sessions(&self) -> &Arc<SessionService> {
        &self.sessions
    }
}

#[async_trait]
impl SealedExchangeApi for ExchangeService {
    async fn open_request(
        &self,
        request: InboundRequest,
        received_at: DateTime<Utc>,
    ) -> Result<AuthenticatedRequest, AsxError> {
        self.inbound.open(request, received_at).await
    }

    async fn seal_response(
        &self,
        context: &ExchangeContext,
        payload: Option<Value>,
    ) -> Result<SealedResponse, AsxError> {
        self.outbound.seal(context, payload).await
    }
}

#[async_trait]
impl SessionApi for ExchangeService {
    async fn issue_session(&self, subject: &ResourceId) -> Result<Session, AsxError> {
        self.sessions.issue(subject).await
    }

    async fn require_session(&self, subject: &ResourceId) -> Result<Session, AsxError> {
        self.sessions.guard(subject).await
    }

    async fn end_session(&self, subject: &ResourceId) -> Result<(), AsxError> {
        self.sessions.logout(subject).await
    }
}
