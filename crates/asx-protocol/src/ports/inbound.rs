//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of the exchange.
//! Implementations must be thread-safe (`Send + Sync`).

use crate::domain::entities::{
    AuthenticatedRequest, ExchangeContext, InboundRequest, ResourceId, SealedResponse,
};
use crate::domain::errors::AsxError;
use crate::domain::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Verify-and-unseal for requests, sign-and-seal for responses.
#[async_trait]
pub trait SealedExchangeApi: Send + Sync {
    /// Authenticate and decrypt an incoming message.
    ///
    /// `received_at` must be captured when the message arrived, before any
    /// suspension point.
    ///
    /// # Errors
    /// Any rejection of the inbound pipeline; the first failing step wins.
    async fn open_request(
        &self,
        request: InboundRequest,
        received_at: DateTime<Utc>,
    ) -> Result<AuthenticatedRequest, AsxError>;

    /// Sign headers and seal `payload` (if any) to the peer of `context`.
    ///
    /// # Errors
    /// `OutboundFailed` if the peer key cannot be resolved or sealing fails.
    /// Nothing partially protected is ever returned.
    async fn seal_response(
        &self,
        context: &ExchangeContext,
        payload: Option<Value>,
    ) -> Result<SealedResponse, AsxError>;
}

/// Session lifecycle for authenticated callers.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Convert the caller's latest fresh credential disclosure into a session.
    async fn issue_session(&self, subject: &ResourceId) -> Result<Session, AsxError>;

    /// Guard for protected operations: the caller's live session.
    ///
    /// # Errors
    /// * `Unauthenticated` - no session exists
    /// * `SessionExpired` - the session lapsed; it has been deleted
    async fn require_session(&self, subject: &ResourceId) -> Result<Session, AsxError>;

    /// Delete the caller's sessions. Idempotent.
    async fn end_session(&self, subject: &ResourceId) -> Result<(), AsxError>;
}
