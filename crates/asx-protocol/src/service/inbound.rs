//! # Inbound Pipeline
//!
//! Verify-and-unseal for one received message. Steps run in a fixed order
//! and the first failure ends the request:
//!
//! 1. `signify-resource` and `signify-timestamp` present
//! 2. timestamp within the freshness window of receipt
//! 3. fingerprint not already admitted (cheap pre-check, no crypto yet)
//! 4. sender key resolved
//! 5. header signature block verified
//! 6. body envelope verified, opened and bound to the header sender
//! 7. fingerprint admitted (atomic; the loser of a race is a replay)
//! 8. authenticated request handed back
//!
//! Nothing is admitted to the replay cache until every check has passed.

use crate::config::ExchangeConfig;
use crate::domain::entities::{
    AuthenticatedRequest, Envelope, Identity, InboundRequest, ResourceId, SealedPayload,
    SignedTuple,
};
use crate::domain::errors::{AsxError, AsxResult, ErrorCategory};
use crate::domain::headers::{
    check_freshness, parse_timestamp, replay_expiry, require_header, RESOURCE_HEADER,
    TIMESTAMP_HEADER,
};
use crate::domain::replay::{Admission, Fingerprint, ReplayCache};
use crate::domain::signing::{signature_header, verify_headers};
use crate::ports::outbound::KeyResolver;
use chrono::{DateTime, Utc};
use serde_json::Value;
use shared_crypto::{DecryptionKey, Ed25519PublicKey, Ed25519Signature, SealedBlob};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Verify-and-unseal stage.
pub struct InboundPipeline {
    identity: Arc<Identity>,
    decryption_key: DecryptionKey,
    resolver: Arc<dyn KeyResolver>,
    replay: Arc<ReplayCache>,
    freshness_window: Duration,
    replay_ttl: Duration,
}

impl InboundPipeline {
    pub fn new(
        identity: Arc<Identity>,
        resolver: Arc<dyn KeyResolver>,
        replay: Arc<ReplayCache>,
        config: &ExchangeConfig,
    ) -> Self {
        let decryption_key = identity.keys().decryption_key();
        Self {
            identity,
            decryption_key,
            resolver,
            replay,
            freshness_window: config.freshness_window(),
            replay_ttl: config.replay_ttl(),
        }
    }

    /// Replay cache this pipeline admits into.
    pub fn replay_cache(&self) -> &Arc<ReplayCache> {
        &self.replay
    }

    /// Authenticate and decrypt `request`.
    ///
    /// `received_at` is the receipt instant; freshness and replay expiry are
    /// judged against it, never against a clock read after suspension. The
    /// replay entry outlives both `received_at` and the sender's timestamp by
    /// the replay TTL.
    pub async fn open(
        &self,
        request: InboundRequest,
        received_at: DateTime<Utc>,
    ) -> AsxResult<AuthenticatedRequest> {
        let claimed_sender = request
            .headers
            .get(RESOURCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string();
        let path = request.path.clone();

        let result = self.open_inner(request, received_at).await;

        match &result {
            Ok(authenticated) => debug!(
                sender = %authenticated.sender,
                path = %authenticated.path,
                has_body = authenticated.body.is_some(),
                "Admitted inbound message"
            ),
            Err(e) if e.category() == ErrorCategory::Authentication => warn!(
                sender = %claimed_sender,
                path = %path,
                reason = %e,
                "Rejected unauthenticated message"
            ),
            Err(e) => debug!(
                sender = %claimed_sender,
                path = %path,
                reason = %e,
                "Rejected inbound message"
            ),
        }

        result
    }

    async fn open_inner(
        &self,
        request: InboundRequest,
        received_at: DateTime<Utc>,
    ) -> AsxResult<AuthenticatedRequest> {
        // 1. Presence
        let sender = require_header(&request.headers, RESOURCE_HEADER)?;
        let datetime = require_header(&request.headers, TIMESTAMP_HEADER)?;

        // 2. Freshness
        let sent_at = parse_timestamp(datetime)?;
        check_freshness(sent_at, received_at, self.freshness_window)?;

        // 3. Fingerprint pre-check
        let body = request.body.as_deref().map(parse_body).transpose()?;
        let body_sig = body
            .as_ref()
            .and_then(|b| b.get("sig"))
            .and_then(Value::as_str);
        let fingerprint = Fingerprint::compute(signature_header(&request.headers)?, body_sig);
        if self.replay.contains(&fingerprint, received_at) {
            return Err(AsxError::ReplayDetected);
        }

        // 4. Key resolution
        let sender_id = ResourceId::new(sender);
        let sender_key = self
            .resolver
            .resolve(&sender_id)
            .await
            .map_err(|e| AsxError::KeyResolutionFailed(e.to_string()))?;

        // 5. Header signature
        verify_headers(
            &sender_key,
            sender,
            &request.method,
            &request.path,
            &request.headers,
        )?;

        // 6. Body
        let data = match body {
            Some(body) => Some(self.unseal(&sender_key, sender, datetime, body)?),
            None => None,
        };

        // 7. Admit, live for as long as the timestamp could still pass step 2
        let expires_at = replay_expiry(sent_at, received_at, self.replay_ttl);
        match self.replay.insert(fingerprint, received_at, expires_at) {
            Admission::Admitted => {}
            Admission::Duplicate => return Err(AsxError::ReplayDetected),
            Admission::Full => return Err(AsxError::ReplayCacheFull),
        }

        // 8. Hand off
        Ok(AuthenticatedRequest {
            sender: sender_id,
            timestamp: sent_at,
            method: request.method,
            path: request.path,
            body: data,
        })
    }

    /// Steps 6a-6f: envelope shape, body signature, unseal, source binding.
    fn unseal(
        &self,
        sender_key: &Ed25519PublicKey,
        sender: &str,
        datetime: &str,
        body: Value,
    ) -> AsxResult<Value> {
        let envelope: Envelope = serde_json::from_value(body)
            .map_err(|e| AsxError::MalformedEnvelope(format!("expected {{sig, cipher}}: {}", e)))?;

        let sig = Ed25519Signature::from_qb64(&envelope.sig)
            .map_err(|e| AsxError::MalformedEnvelope(format!("sig: {}", e)))?;

        let tuple = SignedTuple {
            src: sender,
            dest: self.identity.resource_id().as_str(),
            datetime,
            cipher: &envelope.cipher,
        };
        sender_key
            .verify(&tuple.to_bytes(), &sig)
            .map_err(|_| AsxError::InvalidBodySignature)?;

        let blob = SealedBlob::from_qb64(&envelope.cipher)
            .map_err(|e| AsxError::MalformedEnvelope(format!("cipher: {}", e)))?;

        let plaintext = shared_crypto::open(&self.decryption_key, &blob)
            .map_err(|_| AsxError::DecryptionFailed)?;
        let payload: SealedPayload =
            serde_json::from_slice(&plaintext).map_err(|_| AsxError::DecryptionFailed)?;

        if payload.src.as_str() != sender {
            return Err(AsxError::SourceMismatch);
        }

        Ok(payload.data)
    }
}

fn parse_body(bytes: &[u8]) -> AsxResult<Value> {
    serde_json::from_slice(bytes)
        .map_err(|e| AsxError::MalformedEnvelope(format!("body is not JSON: {}", e)))
}
