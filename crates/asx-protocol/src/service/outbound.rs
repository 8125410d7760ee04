//! # Outbound Pipeline
//!
//! Signs headers as the local identity and seals an optional payload to the
//! peer. Responses and client-side requests share this path.

use crate::domain::entities::{
    Envelope, ExchangeContext, Identity, ResourceId, SealedPayload, SealedResponse, SignedTuple,
};
use crate::domain::errors::{AsxError, AsxResult};
use crate::domain::headers::{format_timestamp, RESOURCE_HEADER, TIMESTAMP_HEADER};
use crate::domain::signing::sign_headers;
use crate::ports::outbound::{KeyResolver, TimeSource};
use http::{HeaderMap, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Sign-and-seal stage.
pub struct OutboundPipeline {
    identity: Arc<Identity>,
    resolver: Arc<dyn KeyResolver>,
    clock: Arc<dyn TimeSource>,
}

impl OutboundPipeline {
    pub fn new(
        identity: Arc<Identity>,
        resolver: Arc<dyn KeyResolver>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            identity,
            resolver,
            clock,
        }
    }

    /// Identity messages are signed as.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Produce signed headers and, when `payload` is present, a sealed body.
    ///
    /// # Errors
    ///
    /// `OutboundFailed` for any resolution, sealing or signing failure. The
    /// whole message fails; no partially protected body is returned.
    pub async fn seal(
        &self,
        context: &ExchangeContext,
        payload: Option<Value>,
    ) -> AsxResult<SealedResponse> {
        let result = self.seal_inner(context, payload).await;

        match &result {
            Ok(sealed) => debug!(
                peer = %context.peer,
                path = %context.path,
                sealed_body = sealed.body.is_some(),
                "Sealed outbound message"
            ),
            Err(e) => error!(peer = %context.peer, path = %context.path, reason = %e, "Outbound sealing failed"),
        }

        result
    }

    async fn seal_inner(
        &self,
        context: &ExchangeContext,
        payload: Option<Value>,
    ) -> AsxResult<SealedResponse> {
        let now = self.clock.now();
        let datetime = format_timestamp(now);

        let mut headers = HeaderMap::new();
        headers.insert(
            RESOURCE_HEADER,
            header_value(self.identity.resource_id().as_str())?,
        );
        headers.insert(TIMESTAMP_HEADER, header_value(&datetime)?);

        sign_headers(
            &self.identity,
            &context.method,
            &context.path,
            &mut headers,
            now.timestamp(),
        )
        .map_err(outbound_failed)?;

        let body = match payload {
            Some(data) => Some(self.seal_payload(&context.peer, &datetime, data).await?),
            None => None,
        };

        Ok(SealedResponse { headers, body })
    }

    /// Seal `{src, data}` to `peer` and sign the `{src, dest, datetime, cipher}` tuple.
    async fn seal_payload(
        &self,
        peer: &ResourceId,
        datetime: &str,
        data: Value,
    ) -> AsxResult<Envelope> {
        let peer_key = self
            .resolver
            .resolve(peer)
            .await
            .map_err(|e| AsxError::OutboundFailed(format!("resolve {}: {}", peer, e)))?;
        let encryption_key = peer_key.to_encryption_key().map_err(outbound_failed)?;

        let plaintext = serde_json::to_vec(&SealedPayload {
            src: self.identity.resource_id().clone(),
            data,
        })
        .map_err(outbound_failed)?;
        let cipher = shared_crypto::seal(&encryption_key, &plaintext)
            .map_err(outbound_failed)?
            .to_qb64();

        let tuple = SignedTuple {
            src: self.identity.resource_id().as_str(),
            dest: peer.as_str(),
            datetime,
            cipher: &cipher,
        };
        let sig = self.identity.keys().sign(&tuple.to_bytes()).to_qb64();

        Ok(Envelope { sig, cipher })
    }
}

fn header_value(value: &str) -> AsxResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(outbound_failed)
}

fn outbound_failed(e: impl std::fmt::Display) -> AsxError {
    AsxError::OutboundFailed(e.to_string())
}
