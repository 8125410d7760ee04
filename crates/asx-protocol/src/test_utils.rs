//! Test utilities for the exchange.
//!
//! Deterministic clock, scripted key resolvers and [`Party`], a client-side
//! identity that seals requests and opens responses the way a real caller
//! would. Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use asx_protocol::test_utils::MockTimeSource;
//! use asx_protocol::TimeSource;
//! use chrono::{TimeZone, Utc};
//! use std::time::Duration;
//!
//! let clock = MockTimeSource::new(Utc.timestamp_opt(1_000, 0).unwrap());
//! clock.advance(Duration::from_millis(1500));
//! assert_eq!(clock.now().timestamp_millis(), 1_001_500);
//! ```

use crate::adapters::key_resolver::KeyDirectory;
use crate::config::ExchangeConfig;
use crate::domain::entities::{
    AuthenticatedRequest, ExchangeContext, Identity, InboundRequest, ResourceId, SealedResponse,
};
use crate::domain::errors::AsxResult;
use crate::domain::replay::ReplayCache;
use crate::ports::outbound::{KeyResolver, ResolveError, TimeSource};
use crate::service::{InboundPipeline, OutboundPipeline};
use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use chrono::{DateTime, Utc};
use http::{Method, Request};
use parking_lot::Mutex;
use serde_json::Value;
use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Time
// =============================================================================

/// Settable clock.
#[derive(Debug)]
pub struct MockTimeSource {
    now: Mutex<DateTime<Utc>>,
}

impl MockTimeSource {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(by).expect("advance within chrono range");
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// =============================================================================
// Key Resolvers
// =============================================================================

/// Always fails with the configured error.
#[derive(Debug)]
pub struct FailingResolver {
    error: ResolveError,
}

impl FailingResolver {
    pub fn new(error: ResolveError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl KeyResolver for FailingResolver {
    async fn resolve(&self, _id: &ResourceId) -> Result<Ed25519PublicKey, ResolveError> {
        Err(self.error.clone())
    }
}

/// Delays every lookup of the wrapped resolver.
#[derive(Debug)]
pub struct SlowResolver<R> {
    inner: R,
    delay: Duration,
}

impl<R: KeyResolver> SlowResolver<R> {
    pub fn new(inner: R, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<R: KeyResolver> KeyResolver for SlowResolver<R> {
    async fn resolve(&self, id: &ResourceId) -> Result<Ed25519PublicKey, ResolveError> {
        tokio::time::sleep(self.delay).await;
        self.inner.resolve(id).await
    }
}

/// Counts lookups passed to the wrapped resolver.
#[derive(Debug)]
pub struct CountingResolver<R> {
    inner: R,
    calls: AtomicUsize,
}

impl<R: KeyResolver> CountingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: KeyResolver> KeyResolver for CountingResolver<R> {
    async fn resolve(&self, id: &ResourceId) -> Result<Ed25519PublicKey, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(id).await
    }
}

// =============================================================================
// Parties
// =============================================================================

/// A caller with its own identity and client-side pipelines.
///
/// Registers its key in the directory it is created with.
pub struct Party {
    identity: Arc<Identity>,
    outbound: OutboundPipeline,
    inbound: InboundPipeline,
}

impl Party {
    pub fn new(
        id: &str,
        seed: [u8; 32],
        directory: &Arc<KeyDirectory>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let identity = Arc::new(Identity::new(
            ResourceId::new(id),
            Ed25519KeyPair::from_seed(seed),
        ));
        directory.register(identity.resource_id().clone(), identity.keys().public_key());

        let resolver: Arc<dyn KeyResolver> = directory.clone();
        Self {
            outbound: OutboundPipeline::new(identity.clone(), resolver.clone(), clock),
            inbound: InboundPipeline::new(
                identity.clone(),
                resolver,
                ReplayCache::new_shared(1024),
                &ExchangeConfig::default(),
            ),
            identity,
        }
    }

    pub fn id(&self) -> &ResourceId {
        self.identity.resource_id()
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    /// Sign and seal a request to `to`.
    pub async fn seal_request(
        &self,
        method: Method,
        path: &str,
        to: &ResourceId,
        body: Option<Value>,
    ) -> InboundRequest {
        let context = ExchangeContext::new(method.clone(), path, to.clone());
        let sealed = self
            .outbound
            .seal(&context, body)
            .await
            .expect("party failed to seal request");
        let body = sealed.body_bytes();
        InboundRequest::new(method, path, sealed.headers, body)
    }

    /// Same as [`Party::seal_request`], as an HTTP request for a router.
    pub async fn http_request(
        &self,
        method: Method,
        path: &str,
        to: &ResourceId,
        body: Option<Value>,
    ) -> Request<Body> {
        let sealed = self.seal_request(method, path, to, body).await;

        let mut builder = Request::builder().method(sealed.method).uri(sealed.path);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(sealed.headers);
            if sealed.body.is_some() {
                headers.insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("application/json"),
                );
            }
        }
        builder
            .body(sealed.body.map(Body::from).unwrap_or_else(Body::empty))
            .expect("valid request parts")
    }

    /// Verify and open a response to a request this party sent.
    pub async fn open_response(
        &self,
        method: Method,
        path: &str,
        response: SealedResponse,
        received_at: DateTime<Utc>,
    ) -> AsxResult<AuthenticatedRequest> {
        let body = response.body_bytes();
        self.inbound
            .open(
                InboundRequest::new(method, path, response.headers, body),
                received_at,
            )
            .await
    }

    /// Same as [`Party::open_response`], for an HTTP response.
    pub async fn open_http_response(
        &self,
        method: Method,
        path: &str,
        response: Response,
        received_at: DateTime<Utc>,
    ) -> AsxResult<AuthenticatedRequest> {
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("readable response body");
        self.inbound
            .open(
                InboundRequest::new(method, path, parts.headers, bytes),
                received_at,
            )
            .await
    }
}
