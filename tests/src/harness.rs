//! # Test Harness
//!
//! One service instance (router, exchange, in-memory stores) on a mock clock,
//! and helpers for parties talking to it over HTTP.

use asx_node::{build_exchange, router};
use asx_protocol::config::DEFAULT_PRIVILEGED_SCHEMA;
use asx_protocol::test_utils::{MockTimeSource, Party};
use asx_protocol::{
    AsxConfig, CredentialDisclosure, ExchangeService, Identity, InMemoryDisclosureStore,
    KeyDirectory, ResourceId, TimeSource,
};
use asx_protocol::InboundRequest;
use axum::body::Body;
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use http::{HeaderValue, Method, Request, StatusCode};
use serde_json::Value;
use shared_crypto::Ed25519KeyPair;
use std::sync::Arc;
use tower::ServiceExt;

/// Issuer trusted by the harness configuration
pub const ISSUER: &str = "EQualifiedVleiIssuer";

/// Seed of the service identity
pub const SERVICE_SEED: [u8; 32] = [0x5e; 32];

/// Start of every harness clock
pub const T0_MS: i64 = 1_792_400_000_000;

pub struct Harness {
    pub clock: Arc<MockTimeSource>,
    pub directory: Arc<KeyDirectory>,
    pub disclosures: Arc<InMemoryDisclosureStore>,
    pub exchange: ExchangeService,
    pub app: Router,
    pub service: ResourceId,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: AsxConfig) -> Self {
        let clock = Arc::new(MockTimeSource::new(
            Utc.timestamp_millis_opt(T0_MS).unwrap(),
        ));
        let directory = Arc::new(KeyDirectory::new());
        let disclosures = Arc::new(InMemoryDisclosureStore::new());

        let identity = Identity::new(
            ResourceId::new("EService"),
            Ed25519KeyPair::from_seed(SERVICE_SEED),
        );
        let service = identity.resource_id().clone();
        directory.register(service.clone(), identity.keys().public_key());

        let exchange = build_exchange(
            &config,
            identity,
            directory.clone(),
            disclosures.clone(),
            clock.clone(),
        );
        let app = router(exchange.clone(), config.exchange.max_body_bytes);

        Self {
            clock,
            directory,
            disclosures,
            exchange,
            app,
            service,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A party known to the service.
    pub fn party(&self, id: &str, seed: u8) -> Party {
        Party::new(id, [seed; 32], &self.directory, self.clock.clone())
    }

    /// A party the service has never heard of. It still knows the service.
    pub fn stranger(&self, id: &str, seed: u8) -> Party {
        let own = Arc::new(KeyDirectory::new());
        own.register(
            self.service.clone(),
            Ed25519KeyPair::from_seed(SERVICE_SEED).public_key(),
        );
        Party::new(id, [seed; 32], &own, self.clock.clone())
    }

    /// Record a privileged-schema disclosure from the trusted issuer.
    pub fn disclose(&self, subject: &ResourceId, issued_at: DateTime<Utc>) {
        self.disclose_schema(subject, DEFAULT_PRIVILEGED_SCHEMA, ISSUER, issued_at);
    }

    pub fn disclose_schema(
        &self,
        subject: &ResourceId,
        schema: &str,
        issuer: &str,
        issued_at: DateTime<Utc>,
    ) {
        self.disclosures.add(CredentialDisclosure {
            said: format!("ECredential{}", self.disclosures.len()),
            schema: schema.to_string(),
            issuer: ResourceId::new(issuer),
            subject: subject.clone(),
            issued_at,
        });
    }

    /// Send a sealed request and return the raw response.
    pub async fn send(
        &self,
        party: &Party,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Response {
        let request = party.http_request(method, path, &self.service, body).await;
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Send a sealed request, open the sealed response and return its status
    /// and decrypted body. Moves the clock 1 ms forward afterwards so that
    /// consecutive identical calls carry distinct timestamps.
    pub async fn call(
        &self,
        party: &Party,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(party, method.clone(), path, body).await;
        let status = response.status();

        let opened = party
            .open_http_response(method, path, response, self.now())
            .await
            .expect("response should be sealed to the caller");
        assert_eq!(opened.sender, self.service);

        self.clock.advance(std::time::Duration::from_millis(1));
        (status, opened.body.unwrap_or(Value::Null))
    }
}

/// Default configuration with the harness issuer trusted.
pub fn config() -> AsxConfig {
    let mut config = AsxConfig::default();
    config.session.issuer = ISSUER.to_string();
    config
}

/// Read a plain (unsealed) JSON error response.
pub async fn plain_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Wire form of an already sealed request, so one capture can be sent twice.
pub fn http_from(request: &InboundRequest) -> Request<Body> {
    let mut http = Request::builder()
        .method(request.method.clone())
        .uri(request.path.as_str())
        .body(
            request
                .body
                .clone()
                .map(Body::from)
                .unwrap_or_else(Body::empty),
        )
        .unwrap();
    http.headers_mut().extend(request.headers.clone());
    if request.body.is_some() {
        http.headers_mut().insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }
    http
}
