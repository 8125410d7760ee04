//! # HTTP Adapter
//!
//! Tower middleware that puts the exchange in front of an axum router.
//!
//! Request path: capture receipt time, buffer the body, run the inbound
//! pipeline, hand the decrypted JSON to the handler with an
//! [`AuthenticatedCaller`] extension. Response path: buffer the handler's
//! body and run the outbound pipeline over it. Inbound rejections are
//! answered in plain JSON; there is no verified peer to seal them to.

use crate::domain::entities::{ExchangeContext, InboundRequest, ResourceId, SealedResponse};
use crate::domain::errors::AsxError;
use crate::ports::inbound::SealedExchangeApi;
use crate::service::ExchangeService;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Request};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, error, Instrument};

/// Request extension naming the verified sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    pub id: ResourceId,
    /// The sender's `signify-timestamp`
    pub sent_at: DateTime<Utc>,
}

impl IntoResponse for AsxError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({ "message": self.public_message() });

        let mut response = Response::new(Body::from(
            serde_json::to_vec(&body).unwrap_or_default(),
        ));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Layer applying the exchange to every request.
#[derive(Clone)]
pub struct AsxLayer {
    exchange: ExchangeService,
    max_body_bytes: usize,
}

impl AsxLayer {
    pub fn new(exchange: ExchangeService, max_body_bytes: usize) -> Self {
        Self {
            exchange,
            max_body_bytes,
        }
    }
}

impl<S> Layer<S> for AsxLayer {
    type Service = AsxService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AsxService {
            inner,
            exchange: self.exchange.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

/// Service produced by [`AsxLayer`].
#[derive(Clone)]
pub struct AsxService<S> {
    inner: S,
    exchange: ExchangeService,
    max_body_bytes: usize,
}

impl<S> Service<Request<Body>> for AsxService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Before any suspension point.
        let received_at = self.exchange.clock().now();

        let exchange = self.exchange.clone();
        let max_body_bytes = self.max_body_bytes;
        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = tracing::info_span!("asx", method = %req.method(), path = %req.uri().path());

        Box::pin(
            async move {
                let (mut parts, body) = req.into_parts();
                let bytes = match axum::body::to_bytes(body, max_body_bytes).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        return Ok(AsxError::MalformedEnvelope(format!("unreadable body: {}", e))
                            .into_response())
                    }
                };

                let path = parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
                let inbound = InboundRequest::new(
                    parts.method.clone(),
                    path,
                    parts.headers.clone(),
                    bytes,
                );

                let authenticated = match exchange.open_request(inbound, received_at).await {
                    Ok(authenticated) => authenticated,
                    Err(e) => return Ok(e.into_response()),
                };

                let context = ExchangeContext::from(&authenticated);
                let body = match &authenticated.body {
                    Some(data) => {
                        parts
                            .headers
                            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                        Body::from(serde_json::to_vec(data).unwrap_or_default())
                    }
                    None => Body::empty(),
                };
                parts.headers.remove(CONTENT_LENGTH);
                parts.extensions.insert(AuthenticatedCaller {
                    id: authenticated.sender,
                    sent_at: authenticated.timestamp,
                });

                let response = inner.call(Request::from_parts(parts, body)).await?;
                Ok(seal_response(&exchange, &context, response, max_body_bytes).await)
            }
            .instrument(span),
        )
    }
}

/// Run the outbound pipeline over a handler response.
///
/// Any failure replaces the response with a 500; the handler's body is never
/// sent unsealed.
async fn seal_response(
    exchange: &ExchangeService,
    context: &ExchangeContext,
    response: Response,
    max_body_bytes: usize,
) -> Response {
    let (mut parts, body) = response.into_parts();

    let payload = match axum::body::to_bytes(body, max_body_bytes).await {
        Ok(bytes) => match payload_from_bytes(&bytes) {
            Ok(payload) => payload,
            Err(e) => return e.into_response(),
        },
        Err(e) => {
            error!(reason = %e, "Handler response body unreadable");
            return AsxError::OutboundFailed(e.to_string()).into_response();
        }
    };

    let sealed: SealedResponse = match exchange.seal_response(context, payload).await {
        Ok(sealed) => sealed,
        Err(e) => return e.into_response(),
    };

    parts.headers.remove(CONTENT_LENGTH);
    parts.headers.remove(CONTENT_TYPE);
    if sealed.body.is_some() {
        parts
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    let body = sealed.body_bytes();
    parts.headers.extend(sealed.headers);

    debug!(status = %parts.status, peer = %context.peer, "Sealed response");
    Response::from_parts(parts, Body::from(body))
}

/// Handler bodies are JSON; plain UTF-8 text is carried as a JSON string.
fn payload_from_bytes(bytes: &[u8]) -> Result<Option<Value>, AsxError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    if let Ok(value) = serde_json::from_slice(bytes) {
        return Ok(Some(value));
    }
    std::str::from_utf8(bytes)
        .map(|text| Some(Value::String(text.to_string())))
        .map_err(|_| AsxError::OutboundFailed("handler returned a binary body".into()))
}
