//! # Domain Entities
//!
//! Wire structures and request/response shapes of the exchange.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use shared_crypto::Ed25519KeyPair;
use std::fmt;

/// A party's long-term public identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The local party: identifier plus its signing key.
///
/// The same key pair signs outgoing headers and bodies and opens payloads
/// sealed to this party.
#[derive(Debug)]
pub struct Identity {
    resource_id: ResourceId,
    keys: Ed25519KeyPair,
}

impl Identity {
    /// Bind an identifier to its current key pair.
    pub fn new(resource_id: ResourceId, keys: Ed25519KeyPair) -> Self {
        Self { resource_id, keys }
    }

    /// This party's identifier.
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// This party's key pair.
    pub fn keys(&self) -> &Ed25519KeyPair {
        &self.keys
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Signed, sealed message body: `{ "sig": ..., "cipher": ... }`.
///
/// Both fields are qualified text values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Signature over the [`SignedTuple`]
    pub sig: String,
    /// Sealed serialization of a [`SealedPayload`]
    pub cipher: String,
}

/// Plaintext inside `cipher`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SealedPayload {
    /// Sender identifier as declared inside the seal
    pub src: ResourceId,
    /// Application payload
    pub data: serde_json::Value,
}

/// Tuple covered by the body signature.
///
/// Serialized as compact JSON in declaration order; that byte string is what
/// gets signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignedTuple<'a> {
    pub src: &'a str,
    pub dest: &'a str,
    pub datetime: &'a str,
    pub cipher: &'a str,
}

impl SignedTuple<'_> {
    /// Canonical bytes to sign or verify.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a struct of &str fields cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

// =============================================================================
// Pipeline Inputs and Outputs
// =============================================================================

/// Raw message as received, before any verification.
#[derive(Clone, Debug)]
pub struct InboundRequest {
    pub method: Method,
    /// Request path, possibly with a query string
    pub path: String,
    pub headers: HeaderMap,
    /// Body bytes; an empty body is treated as absent
    pub body: Option<Bytes>,
}

impl InboundRequest {
    /// Build from parts, normalizing an empty body to `None`.
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            body: if body.is_empty() { None } else { Some(body) },
        }
    }
}

/// A message whose sender is proven and whose payload is decrypted.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthenticatedRequest {
    pub sender: ResourceId,
    pub timestamp: DateTime<Utc>,
    pub method: Method,
    pub path: String,
    /// Decrypted `data`, if the message carried a body
    pub body: Option<serde_json::Value>,
}

/// What the outbound pipeline signs against and seals to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeContext {
    pub method: Method,
    pub path: String,
    /// The other party (caller for responses, service for requests)
    pub peer: ResourceId,
}

impl ExchangeContext {
    pub fn new(method: Method, path: impl Into<String>, peer: ResourceId) -> Self {
        Self {
            method,
            path: path.into(),
            peer,
        }
    }
}

impl From<&AuthenticatedRequest> for ExchangeContext {
    fn from(request: &AuthenticatedRequest) -> Self {
        Self {
            method: request.method.clone(),
            path: request.path.clone(),
            peer: request.sender.clone(),
        }
    }
}

/// Signed headers plus the optional sealed body.
#[derive(Clone, Debug)]
pub struct SealedResponse {
    pub headers: HeaderMap,
    pub body: Option<Envelope>,
}

impl SealedResponse {
    /// Body bytes as they go on the wire.
    pub fn body_bytes(&self) -> Bytes {
        match &self.body {
            Some(envelope) => Bytes::from(serde_json::to_vec(envelope).unwrap_or_default()),
            None => Bytes::new(),
        }
    }
}
