//! # Key Resolver Adapters
//!
//! - [`KeyDirectory`]: in-memory identifier to key map, the local stand-in
//!   for the external key-state directory
//! - [`TimeoutResolver`]: bounds any resolver so a lookup never stays pending

use crate::config::ConfigError;
use crate::domain::entities::ResourceId;
use crate::ports::outbound::{KeyResolver, ResolveError};
use async_trait::async_trait;
use dashmap::DashMap;
use shared_crypto::Ed25519PublicKey;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Current verification key per identifier.
///
/// Rotation replaces the key in place; later lookups see the new key.
#[derive(Debug, Default)]
pub struct KeyDirectory {
    keys: DashMap<ResourceId, Ed25519PublicKey>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{ "<identifier>": "<qualified key>", ... }`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let entries: HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let directory = Self::new();
        for (id, key) in entries {
            let key = Ed25519PublicKey::from_qb64(&key)
                .map_err(|e| ConfigError::Invalid(format!("key for {}: {}", id, e)))?;
            directory.register(ResourceId::new(id), key);
        }
        Ok(directory)
    }

    /// Add or replace the key of `id`.
    pub fn register(&self, id: ResourceId, key: Ed25519PublicKey) {
        self.keys.insert(id, key);
    }

    /// Replace the key of a known `id`; returns the previous key.
    pub fn rotate(&self, id: &ResourceId, key: Ed25519PublicKey) -> Option<Ed25519PublicKey> {
        let mut entry = self.keys.get_mut(id)?;
        let previous = *entry;
        *entry = key;
        debug!(id = %id, "Rotated verification key");
        Some(previous)
    }

    /// Forget `id`.
    pub fn remove(&self, id: &ResourceId) -> Option<Ed25519PublicKey> {
        self.keys.remove(id).map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyResolver for KeyDirectory {
    async fn resolve(&self, id: &ResourceId) -> Result<Ed25519PublicKey, ResolveError> {
        self.keys
            .get(id)
            .map(|key| *key)
            .ok_or_else(|| ResolveError::UnknownIdentifier(id.to_string()))
    }
}

/// Resolver wrapper that gives up after `timeout`.
#[derive(Debug)]
pub struct TimeoutResolver<R> {
    inner: R,
    timeout: Duration,
}

impl<R: KeyResolver> TimeoutResolver<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<R: KeyResolver> KeyResolver for TimeoutResolver<R> {
    async fn resolve(&self, id: &ResourceId) -> Result<Ed25519PublicKey, ResolveError> {
        match tokio::time::timeout(self.timeout, self.inner.resolve(id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(id = %id, timeout_ms = self.timeout.as_millis() as u64, "Key resolution timed out");
                Err(ResolveError::Timeout(self.timeout))
            }
        }
    }
}
