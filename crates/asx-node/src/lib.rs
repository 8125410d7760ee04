//! # ASX Node
//!
//! The service process: a small protected HTTP API behind [`AsxLayer`].
//!
//! ## Routes
//!
//! Every route is reached through the exchange, so each handler already knows
//! the verified caller from the [`AuthenticatedCaller`] extension.
//!
//! - `GET /ping`: liveness, answered for any verified caller
//! - `POST /login`: issue a session from the caller's latest disclosure
//! - `GET /session`: the caller's active session (guarded)
//! - `POST /echo`: return the decrypted body to its sender (guarded)
//! - `POST /logout`: end the caller's sessions
//!
//! ## Wiring
//!
//! [`load_identity`], [`load_key_directory`] and [`load_disclosures`] read the
//! process inputs named in [`NodeConfig`]; [`build_exchange`] assembles the
//! in-memory adapters around them.

use anyhow::{Context, Result};
use asx_protocol::{
    AsxConfig, AsxError, AsxLayer, AuthenticatedCaller, ExchangeDeps, ExchangeService, Identity,
    InMemoryDisclosureStore, InMemorySessionStore, KeyDirectory, KeyResolver, NodeConfig,
    ReplayCache, ResourceId, Session, SessionApi, TimeSource, TimeoutResolver,
};
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use shared_crypto::Ed25519KeyPair;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub exchange: ExchangeService,
}

// =============================================================================
// Router
// =============================================================================

/// Build the protected router.
///
/// The exchange wraps every route; tracing wraps the exchange.
pub fn router(exchange: ExchangeService, max_body_bytes: usize) -> Router {
    let state = AppState {
        exchange: exchange.clone(),
    };

    Router::new()
        .route("/ping", get(ping))
        .route("/login", post(login))
        .route("/session", get(current_session))
        .route("/echo", post(echo))
        .route("/logout", post(logout))
        .layer(AsxLayer::new(exchange, max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}

async fn login(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
) -> Result<Json<Session>, AsxError> {
    state.exchange.issue_session(&caller.id).await.map(Json)
}

async fn current_session(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
) -> Result<Json<Session>, AsxError> {
    state.exchange.require_session(&caller.id).await.map(Json)
}

async fn echo(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    body: Bytes,
) -> Result<Json<Value>, AsxError> {
    state.exchange.require_session(&caller.id).await?;

    // The exchange layer only forwards bodies it has decoded as JSON.
    let data = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| AsxError::MalformedEnvelope(e.to_string()))?
    };
    Ok(Json(json!({ "from": caller.id.as_str(), "echo": data })))
}

async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
) -> Result<Json<Value>, AsxError> {
    state.exchange.end_session(&caller.id).await?;
    Ok(Json(json!({ "loggedOut": caller.id.as_str() })))
}

// =============================================================================
// Wiring
// =============================================================================

/// This service's identity from `identity_seed_hex`, or a fresh one.
pub fn load_identity(config: &NodeConfig) -> Result<Identity> {
    let keys = match &config.identity_seed_hex {
        Some(seed_hex) => {
            let bytes = hex::decode(seed_hex.trim()).context("identity seed is not hex")?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("identity seed must be 32 bytes (64 hex chars)"))?;
            Ed25519KeyPair::from_seed(seed)
        }
        None => {
            warn!("No identity seed configured; generated an ephemeral identity");
            Ed25519KeyPair::generate()
        }
    };

    let identity = Identity::new(ResourceId::new(config.resource_id.clone()), keys);
    info!(
        resource = %identity.resource_id(),
        key = %identity.keys().public_key().to_qb64(),
        "Loaded service identity"
    );
    Ok(identity)
}

/// The key directory file, or an empty directory.
pub fn load_key_directory(config: &NodeConfig) -> Result<KeyDirectory> {
    match &config.key_directory_path {
        Some(path) => {
            let directory = KeyDirectory::from_json(&read(path)?)
                .with_context(|| format!("invalid key directory {}", path.display()))?;
            info!(path = %path.display(), keys = directory.len(), "Loaded key directory");
            Ok(directory)
        }
        None => {
            warn!("No key directory configured; every caller will be unknown");
            Ok(KeyDirectory::new())
        }
    }
}

/// The disclosures file, or an empty store.
pub fn load_disclosures(config: &NodeConfig) -> Result<InMemoryDisclosureStore> {
    match &config.disclosures_path {
        Some(path) => {
            let store = InMemoryDisclosureStore::from_json(&read(path)?)
                .with_context(|| format!("invalid disclosures {}", path.display()))?;
            info!(path = %path.display(), disclosures = store.len(), "Loaded disclosures");
            Ok(store)
        }
        None => Ok(InMemoryDisclosureStore::new()),
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Assemble the exchange around the in-memory adapters.
///
/// Key lookups are bounded by `exchange.key_resolution_timeout_ms`.
pub fn build_exchange(
    config: &AsxConfig,
    identity: Identity,
    directory: Arc<KeyDirectory>,
    disclosures: Arc<InMemoryDisclosureStore>,
    clock: Arc<dyn TimeSource>,
) -> ExchangeService {
    let resolver: Arc<dyn KeyResolver> = Arc::new(TimeoutResolver::new(
        directory,
        config.exchange.key_resolution_timeout(),
    ));

    let deps = ExchangeDeps {
        resolver,
        replay: ReplayCache::new_shared(config.exchange.replay_max_entries),
        sessions: Arc::new(InMemorySessionStore::new()),
        disclosures,
        clock,
    };
    ExchangeService::new(Arc::new(identity), deps, config)
}
