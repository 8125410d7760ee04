//! # Authenticated Sealed Exchange (ASX)
//!
//! Per-message sender authentication, payload confidentiality and replay
//! protection for HTTP exchanges between parties holding long-term Ed25519
//! identities, plus the session lifecycle that a fresh credential disclosure
//! unlocks.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): wire types, header signing, freshness,
//!   replay fingerprints, session decisions. No I/O.
//! - **Ports Layer** (`ports/`): inbound API traits and the outbound
//!   dependencies (key resolution, session storage, disclosures, time)
//! - **Adapters Layer** (`adapters/`): in-memory stores, key directory,
//!   timeout-bounded resolution, the tower/axum HTTP layer
//! - **Service Layer** (`service/`): the inbound and outbound pipelines and
//!   the session service
//!
//! ## Security Notes
//!
//! - Freshness is judged against the receipt instant, before any I/O
//! - Stale and replayed messages are rejected before any key lookup or
//!   signature work
//! - A fingerprint is admitted atomically and only after every check passed
//! - Signature, decryption and source-binding failures share one public
//!   message
//! - The replay window equals the freshness window: it stops duplicates
//!   inside the window, not replays after it

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export public API
pub use adapters::{
    AsxLayer, AsxService, AuthenticatedCaller, InMemoryDisclosureStore, InMemorySessionStore,
    KeyDirectory, TimeoutResolver,
};
pub use config::{AsxConfig, ConfigError, ExchangeConfig, NodeConfig, SessionConfig};
pub use domain::entities::{
    AuthenticatedRequest, Envelope, ExchangeContext, Identity, InboundRequest, ResourceId,
    SealedPayload, SealedResponse, SignedTuple,
};
pub use domain::errors::{AsxError, AsxResult, ErrorCategory, NOT_VALID_FOR_RESOURCE};
pub use domain::headers::{
    format_timestamp, parse_timestamp, RESOURCE_HEADER, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER,
    TIMESTAMP_HEADER,
};
pub use domain::replay::{spawn_replay_sweeper, Admission, Fingerprint, ReplayCache};
pub use domain::session::{CredentialDisclosure, NewSession, SchemaRole, Session, SessionId};
pub use ports::inbound::{SealedExchangeApi, SessionApi};
pub use ports::outbound::{
    DisclosureError, DisclosureSource, KeyResolver, RepositoryError, ResolveError,
    SessionRepository, SystemTimeSource, TimeSource,
};
pub use service::{
    spawn_session_reaper, ExchangeDeps, ExchangeService, InboundPipeline, OutboundPipeline,
    SessionService,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
