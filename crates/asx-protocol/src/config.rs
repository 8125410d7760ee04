//! Exchange and node configuration with validation.
//!
//! Every section is `#[serde(default)]`, so a JSON file only needs the fields
//! it changes. `ASX_*` environment variables override individual fields.

use crate::domain::session::SchemaRole;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

/// Schema of the credential that grants the privileged role by default.
pub const DEFAULT_PRIVILEGED_SCHEMA: &str = "EEy9PkikFcANV1l7EHukCeXqrzT1hNZjGlUk7wuMO5jw";

/// Role granted by [`DEFAULT_PRIVILEGED_SCHEMA`].
pub const PRIVILEGED_ROLE: &str = "privileged";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AsxConfig {
    /// Inbound/outbound pipeline settings
    pub exchange: ExchangeConfig,
    /// Session issuance and lifetime
    pub session: SessionConfig,
    /// Process wiring (listen address, key material, data files)
    pub node: NodeConfig,
}

impl AsxConfig {
    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override fields from `ASX_*` process environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Override fields from a variable lookup.
    ///
    /// Split out from [`AsxConfig::apply_env`] so overrides can be exercised
    /// without touching the process environment.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ASX_FRESHNESS_WINDOW_MS") {
            self.exchange.freshness_window_ms = parse_var("ASX_FRESHNESS_WINDOW_MS", &v)?;
        }
        if let Some(v) = lookup("ASX_REPLAY_TTL_MS") {
            self.exchange.replay_ttl_ms = parse_var("ASX_REPLAY_TTL_MS", &v)?;
        }
        if let Some(v) = lookup("ASX_REPLAY_MAX_ENTRIES") {
            self.exchange.replay_max_entries = parse_var("ASX_REPLAY_MAX_ENTRIES", &v)?;
        }
        if let Some(v) = lookup("ASX_KEY_RESOLUTION_TIMEOUT_MS") {
            self.exchange.key_resolution_timeout_ms =
                parse_var("ASX_KEY_RESOLUTION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("ASX_MAX_BODY_BYTES") {
            self.exchange.max_body_bytes = parse_var("ASX_MAX_BODY_BYTES", &v)?;
        }
        if let Some(v) = lookup("ASX_SESSION_DURATION_SECS") {
            self.session.duration_secs = parse_var("ASX_SESSION_DURATION_SECS", &v)?;
        }
        if let Some(v) = lookup("ASX_MAX_DISCLOSURE_AGE_MS") {
            self.session.max_disclosure_age_ms = parse_var("ASX_MAX_DISCLOSURE_AGE_MS", &v)?;
        }
        if let Some(v) = lookup("ASX_ISSUER") {
            self.session.issuer = v;
        }
        if let Some(v) = lookup("ASX_LISTEN_ADDR") {
            self.node.listen_addr = parse_var("ASX_LISTEN_ADDR", &v)?;
        }
        if let Some(v) = lookup("ASX_RESOURCE_ID") {
            self.node.resource_id = v;
        }
        if let Some(v) = lookup("ASX_IDENTITY_SEED") {
            self.node.identity_seed_hex = Some(v);
        }
        if let Some(v) = lookup("ASX_KEY_DIRECTORY") {
            self.node.key_directory_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("ASX_DISCLOSURES") {
            self.node.disclosures_path = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let exchange = &self.exchange;

        if exchange.freshness_window_ms == 0 {
            return Err(ConfigError::InvalidWindow(
                "freshness_window_ms cannot be 0".into(),
            ));
        }

        if exchange.replay_ttl_ms < exchange.freshness_window_ms {
            return Err(ConfigError::InvalidWindow(format!(
                "replay_ttl_ms ({}) must cover freshness_window_ms ({})",
                exchange.replay_ttl_ms, exchange.freshness_window_ms
            )));
        }

        if exchange.replay_max_entries == 0 {
            return Err(ConfigError::InvalidLimit(
                "replay_max_entries cannot be 0".into(),
            ));
        }

        if exchange.max_body_bytes == 0 {
            return Err(ConfigError::InvalidLimit("max_body_bytes cannot be 0".into()));
        }

        if exchange.replay_sweep_interval_ms == 0 || self.session.reap_interval_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "background intervals cannot be 0".into(),
            ));
        }

        if exchange.key_resolution_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "key_resolution_timeout_ms cannot be 0".into(),
            ));
        }

        if self.session.duration_secs == 0 {
            return Err(ConfigError::InvalidTimeout("session duration cannot be 0".into()));
        }

        if self.session.schemas.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one credential schema must be configured".into(),
            ));
        }

        if self.session.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid("session.issuer must be set".into()));
        }

        if self.node.resource_id.trim().is_empty() {
            return Err(ConfigError::Invalid("node.resource_id must be set".into()));
        }

        Ok(())
    }
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Maximum skew between `signify-timestamp` and receipt (default: 1000)
    pub freshness_window_ms: u64,
    /// Lifetime of an admitted fingerprint (default: 1000)
    pub replay_ttl_ms: u64,
    /// Replay cache capacity
    pub replay_max_entries: usize,
    /// Period of the background replay sweep
    pub replay_sweep_interval_ms: u64,
    /// Bound on a single key lookup
    pub key_resolution_timeout_ms: u64,
    /// Largest request or response body the HTTP layer buffers
    pub max_body_bytes: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: 1000,
            replay_ttl_ms: 1000,
            replay_max_entries: 100_000,
            replay_sweep_interval_ms: 1000,
            key_resolution_timeout_ms: 5000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ExchangeConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_millis(self.freshness_window_ms)
    }

    pub fn replay_ttl(&self) -> Duration {
        Duration::from_millis(self.replay_ttl_ms)
    }

    pub fn replay_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.replay_sweep_interval_ms)
    }

    pub fn key_resolution_timeout(&self) -> Duration {
        Duration::from_millis(self.key_resolution_timeout_ms)
    }
}

/// Session issuance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime (default: 24h)
    pub duration_secs: u64,
    /// Oldest disclosure that may still open a session (default: 60s)
    pub max_disclosure_age_ms: u64,
    /// Issuer whose credentials are accepted
    pub issuer: String,
    /// Accepted credential schemas and the role each grants
    pub schemas: Vec<SchemaRole>,
    /// Period of the expired-session reaper
    pub reap_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 24 * 60 * 60,
            max_disclosure_age_ms: 60_000,
            issuer: String::new(),
            schemas: vec![SchemaRole {
                schema: DEFAULT_PRIVILEGED_SCHEMA.to_string(),
                role: Some(PRIVILEGED_ROLE.to_string()),
            }],
            reap_interval_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn max_disclosure_age(&self) -> Duration {
        Duration::from_millis(self.max_disclosure_age_ms)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

/// Process wiring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP bind address
    pub listen_addr: SocketAddr,
    /// This service's resource identifier
    pub resource_id: String,
    /// Hex Ed25519 seed; a fresh key is generated when absent
    pub identity_seed_hex: Option<String>,
    /// JSON map of identifier to qualified verification key
    pub key_directory_path: Option<PathBuf>,
    /// JSON array of credential disclosures
    pub disclosures_path: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 7676)),
            resource_id: "asx-service".to_string(),
            identity_seed_hex: None,
            key_directory_path: None,
            disclosures_path: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidVariable(name.to_string(), value.to_string()))
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for this schema
    #[error("cannot parse configuration: {0}")]
    Parse(String),
    /// An environment override could not be parsed
    #[error("invalid value for {0}: {1:?}")]
    InvalidVariable(String, String),
    /// Invalid freshness or replay window
    #[error("invalid window: {0}")]
    InvalidWindow(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout or interval
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
