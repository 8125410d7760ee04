//! # Replay Cache
//!
//! Fingerprints of recently admitted messages with a per-entry expiry.
//!
//! ## Design
//!
//! - `DashMap<Fingerprint, DateTime<Utc>>` maps each fingerprint to its expiry
//! - Lookups treat expired entries as absent and drop them (lazy expiry)
//! - A periodic sweep reclaims entries nobody looks up again
//! - [`ReplayCache::insert`] is an atomic check-and-insert on the entry's shard,
//!   so two identical messages racing through the pipeline cannot both win
//!
//! An entry lives up to and including its expiry instant. Callers pick an
//! expiry no earlier than the last instant the message could still pass the
//! freshness check, so every fresh copy finds the entry.

use crate::ports::outbound::TimeSource;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_crypto::blake3_hex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Digest identifying one message for replay purposes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive from the Signature header value and, if present, the body `sig`.
    pub fn compute(signature_header: &str, body_sig: Option<&str>) -> Self {
        let body = body_sig.unwrap_or_default();
        Self(blake3_hex(&[signature_header.as_bytes(), body.as_bytes()]))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of [`ReplayCache::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// First sighting inside the window
    Admitted,
    /// An unexpired entry already exists
    Duplicate,
    /// The cache is at capacity even after sweeping
    Full,
}

/// Thread-safe fingerprint cache for replay prevention.
#[derive(Debug)]
pub struct ReplayCache {
    entries: DashMap<Fingerprint, DateTime<Utc>>,
    max_entries: usize,
}

impl ReplayCache {
    /// Creates an empty cache holding at most `max_entries` fingerprints.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    /// Creates a cache wrapped in Arc for shared ownership.
    pub fn new_shared(max_entries: usize) -> Arc<Self> {
        Arc::new(Self::new(max_entries))
    }

    /// Whether `fingerprint` was admitted and has not yet expired at `now`.
    pub fn contains(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        let expired = match self.entries.get(fingerprint) {
            Some(expiry) if *expiry >= now => return true,
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(fingerprint, |_, expiry| *expiry < now);
        }
        false
    }

    /// Atomically admit `fingerprint` until `expires_at` unless an unexpired entry exists.
    pub fn insert(
        &self,
        fingerprint: Fingerprint,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Admission {
        if self.entries.len() >= self.max_entries {
            self.sweep(now);
            if self.entries.len() >= self.max_entries {
                return Admission::Full;
            }
        }

        match self.entries.entry(fingerprint) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() >= now {
                    Admission::Duplicate
                } else {
                    occupied.insert(expires_at);
                    Admission::Admitted
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(expires_at);
                Admission::Admitted
            }
        }
    }

    /// Drop every entry expired at `now`; returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expiry| *expiry >= now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of tracked fingerprints (including not-yet-swept expired ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run [`ReplayCache::sweep`] every `period` until the handle is aborted.
pub fn spawn_replay_sweeper(
    cache: Arc<ReplayCache>,
    clock: Arc<dyn TimeSource>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = cache.sweep(clock.now());
            if removed > 0 {
                debug!(removed, remaining = cache.len(), "Swept expired replay fingerprints");
            }
        }
    })
}
