//! Replay bookkeeping for issued nonces.

use crate::error::IssuanceError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Records nonces so the same value is never issued twice.
pub trait NonceStore: Send + Sync {
    /// Check if `nonce` has already been recorded.
    fn seen(&self, nonce: &str) -> bool;

    /// Record `nonce` as issued.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::NonceStoreUnavailable`] if the store cannot
    /// accept the value.
    fn record(&self, nonce: &str) -> Result<(), IssuanceError>;

    /// Record `nonce` unless it was already seen.
    ///
    /// Returns `true` if the nonce is new and now recorded, `false` on a
    /// replay. Stores shared between threads override this so that check
    /// and record happen under one lock.
    ///
    /// # Errors
    ///
    /// Propagates [`NonceStore::record`] failures.
    fn check_and_record(&self, nonce: &str) -> Result<bool, IssuanceError> {
        if self.seen(nonce) {
            return Ok(false);
        }
        self.record(nonce)?;
        Ok(true)
    }
}

/// Store that enforces nothing. Uniqueness is left to entropy alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNonceStore;

impl NonceStore for NoopNonceStore {
    fn seen(&self, _nonce: &str) -> bool {
        false
    }

    fn record(&self, _nonce: &str) -> Result<(), IssuanceError> {
        Ok(())
    }

    fn check_and_record(&self, _nonce: &str) -> Result<bool, IssuanceError> {
        Ok(true)
    }
}

/// In-process store with an optional replay window.
///
/// Without a TTL every nonce is remembered for the life of the store.
/// With a TTL an entry is forgotten once it is older than the window,
/// which bounds memory for long-running issuers. Entries expire in
/// insertion order, so each write only looks at the oldest ones.
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    entries: Mutex<Entries>,
    ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct Entries {
    recorded: HashMap<String, Instant>,
    // Oldest first; only filled when a TTL is set.
    expiry: VecDeque<(Instant, String)>,
}

impl MemoryNonceStore {
    /// Create a store that never forgets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget nonces older than `ttl`.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Number of remembered nonces, including expired ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().recorded.len()
    }

    /// Check if nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, recorded_at: Instant, now: Instant) -> bool {
        self.ttl
            .map_or(true, |ttl| now.duration_since(recorded_at) < ttl)
    }

    fn prune(&self, entries: &mut Entries, now: Instant) {
        while let Some((recorded_at, _)) = entries.expiry.front() {
            if self.is_live(*recorded_at, now) {
                break;
            }
            if let Some((recorded_at, nonce)) = entries.expiry.pop_front() {
                // A re-recorded nonce keeps its newer timestamp.
                if entries.recorded.get(&nonce) == Some(&recorded_at) {
                    entries.recorded.remove(&nonce);
                }
            }
        }
    }

    fn insert(&self, entries: &mut Entries, nonce: &str, now: Instant) {
        entries.recorded.insert(nonce.to_string(), now);
        if self.ttl.is_some() {
            entries.expiry.push_back((now, nonce.to_string()));
        }
    }
}

impl NonceStore for MemoryNonceStore {
    fn seen(&self, nonce: &str) -> bool {
        self.lock()
            .recorded
            .get(nonce)
            .is_some_and(|recorded_at| self.is_live(*recorded_at, Instant::now()))
    }

    fn record(&self, nonce: &str) -> Result<(), IssuanceError> {
        let now = Instant::now();
        let mut entries = self.lock();
        self.prune(&mut entries, now);
        self.insert(&mut entries, nonce, now);
        Ok(())
    }

    fn check_and_record(&self, nonce: &str) -> Result<bool, IssuanceError> {
        let now = Instant::now();
        let mut entries = self.lock();
        self.prune(&mut entries, now);

        if entries.recorded.contains_key(nonce) {
            return Ok(false);
        }
        self.insert(&mut entries, nonce, now);
        Ok(true)
    }
}
