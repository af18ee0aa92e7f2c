//! Random nonce generation.

use super::store::{NonceStore, NoopNonceStore};
use crate::error::IssuanceError;
use crate::metrics;
use crate::random::{self, RandomSource};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::sync::Arc;
use tracing::warn;
use zeroize::Zeroizing;

/// Default number of draws before a store collision is reported.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Produces base64url nonces from an injected random source.
pub struct Noncer {
    source: Arc<dyn RandomSource>,
    byte_length: usize,
    store: Arc<dyn NonceStore>,
    max_attempts: u32,
}

impl Noncer {
    /// Create a noncer drawing `byte_length` bytes per nonce, with no replay store.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::InvalidDescriptor`] if `byte_length` is zero.
    pub fn new(source: Arc<dyn RandomSource>, byte_length: usize) -> Result<Self, IssuanceError> {
        if byte_length == 0 {
            return Err(IssuanceError::invalid_descriptor(
                "nonce byte length must be positive",
            ));
        }

        Ok(Self {
            source,
            byte_length,
            store: Arc::new(NoopNonceStore),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Enforce uniqueness through `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn NonceStore>) -> Self {
        self.store = store;
        self
    }

    /// Set the draw budget per nonce. Values below one are raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Bytes of entropy per nonce.
    #[must_use]
    pub const fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Draw the next nonce.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::RandomnessUnavailable`] if the source fails; no
    ///   weaker source is tried.
    /// - [`IssuanceError::NonceExhausted`] if every draw collided with a
    ///   recorded nonce.
    /// - [`IssuanceError::NonceStoreUnavailable`] if the store fails.
    pub fn next(&self) -> Result<String, IssuanceError> {
        let mut raw = Zeroizing::new(vec![0u8; self.byte_length]);

        for attempt in 1..=self.max_attempts {
            if let Err(e) = random::fill(self.source.as_ref(), &mut raw) {
                metrics::record_nonce_draw("randomness_unavailable");
                return Err(e);
            }
            let nonce = URL_SAFE_NO_PAD.encode(raw.as_slice());

            if self.store.check_and_record(&nonce)? {
                metrics::record_nonce_draw("success");
                return Ok(nonce);
            }

            metrics::record_nonce_collision();
            warn!(
                attempt,
                max_attempts = self.max_attempts,
                "Nonce collided with a recorded value, redrawing"
            );
        }

        metrics::record_nonce_draw("exhausted");
        Err(IssuanceError::NonceExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl std::fmt::Debug for Noncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Noncer")
            .field("byte_length", &self.byte_length)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
