//! Process-wide signing key registry.
//!
//! Keys are bound to their `kid` exactly once. Resolution takes a per-kid
//! slot lock before checking for an existing key, so two callers that miss
//! at the same time cannot both generate: the second one waits and then
//! sees the first one's key.

use super::algorithm::SigningAlgorithm;
use super::signing_key::SigningKey;
use super::KeyDescriptor;
use crate::error::IssuanceError;
use crate::jwks::Jwks;
use crate::metrics;
use crate::random::{self, RandomSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{info, warn};

type Slot = Arc<Mutex<Option<Arc<SigningKey>>>>;

/// Registry of signing keys indexed by key id.
pub struct Registry {
    source: Arc<dyn RandomSource>,
    slots: RwLock<HashMap<String, Slot>>,
}

impl Registry {
    /// Create an empty registry that generates all key material from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::RandomnessUnavailable`] if `source` cannot
    /// produce a single byte.
    pub fn new(source: Arc<dyn RandomSource>) -> Result<Self, IssuanceError> {
        let mut probe = [0u8; 1];
        random::fill(source.as_ref(), &mut probe)?;

        Ok(Self {
            source,
            slots: RwLock::new(HashMap::new()),
        })
    }

    /// Return the key bound to `descriptor.kid`, generating it on first use.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::InvalidDescriptor`] for an empty kid or a strength
    ///   `algorithm` does not accept; nothing is generated in that case.
    /// - [`IssuanceError::KeyConflict`] if the kid is bound to a key with a
    ///   different algorithm or strength.
    /// - [`IssuanceError::KeyGenerationFailed`] or
    ///   [`IssuanceError::RandomnessUnavailable`] if generation fails. The kid
    ///   stays unbound and a later call may retry.
    pub fn resolve(
        &self,
        descriptor: &KeyDescriptor,
        algorithm: SigningAlgorithm,
    ) -> Result<Arc<SigningKey>, IssuanceError> {
        if descriptor.kid.is_empty() {
            return Err(IssuanceError::invalid_descriptor("kid must not be empty"));
        }
        algorithm.validate_bits(descriptor.bits)?;

        let slot = self.slot(&descriptor.kid);
        let mut bound = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(key) = bound.as_ref() {
            if key.matches(algorithm, descriptor.bits) {
                return Ok(Arc::clone(key));
            }

            warn!(
                kid = %descriptor.kid,
                existing_alg = %key.algorithm(),
                existing_bits = key.bits(),
                requested_alg = %algorithm,
                requested_bits = descriptor.bits,
                "Rejected conflicting key descriptor"
            );
            return Err(IssuanceError::KeyConflict {
                kid: descriptor.kid.clone(),
                existing: format!("{}/{}", key.algorithm(), key.bits()),
                requested: format!("{algorithm}/{}", descriptor.bits),
            });
        }

        let key = match SigningKey::generate(
            descriptor.kid.clone(),
            algorithm,
            descriptor.bits,
            self.source.as_ref(),
        ) {
            Ok(key) => Arc::new(key),
            Err(e) => {
                drop(bound);
                self.release_empty_slot(&descriptor.kid, &slot);
                warn!(kid = %descriptor.kid, algorithm = %algorithm, error = %e, "Key generation failed");
                return Err(e);
            }
        };
        *bound = Some(Arc::clone(&key));

        metrics::record_key_generated(algorithm.as_str());
        info!(
            kid = %descriptor.kid,
            algorithm = %algorithm,
            bits = descriptor.bits,
            "Generated signing key"
        );

        Ok(key)
    }

    /// Look up a key by id without generating.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        let slot = {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.get(kid)?)
        };
        let bound = slot.lock().unwrap_or_else(PoisonError::into_inner);
        bound.clone()
    }

    /// Ids of all bound keys, sorted.
    #[must_use]
    pub fn kids(&self) -> Vec<String> {
        let mut kids: Vec<String> = self
            .keys()
            .into_iter()
            .map(|key| key.kid().to_string())
            .collect();
        kids.sort();
        kids
    }

    /// Number of bound keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Check if no key is bound yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Public key set for verifiers. Shared-secret keys are left out.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        let mut keys = self.keys();
        keys.sort_by(|a, b| a.kid().cmp(b.kid()));

        let mut jwks = Jwks::new();
        for key in keys {
            if let Some(jwk) = key.public_jwk() {
                jwks.add_key(jwk);
            }
        }
        jwks
    }

    /// The source all key material is drawn from.
    #[must_use]
    pub fn random_source(&self) -> Arc<dyn RandomSource> {
        Arc::clone(&self.source)
    }

    fn slot(&self, kid: &str) -> Slot {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(kid) {
                return Arc::clone(slot);
            }
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(kid.to_string()).or_default())
    }

    /// Drop the map entry for `kid` if it is still `slot`, still empty and
    /// nobody else holds it.
    fn release_empty_slot(&self, kid: &str, slot: &Slot) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let unused = slots.get(kid).is_some_and(|current| Arc::ptr_eq(current, slot))
            && Arc::strong_count(slot) == 2
            && slot.lock().unwrap_or_else(PoisonError::into_inner).is_none();
        if unused {
            slots.remove(kid);
        }
    }

    fn keys(&self) -> Vec<Arc<SigningKey>> {
        let slots: Vec<Slot> = {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            slots.values().cloned().collect()
        };

        slots
            .iter()
            .filter_map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kids", &self.kids())
            .finish_non_exhaustive()
    }
}
