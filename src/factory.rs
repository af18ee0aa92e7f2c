//! Token factory.
//!
//! A [`Factory`] is built once per issuer configuration. Construction
//! validates the [`Descriptor`] and resolves the signing key eagerly, so a
//! bad algorithm or key size stops service startup instead of failing the
//! first request. A constructed factory is always ready; `new_token` holds
//! no per-factory mutable state and may be called from any number of
//! threads.

use crate::error::IssuanceError;
use crate::jwt::claims::{self, Request};
use crate::jwt::JwtSerializer;
use crate::key::{KeyDescriptor, Registry, SigningAlgorithm, SigningKey};
use crate::metrics;
use crate::nonce::Noncer;
use crate::random::RandomSource;
use jsonwebtoken::Header;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Longest token lifetime or not-before offset a descriptor may carry.
pub const MAX_CLAIM_OFFSET_DAYS: i64 = 36_525;

/// Static issuance configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// JOSE algorithm name, e.g. `RS256`
    pub alg: String,
    /// Signing key to resolve
    pub key: KeyDescriptor,
    /// Embed a fresh nonce as `jti` in every token
    pub nonce: bool,
    /// Value for `iss`
    pub issuer: Option<String>,
    /// Token lifetime; sets `iat` and `exp`
    pub duration: Option<chrono::Duration>,
    /// Offset from issue time for `nbf`; negative values backdate
    pub not_before: Option<chrono::Duration>,
    /// Claims present in every token unless the request overrides them
    pub claims: Map<String, Value>,
}

impl Descriptor {
    /// Create a descriptor with no lifetime, issuer or static claims.
    #[must_use]
    pub fn new(alg: impl Into<String>, key: KeyDescriptor, nonce: bool) -> Self {
        Self {
            alg: alg.into(),
            key,
            nonce,
            issuer: None,
            duration: None,
            not_before: None,
            claims: Map::new(),
        }
    }

    /// Set the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the token lifetime.
    #[must_use]
    pub fn with_duration(mut self, duration: chrono::Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the not-before offset.
    #[must_use]
    pub fn with_not_before(mut self, offset: chrono::Duration) -> Self {
        self.not_before = Some(offset);
        self
    }

    /// Add a static claim.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Check the descriptor without touching any registry.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::InvalidDescriptor`] for an unsupported
    /// algorithm, an empty kid, a key strength the algorithm does not accept,
    /// a non-positive duration, or a duration or not-before offset longer
    /// than [`MAX_CLAIM_OFFSET_DAYS`].
    pub fn validate(&self) -> Result<SigningAlgorithm, IssuanceError> {
        let algorithm = SigningAlgorithm::from_name(&self.alg)?;

        if self.key.kid.is_empty() {
            return Err(IssuanceError::invalid_descriptor("kid must not be empty"));
        }
        algorithm.validate_bits(self.key.bits)?;

        let max_offset = chrono::Duration::days(MAX_CLAIM_OFFSET_DAYS);
        if let Some(duration) = self.duration {
            if duration <= chrono::Duration::zero() {
                return Err(IssuanceError::invalid_descriptor(format!(
                    "token duration must be positive, got {}s",
                    duration.num_seconds()
                )));
            }
            if duration > max_offset {
                return Err(IssuanceError::invalid_descriptor(format!(
                    "token duration must not exceed {MAX_CLAIM_OFFSET_DAYS} days, got {}s",
                    duration.num_seconds()
                )));
            }
        }
        if let Some(offset) = self.not_before {
            if offset.abs() > max_offset {
                return Err(IssuanceError::invalid_descriptor(format!(
                    "not-before offset must be within {MAX_CLAIM_OFFSET_DAYS} days, got {}s",
                    offset.num_seconds()
                )));
            }
        }

        Ok(algorithm)
    }
}

/// Issues signed tokens for one descriptor.
pub struct Factory {
    noncer: Arc<Noncer>,
    source: Arc<dyn RandomSource>,
    descriptor: Descriptor,
    key: Arc<SigningKey>,
    header: Header,
}

impl Factory {
    /// Validate `descriptor` and resolve its key.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::InvalidDescriptor`] on validation failure and
    /// propagates registry errors such as [`IssuanceError::KeyConflict`].
    pub fn new(
        noncer: Arc<Noncer>,
        registry: Arc<Registry>,
        descriptor: Descriptor,
    ) -> Result<Self, IssuanceError> {
        let algorithm = descriptor.validate().map_err(|e| {
            warn!(alg = %descriptor.alg, kid = %descriptor.key.kid, error = %e, "Rejected issuance descriptor");
            e
        })?;

        let key = registry.resolve(&descriptor.key, algorithm).map_err(|e| {
            warn!(alg = %algorithm, kid = %descriptor.key.kid, error = %e, "Failed to resolve signing key");
            e
        })?;

        info!(
            alg = %algorithm,
            kid = %key.kid(),
            nonce = descriptor.nonce,
            "Token factory ready"
        );

        Ok(Self {
            noncer,
            source: registry.random_source(),
            header: JwtSerializer::header_for(&key),
            descriptor,
            key,
        })
    }

    /// Issue a token carrying `request`'s claims.
    ///
    /// Claims are layered: descriptor static claims, then request claims,
    /// then the fields the descriptor mandates (`iss`, `iat`, `exp`, `nbf`,
    /// and `jti` when nonces are enabled), which always win.
    ///
    /// # Errors
    ///
    /// Nonce errors ([`IssuanceError::RandomnessUnavailable`],
    /// [`IssuanceError::NonceExhausted`], [`IssuanceError::NonceStoreUnavailable`])
    /// abort issuance before anything is signed. Signing errors are returned
    /// as [`IssuanceError::SigningFailed`]. No error affects later calls.
    pub fn new_token(&self, request: &Request) -> Result<String, IssuanceError> {
        let alg = self.key.algorithm().as_str();
        self.issue(request).map_err(|e| {
            metrics::record_token_issued(alg, e.code());
            warn!(alg, kid = %self.key.kid(), error = %e, "Token issuance failed");
            e
        })
    }

    fn issue(&self, request: &Request) -> Result<String, IssuanceError> {
        let claims = self.claims_for(request)?;
        let token = JwtSerializer::serialize(&self.header, &claims, &self.key, self.source.as_ref())?;

        metrics::record_token_issued(self.key.algorithm().as_str(), "success");
        debug!(
            alg = %self.key.algorithm(),
            kid = %self.key.kid(),
            claims = claims.len(),
            "Issued token"
        );

        Ok(token)
    }

    fn claims_for(&self, request: &Request) -> Result<Map<String, Value>, IssuanceError> {
        let mut claims = self.descriptor.claims.clone();
        claims.extend(request.claims().clone());

        if let Some(issuer) = &self.descriptor.issuer {
            claims.insert(claims::ISSUER.to_string(), Value::from(issuer.as_str()));
        }

        let now = chrono::Utc::now();
        if let Some(duration) = self.descriptor.duration {
            let expires_at = offset_timestamp(now, duration)?;
            claims.insert(claims::ISSUED_AT.to_string(), Value::from(now.timestamp()));
            claims.insert(claims::EXPIRES_AT.to_string(), Value::from(expires_at));
        }
        if let Some(offset) = self.descriptor.not_before {
            claims.insert(
                claims::NOT_BEFORE.to_string(),
                Value::from(offset_timestamp(now, offset)?),
            );
        }

        if self.descriptor.nonce {
            claims.insert(claims::TOKEN_ID.to_string(), Value::from(self.noncer.next()?));
        }

        Ok(claims)
    }

    /// Descriptor this factory was built from.
    #[must_use]
    pub const fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Id of the signing key.
    #[must_use]
    pub fn key_id(&self) -> &str {
        self.key.kid()
    }

    /// Signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.key.algorithm()
    }
}

fn offset_timestamp(
    now: chrono::DateTime<chrono::Utc>,
    offset: chrono::Duration,
) -> Result<i64, IssuanceError> {
    now.checked_add_signed(offset)
        .map(|at| at.timestamp())
        .ok_or_else(|| {
            IssuanceError::signing(format!(
                "timestamp offset of {}s is out of range",
                offset.num_seconds()
            ))
        })
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("descriptor", &self.descriptor)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
