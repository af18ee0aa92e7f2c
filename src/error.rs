//! Error taxonomy for token issuance.
//!
//! Construction-time errors (`InvalidDescriptor`, `KeyConflict`,
//! `KeyGenerationFailed`) describe static misconfiguration and should fail
//! service startup. Per-request errors are local to one `new_token` call and
//! never poison the factory.

use thiserror::Error;

/// Errors returned by the registry, noncer and token factory.
#[derive(Error, Debug)]
pub enum IssuanceError {
    /// Descriptor failed validation
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Kid already bound to a key with other parameters
    #[error("Key conflict for kid {kid}: registered as {existing}, requested {requested}")]
    KeyConflict {
        /// Key id requested twice
        kid: String,
        /// Parameters of the key already bound to `kid`
        existing: String,
        /// Parameters of the rejected request
        requested: String,
    },

    /// Key material could not be generated
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Random source failed
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// Every nonce draw collided with a recorded value
    #[error("Nonce exhausted after {attempts} attempts")]
    NonceExhausted {
        /// Number of draws that collided with recorded nonces
        attempts: u32,
    },

    /// Replay store failed
    #[error("Nonce store unavailable: {0}")]
    NonceStoreUnavailable(String),

    /// Claims could not be serialized or signed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Environment configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IssuanceError {
    /// Create an invalid descriptor error.
    #[must_use]
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }

    /// Create a key generation error.
    #[must_use]
    pub fn key_generation(msg: impl Into<String>) -> Self {
        Self::KeyGenerationFailed(msg.into())
    }

    /// Create a randomness error.
    #[must_use]
    pub fn randomness(msg: impl Into<String>) -> Self {
        Self::RandomnessUnavailable(msg.into())
    }

    /// Create a nonce store error.
    #[must_use]
    pub fn nonce_store(msg: impl Into<String>) -> Self {
        Self::NonceStoreUnavailable(msg.into())
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(msg: impl Into<String>) -> Self {
        Self::SigningFailed(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if a later call may succeed once a transient condition clears.
    ///
    /// Static misconfiguration is never retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RandomnessUnavailable(_)
                | Self::NonceExhausted { .. }
                | Self::NonceStoreUnavailable(_)
        )
    }

    /// Stable error code for callers that map errors onto a transport.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDescriptor(_) => ISSUER_INVALID_DESCRIPTOR,
            Self::KeyConflict { .. } => ISSUER_KEY_CONFLICT,
            Self::KeyGenerationFailed(_) => ISSUER_KEY_GENERATION_FAILED,
            Self::RandomnessUnavailable(_) => ISSUER_RANDOMNESS_UNAVAILABLE,
            Self::NonceExhausted { .. } => ISSUER_NONCE_EXHAUSTED,
            Self::NonceStoreUnavailable(_) => ISSUER_NONCE_STORE_UNAVAILABLE,
            Self::SigningFailed(_) => ISSUER_SIGNING_FAILED,
            Self::Config(_) => ISSUER_CONFIG,
        }
    }
}

impl From<serde_json::Error> for IssuanceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SigningFailed(format!("claim serialization: {err}"))
    }
}

/// Code for [`IssuanceError::InvalidDescriptor`]
pub const ISSUER_INVALID_DESCRIPTOR: &str = "ISSUER_INVALID_DESCRIPTOR";
/// Code for [`IssuanceError::KeyConflict`]
pub const ISSUER_KEY_CONFLICT: &str = "ISSUER_KEY_CONFLICT";
/// Code for [`IssuanceError::KeyGenerationFailed`]
pub const ISSUER_KEY_GENERATION_FAILED: &str = "ISSUER_KEY_GENERATION_FAILED";
/// Code for [`IssuanceError::RandomnessUnavailable`]
pub const ISSUER_RANDOMNESS_UNAVAILABLE: &str = "ISSUER_RANDOMNESS_UNAVAILABLE";
/// Code for [`IssuanceError::NonceExhausted`]
pub const ISSUER_NONCE_EXHAUSTED: &str = "ISSUER_NONCE_EXHAUSTED";
/// Code for [`IssuanceError::NonceStoreUnavailable`]
pub const ISSUER_NONCE_STORE_UNAVAILABLE: &str = "ISSUER_NONCE_STORE_UNAVAILABLE";
/// Code for [`IssuanceError::SigningFailed`]
pub const ISSUER_SIGNING_FAILED: &str = "ISSUER_SIGNING_FAILED";
/// Code for [`IssuanceError::Config`]
pub const ISSUER_CONFIG: &str = "ISSUER_CONFIG";
