//! Issuer configuration.
//!
//! All configuration is loaded from environment variables (and a `.env`
//! file when present) and validated at startup.

use crate::error::IssuanceError;
use crate::factory::Descriptor;
use crate::key::{KeyDescriptor, SigningAlgorithm};
use crate::observability::TracingConfig;
use std::env;
use std::time::Duration;

/// Token issuer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Signing
    /// Signing algorithm
    pub algorithm: SigningAlgorithm,
    /// Signing key id
    pub key_id: String,
    /// Signing key strength in bits
    pub key_bits: u32,

    // Nonce settings
    /// Embed a nonce in every token
    pub nonce_enabled: bool,
    /// Random bytes per nonce
    pub nonce_bytes: usize,
    /// Draws per nonce before giving up on store collisions
    pub nonce_max_attempts: u32,
    /// Replay window; `None` disables the replay store
    pub nonce_replay_ttl: Option<Duration>,

    // Claims
    /// `iss` claim
    pub issuer: Option<String>,
    /// Token lifetime
    pub token_ttl: Option<Duration>,
    /// `nbf` offset from issue time, in seconds
    pub not_before_offset: Option<i64>,

    /// Logging
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::Config`] if a variable is present but cannot
    /// be parsed, and [`IssuanceError::InvalidDescriptor`] for an unsupported
    /// algorithm name.
    pub fn from_env() -> Result<Self, IssuanceError> {
        dotenvy::dotenv().ok();

        let algorithm = SigningAlgorithm::from_name(
            &env::var("ISSUER_ALG").unwrap_or_else(|_| "RS256".to_string()),
        )?;
        let key_id = env::var("ISSUER_KEY_ID").unwrap_or_else(|_| "default-key".to_string());
        let key_bits = parse_env("ISSUER_KEY_BITS", default_bits(algorithm))?;

        let nonce_enabled = parse_env("ISSUER_NONCE", true)?;
        let nonce_bytes = parse_env("NONCE_BYTES", 128)?;
        let nonce_max_attempts = parse_env("NONCE_MAX_ATTEMPTS", crate::nonce::DEFAULT_MAX_ATTEMPTS)?;
        let nonce_replay_ttl = match parse_env("NONCE_REPLAY_TTL", 0u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let issuer = env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty());
        let token_ttl = match parse_env("TOKEN_TTL", 900u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let not_before_offset = match parse_env("TOKEN_NOT_BEFORE", 0i64)? {
            0 => None,
            secs => Some(secs),
        };

        let tracing = TracingConfig::default()
            .with_log_level(env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
            .with_json_output(parse_env("LOG_JSON", false)?);

        Ok(Self {
            algorithm,
            key_id,
            key_bits,
            nonce_enabled,
            nonce_bytes,
            nonce_max_attempts,
            nonce_replay_ttl,
            issuer,
            token_ttl,
            not_before_offset,
            tracing,
        })
    }

    /// Issuance descriptor for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::Config`] if the token lifetime or not-before
    /// offset does not fit a signed timestamp.
    pub fn descriptor(&self) -> Result<Descriptor, IssuanceError> {
        let mut descriptor = Descriptor::new(
            self.algorithm.as_str(),
            KeyDescriptor::new(self.key_id.clone(), self.key_bits),
            self.nonce_enabled,
        );

        if let Some(issuer) = &self.issuer {
            descriptor = descriptor.with_issuer(issuer.clone());
        }
        if let Some(ttl) = self.token_ttl {
            let ttl = chrono::Duration::from_std(ttl)
                .map_err(|e| IssuanceError::config(format!("Invalid TOKEN_TTL: {}", e)))?;
            descriptor = descriptor.with_duration(ttl);
        }
        if let Some(offset) = self.not_before_offset {
            let offset = chrono::Duration::try_seconds(offset).ok_or_else(|| {
                IssuanceError::config(format!("Invalid TOKEN_NOT_BEFORE: {offset}s is out of range"))
            })?;
            descriptor = descriptor.with_not_before(offset);
        }

        Ok(descriptor)
    }
}

/// Strength used when `ISSUER_KEY_BITS` is unset.
fn default_bits(algorithm: SigningAlgorithm) -> u32 {
    match algorithm.family() {
        crate::key::KeyFamily::Rsa | crate::key::KeyFamily::RsaPss => 2048,
        _ => algorithm.strength().min(),
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, IssuanceError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| IssuanceError::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
