//! Supported signing algorithms.
//!
//! Each algorithm carries its key family, the key strengths it accepts and
//! the JOSE header tag it is published under. Key generation and signing
//! dispatch on [`KeyFamily`], so adding an algorithm means adding a variant
//! here plus, for a new family, one arm in `signing_key`.

use crate::error::IssuanceError;
use std::fmt;
use std::str::FromStr;

/// JWS signing algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512
    RS512,
    /// RSASSA-PSS with SHA-256
    PS256,
    /// RSASSA-PSS with SHA-384
    PS384,
    /// RSASSA-PSS with SHA-512
    PS512,
    /// ECDSA with P-256 and SHA-256
    ES256,
    /// ECDSA with P-384 and SHA-384
    ES384,
    /// Ed25519
    EdDSA,
    /// HMAC with SHA-256
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
}

/// Family of key material an algorithm signs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// RSA, PKCS#1 v1.5 padding
    Rsa,
    /// RSA, PSS padding
    RsaPss,
    /// NIST P-256
    EcP256,
    /// NIST P-384
    EcP384,
    /// Edwards curve 25519
    Ed25519,
    /// Shared secret
    Hmac,
}

/// Digest used by the RSA and HMAC families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSize {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

/// Key strengths an algorithm accepts, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrength {
    /// Any bit length in `min..=max`.
    Range {
        /// Smallest accepted length
        min: u32,
        /// Largest accepted length
        max: u32,
    },
    /// Curves have exactly one size.
    Exact(u32),
}

impl KeyStrength {
    /// Smallest accepted bit length.
    #[must_use]
    pub const fn min(&self) -> u32 {
        match self {
            Self::Range { min, .. } => *min,
            Self::Exact(bits) => *bits,
        }
    }

    /// Check if `bits` is accepted.
    #[must_use]
    pub const fn accepts(&self, bits: u32) -> bool {
        match self {
            Self::Range { min, max } => bits >= *min && bits <= *max,
            Self::Exact(exact) => bits == *exact,
        }
    }
}

const RSA_MAX_BITS: u32 = 4096;
const HMAC_MAX_BITS: u32 = 4096;

impl SigningAlgorithm {
    /// All supported algorithms.
    pub const ALL: [Self; 12] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
        Self::EdDSA,
        Self::HS256,
        Self::HS384,
        Self::HS512,
    ];

    /// Parse a JOSE algorithm name. Names are case-sensitive.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::InvalidDescriptor`] for unsupported names.
    pub fn from_name(name: &str) -> Result<Self, IssuanceError> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == name)
            .ok_or_else(|| {
                IssuanceError::invalid_descriptor(format!("unsupported algorithm: {name:?}"))
            })
    }

    /// Algorithm name for the JWT header.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::EdDSA => "EdDSA",
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }

    /// Key family this algorithm signs with.
    #[must_use]
    pub const fn family(&self) -> KeyFamily {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 => KeyFamily::Rsa,
            Self::PS256 | Self::PS384 | Self::PS512 => KeyFamily::RsaPss,
            Self::ES256 => KeyFamily::EcP256,
            Self::ES384 => KeyFamily::EcP384,
            Self::EdDSA => KeyFamily::Ed25519,
            Self::HS256 | Self::HS384 | Self::HS512 => KeyFamily::Hmac,
        }
    }

    /// Digest for the RSA and HMAC families; curves fix their own.
    #[must_use]
    pub const fn digest(&self) -> DigestSize {
        match self {
            Self::RS256 | Self::PS256 | Self::ES256 | Self::HS256 | Self::EdDSA => {
                DigestSize::Sha256
            }
            Self::RS384 | Self::PS384 | Self::ES384 | Self::HS384 => DigestSize::Sha384,
            Self::RS512 | Self::PS512 | Self::HS512 => DigestSize::Sha512,
        }
    }

    /// Accepted key strengths.
    ///
    /// RSA minimums are the smallest moduli that still fit the padded digest;
    /// HMAC secrets must be at least as long as the digest output.
    #[must_use]
    pub const fn strength(&self) -> KeyStrength {
        match self {
            Self::RS256 => KeyStrength::Range { min: 512, max: RSA_MAX_BITS },
            Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 => {
                KeyStrength::Range { min: 1024, max: RSA_MAX_BITS }
            }
            Self::PS512 => KeyStrength::Range { min: 2048, max: RSA_MAX_BITS },
            Self::ES256 | Self::EdDSA => KeyStrength::Exact(256),
            Self::ES384 => KeyStrength::Exact(384),
            Self::HS256 => KeyStrength::Range { min: 256, max: HMAC_MAX_BITS },
            Self::HS384 => KeyStrength::Range { min: 384, max: HMAC_MAX_BITS },
            Self::HS512 => KeyStrength::Range { min: 512, max: HMAC_MAX_BITS },
        }
    }

    /// Check a requested key strength before any key is generated.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::InvalidDescriptor`] if `bits` is outside the
    /// accepted strength, or is not byte aligned for an HMAC secret.
    pub fn validate_bits(&self, bits: u32) -> Result<(), IssuanceError> {
        let strength = self.strength();
        if !strength.accepts(bits) {
            return Err(IssuanceError::invalid_descriptor(match strength {
                KeyStrength::Range { min, max } => format!(
                    "{} requires a key of {min} to {max} bits, got {bits}",
                    self.as_str()
                ),
                KeyStrength::Exact(exact) => {
                    format!("{} requires a {exact}-bit key, got {bits}", self.as_str())
                }
            }));
        }

        if self.family() == KeyFamily::Hmac && bits % 8 != 0 {
            return Err(IssuanceError::invalid_descriptor(format!(
                "{} secret length must be a multiple of 8 bits, got {bits}",
                self.as_str()
            )));
        }

        Ok(())
    }

    /// Header tag used by `jsonwebtoken`.
    #[must_use]
    pub const fn header_algorithm(&self) -> jsonwebtoken::Algorithm {
        use jsonwebtoken::Algorithm;
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::RS512 => Algorithm::RS512,
            Self::PS256 => Algorithm::PS256,
            Self::PS384 => Algorithm::PS384,
            Self::PS512 => Algorithm::PS512,
            Self::ES256 => Algorithm::ES256,
            Self::ES384 => Algorithm::ES384,
            Self::EdDSA => Algorithm::EdDSA,
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
        }
    }

    /// Check if the algorithm signs with a shared secret.
    #[must_use]
    pub const fn is_symmetric(&self) -> bool {
        matches!(self.family(), KeyFamily::Hmac)
    }
}

impl FromStr for SigningAlgorithm {
    type Err = IssuanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
