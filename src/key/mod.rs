//! Key registry and signing key material.

pub mod algorithm;
pub mod registry;
pub mod signing_key;

pub use algorithm::{KeyFamily, KeyStrength, SigningAlgorithm};
pub use registry::Registry;
pub use signing_key::SigningKey;

use serde::{Deserialize, Serialize};

/// Identifies a key to generate or locate.
///
/// The algorithm family comes from the enclosing issuance descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyDescriptor {
    /// Key id, unique within a registry
    pub kid: String,
    /// Key strength in bits
    pub bits: u32,
}

impl KeyDescriptor {
    /// Create a new key descriptor.
    #[must_use]
    pub fn new(kid: impl Into<String>, bits: u32) -> Self {
        Self {
            kid: kid.into(),
            bits,
        }
    }
}
