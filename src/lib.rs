//! Token issuer library.
//!
//! Issues signed JWTs from a declarative [`Descriptor`]: a [`Registry`]
//! owns signing keys by `kid`, a [`Noncer`] draws replay-resistant nonces,
//! and a [`Factory`] assembles, signs and serializes tokens. All entropy
//! comes from an explicitly injected [`RandomSource`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod factory;
pub mod jwks;
pub mod jwt;
pub mod key;
pub mod metrics;
pub mod nonce;
pub mod observability;
pub mod random;

// Re-exports for convenience
pub use config::Config;
pub use error::IssuanceError;
pub use factory::{Descriptor, Factory};
pub use jwt::Request;
pub use key::{KeyDescriptor, Registry, SigningAlgorithm};
pub use nonce::{MemoryNonceStore, NonceStore, Noncer};
pub use random::{RandomSource, SystemRandom};
