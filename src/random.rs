//! Injected randomness.
//!
//! Every component that needs entropy receives an explicit
//! [`RandomSource`]; nothing in this crate reaches for a process-wide
//! default generator. That keeps the entropy dependency visible at every
//! construction site and lets tests substitute a failing or seeded source.

use crate::error::IssuanceError;
use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, RngCore, SeedableRng};
use std::sync::Mutex;
use zeroize::Zeroize;

/// A cryptographically secure source of random bytes.
///
/// Failure is a first-class outcome: implementations must return an error
/// rather than fall back to weaker entropy.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error>;
}

/// Operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

/// Any seeded CSPRNG can serve as a source once it is guarded for sharing.
impl<R> RandomSource for Mutex<R>
where
    R: RngCore + CryptoRng + Send,
{
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        let mut rng = self
            .lock()
            .map_err(|_| rand::Error::new("random source mutex poisoned"))?;
        rng.try_fill_bytes(dest)
    }
}

/// Fill a buffer, mapping source failure to [`IssuanceError::RandomnessUnavailable`].
pub(crate) fn fill(source: &dyn RandomSource, dest: &mut [u8]) -> Result<(), IssuanceError> {
    source
        .fill(dest)
        .map_err(|e| IssuanceError::randomness(e.to_string()))
}

/// Seed a CSPRNG from `source` for algorithms that consume an `RngCore`.
///
/// The seed is the only entropy the returned generator ever sees.
pub(crate) fn derive_rng(source: &dyn RandomSource) -> Result<StdRng, IssuanceError> {
    let mut seed = <StdRng as SeedableRng>::Seed::default();
    fill(source, &mut seed)?;
    let rng = StdRng::from_seed(seed);
    seed.zeroize();
    Ok(rng)
}
