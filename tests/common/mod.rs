//! Shared fixtures for integration tests.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use token_issuer::{Noncer, RandomSource, Registry, SystemRandom};

/// Source whose entropy pool is permanently unavailable.
pub struct FailingSource;

impl RandomSource for FailingSource {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new("entropy pool unavailable"))
    }
}

/// Source that yields the same byte forever.
pub struct StuckSource(pub u8);

impl RandomSource for StuckSource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        dest.fill(self.0);
        Ok(())
    }
}

/// System randomness that counts how often it is drawn from.
#[derive(Default)]
pub struct CountingSource {
    fills: AtomicUsize,
}

impl CountingSource {
    pub fn fills(&self) -> usize {
        self.fills.load(Ordering::SeqCst)
    }
}

impl RandomSource for CountingSource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fills.fetch_add(1, Ordering::SeqCst);
        SystemRandom.fill(dest)
    }
}

/// System randomness that fails once `budget` fills have been served.
pub struct ExhaustibleSource {
    remaining: AtomicUsize,
}

impl ExhaustibleSource {
    pub fn new(budget: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(budget),
        }
    }
}

impl RandomSource for ExhaustibleSource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        let available = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !available {
            return Err(rand::Error::new("entropy budget exhausted"));
        }
        SystemRandom.fill(dest)
    }
}

/// System randomness that can be switched off and back on.
#[derive(Default)]
pub struct ToggleSource {
    down: AtomicBool,
}

impl ToggleSource {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

impl RandomSource for ToggleSource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        if self.down.load(Ordering::SeqCst) {
            return Err(rand::Error::new("entropy pool temporarily unavailable"));
        }
        SystemRandom.fill(dest)
    }
}

pub fn system_registry() -> Arc<Registry> {
    Arc::new(Registry::new(Arc::new(SystemRandom)).unwrap())
}

pub fn system_noncer(byte_length: usize) -> Arc<Noncer> {
    Arc::new(Noncer::new(Arc::new(SystemRandom), byte_length).unwrap())
}

/// Split a compact token and decode its header and claims.
pub fn decode_token(token: &str) -> (serde_json::Value, serde_json::Value, Vec<u8>) {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "token must have three segments");

    let header = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
    let claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    let signature = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
    (header, claims, signature)
}
