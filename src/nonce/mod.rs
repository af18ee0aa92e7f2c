//! Replay-resistant nonces.

pub mod noncer;
pub mod store;

pub use noncer::{Noncer, DEFAULT_MAX_ATTEMPTS};
pub use store::{MemoryNonceStore, NonceStore, NoopNonceStore};
