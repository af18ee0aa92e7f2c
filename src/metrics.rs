//! Prometheus metrics for token issuance.

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec};

/// Tokens issued counter, labelled by outcome.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_issuer_tokens_issued_total",
        "Total number of token issuance attempts",
        &["algorithm", "status"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Signing keys generated counter.
pub static KEYS_GENERATED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_issuer_keys_generated_total",
        "Total number of signing keys generated",
        &["algorithm"]
    )
    .expect("Failed to register keys_generated metric")
});

/// Nonce draws counter.
pub static NONCE_DRAWS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_issuer_nonce_draws_total",
        "Total number of nonce requests",
        &["status"]
    )
    .expect("Failed to register nonce_draws metric")
});

/// Nonce collisions counter.
pub static NONCE_COLLISIONS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "token_issuer_nonce_collisions_total",
        "Total number of nonce draws rejected by the replay store"
    )
    .expect("Failed to register nonce_collisions metric")
});

/// Record a token issuance attempt.
pub fn record_token_issued(algorithm: &str, status: &str) {
    TOKENS_ISSUED
        .with_label_values(&[algorithm, status])
        .inc();
}

/// Record a key generation.
pub fn record_key_generated(algorithm: &str) {
    KEYS_GENERATED.with_label_values(&[algorithm]).inc();
}

/// Record a nonce request outcome.
pub fn record_nonce_draw(status: &str) {
    NONCE_DRAWS.with_label_values(&[status]).inc();
}

/// Record a nonce collision.
pub fn record_nonce_collision() {
    NONCE_COLLISIONS.inc();
}
