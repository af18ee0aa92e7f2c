//! Issues a single token from environment configuration and prints it.
//!
//! Usage: `token-issuer [CLAIMS_JSON]`

use anyhow::Context;
use std::sync::Arc;
use token_issuer::observability::init_tracing;
use token_issuer::{Config, Factory, MemoryNonceStore, Noncer, RandomSource, Registry, Request, SystemRandom};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.tracing);

    info!(alg = %config.algorithm, kid = %config.key_id, "Starting token issuer");

    let request = match std::env::args().nth(1) {
        Some(raw) => serde_json::from_str::<Request>(&raw).context("claims must be a JSON object")?,
        None => Request::new(),
    };

    let source: Arc<dyn RandomSource> = Arc::new(SystemRandom);
    let registry = Arc::new(Registry::new(Arc::clone(&source))?);

    let mut noncer = Noncer::new(source, config.nonce_bytes)?.with_max_attempts(config.nonce_max_attempts);
    if let Some(ttl) = config.nonce_replay_ttl {
        noncer = noncer.with_store(Arc::new(MemoryNonceStore::new().with_ttl(ttl)));
    }

    let factory = Factory::new(Arc::new(noncer), registry, config.descriptor()?)?;
    let token = factory.new_token(&request)?;

    println!("{token}");
    Ok(())
}
