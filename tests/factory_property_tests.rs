//! Property-based tests for the token factory.
//!
//! Property 1: Valid descriptors issue non-empty tokens
//! Property 2: Key conflicts fail construction
//! Property 3: Nonce uniqueness under a replay store
//! Property 4: Insufficient key strength fails before key generation
//! Property 5: Randomness failure aborts issuance without signing

mod common;

use common::{
    decode_token, system_noncer, system_registry, CountingSource, ExhaustibleSource,
    FailingSource, StuckSource, ToggleSource,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use token_issuer::{
    Descriptor, Factory, IssuanceError, KeyDescriptor, MemoryNonceStore, Noncer, Registry,
    Request, SystemRandom,
};

/// Fast-to-generate algorithm and strength pairs.
fn arb_cheap_algorithm() -> impl Strategy<Value = (&'static str, u32)> {
    prop_oneof![
        Just(("ES256", 256)),
        Just(("ES384", 384)),
        Just(("EdDSA", 256)),
        Just(("HS256", 256)),
        Just(("HS384", 512)),
        Just(("HS512", 1024)),
    ]
}

fn arb_kid() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,31}"
}

fn arb_claims() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("x-[a-z]{1,12}", "[a-zA-Z0-9 ]{0,32}"), 0..8)
}

#[test]
fn test_reference_descriptor_scenario() {
    let factory = Factory::new(
        system_noncer(128),
        system_registry(),
        Descriptor::new("RS256", KeyDescriptor::new("test", 512), true),
    )
    .unwrap();

    let token = factory.new_token(&Request::new()).unwrap();
    let (header, claims, signature) = decode_token(&token);

    assert_eq!(header["alg"], "RS256");
    assert_eq!(header["kid"], "test");
    assert!(!claims["jti"].as_str().unwrap().is_empty());
    assert_eq!(signature.len(), 64);
}

#[test]
fn test_every_algorithm_issues() {
    let registry = system_registry();
    let cases = [
        ("RS256", 512),
        ("RS384", 1024),
        ("RS512", 1024),
        ("PS256", 1024),
        ("PS384", 1024),
        ("ES256", 256),
        ("ES384", 384),
        ("EdDSA", 256),
        ("HS256", 256),
        ("HS384", 384),
        ("HS512", 512),
    ];

    for (alg, bits) in cases {
        let factory = Factory::new(
            system_noncer(16),
            Arc::clone(&registry),
            Descriptor::new(alg, KeyDescriptor::new(format!("key-{alg}"), bits), false),
        )
        .unwrap();

        let token = factory.new_token(&Request::new()).unwrap();
        let (header, _, _) = decode_token(&token);
        assert_eq!(header["alg"], alg);
    }

    assert_eq!(registry.len(), cases.len());
}

#[test]
fn test_factories_share_keys() {
    let registry = system_registry();
    let descriptor = Descriptor::new("ES256", KeyDescriptor::new("shared", 256), false);

    let first = Factory::new(system_noncer(16), Arc::clone(&registry), descriptor.clone()).unwrap();
    let second = Factory::new(system_noncer(16), Arc::clone(&registry), descriptor).unwrap();

    assert_eq!(first.key_id(), second.key_id());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_key_conflict_on_different_bits() {
    let registry = system_registry();
    Factory::new(
        system_noncer(16),
        Arc::clone(&registry),
        Descriptor::new("RS256", KeyDescriptor::new("test", 512), false),
    )
    .unwrap();

    let result = Factory::new(
        system_noncer(16),
        Arc::clone(&registry),
        Descriptor::new("RS256", KeyDescriptor::new("test", 1024), false),
    );
    assert!(matches!(result, Err(IssuanceError::KeyConflict { .. })));
}

#[test]
fn test_key_conflict_on_different_algorithm() {
    let registry = system_registry();
    Factory::new(
        system_noncer(16),
        Arc::clone(&registry),
        Descriptor::new("RS256", KeyDescriptor::new("test", 1024), false),
    )
    .unwrap();

    let result = Factory::new(
        system_noncer(16),
        Arc::clone(&registry),
        Descriptor::new("PS256", KeyDescriptor::new("test", 1024), false),
    );
    match result {
        Err(IssuanceError::KeyConflict { kid, existing, requested }) => {
            assert_eq!(kid, "test");
            assert_eq!(existing, "RS256/1024");
            assert_eq!(requested, "PS256/1024");
        }
        other => panic!("expected KeyConflict, got {other:?}"),
    }
}

#[test]
fn test_nonce_randomness_failure_aborts_before_signing() {
    let registry_source = Arc::new(CountingSource::default());
    let registry = Arc::new(Registry::new(registry_source.clone()).unwrap());
    let noncer = Arc::new(Noncer::new(Arc::new(FailingSource), 32).unwrap());

    // PSS draws its salt from the registry source, so any signing shows up as a fill.
    let factory = Factory::new(
        noncer,
        registry,
        Descriptor::new("PS256", KeyDescriptor::new("pss", 1024), true),
    )
    .unwrap();
    let fills_before = registry_source.fills();

    let result = factory.new_token(&Request::new().subject("user-1"));
    assert!(matches!(result, Err(IssuanceError::RandomnessUnavailable(_))));
    assert_eq!(registry_source.fills(), fills_before);
}

#[test]
fn test_nonce_store_exhaustion_aborts_issuance() {
    let noncer = Noncer::new(Arc::new(StuckSource(7)), 16)
        .unwrap()
        .with_store(Arc::new(MemoryNonceStore::new()))
        .with_max_attempts(4);
    let factory = Factory::new(
        Arc::new(noncer),
        system_registry(),
        Descriptor::new("HS256", KeyDescriptor::new("mac", 256), true),
    )
    .unwrap();

    assert!(factory.new_token(&Request::new()).is_ok());
    let result = factory.new_token(&Request::new());
    assert!(matches!(result, Err(IssuanceError::NonceExhausted { attempts: 4 })));
}

#[test]
fn test_transient_failure_does_not_poison_factory() {
    let nonce_source = Arc::new(ToggleSource::default());
    let noncer = Arc::new(Noncer::new(nonce_source.clone(), 16).unwrap());
    let factory = Factory::new(
        noncer,
        system_registry(),
        Descriptor::new("EdDSA", KeyDescriptor::new("ed", 256), true),
    )
    .unwrap();

    assert!(factory.new_token(&Request::new()).is_ok());

    nonce_source.set_down(true);
    let err = factory.new_token(&Request::new()).unwrap_err();
    assert!(matches!(err, IssuanceError::RandomnessUnavailable(_)));
    assert!(err.is_retryable());

    nonce_source.set_down(false);
    let (header, claims, _) = decode_token(&factory.new_token(&Request::new()).unwrap());
    assert_eq!(header["kid"], "ed");
    assert!(claims["jti"].is_string());
}

#[test]
fn test_failing_registry_source_fails_construction() {
    let result = Registry::new(Arc::new(FailingSource));
    assert!(matches!(result, Err(IssuanceError::RandomnessUnavailable(_))));

    // Probe succeeds, key seed draw fails.
    let registry = Arc::new(Registry::new(Arc::new(ExhaustibleSource::new(1))).unwrap());
    let result = Factory::new(
        system_noncer(16),
        Arc::clone(&registry),
        Descriptor::new("ES256", KeyDescriptor::new("late", 256), false),
    );
    assert!(matches!(result, Err(IssuanceError::RandomnessUnavailable(_))));
    assert!(registry.get("late").is_none());
}

#[test]
fn test_pkcs1_tokens_are_deterministic_without_nonce() {
    let factory = Factory::new(
        system_noncer(16),
        system_registry(),
        Descriptor::new("RS256", KeyDescriptor::new("det", 512), false),
    )
    .unwrap();

    let request = Request::new().subject("user-1").audience(["api"]);
    assert_eq!(
        factory.new_token(&request).unwrap(),
        factory.new_token(&request).unwrap()
    );
}

#[test]
fn test_concurrent_issuance_with_store_yields_unique_nonces() {
    let noncer = Noncer::new(Arc::new(SystemRandom), 8)
        .unwrap()
        .with_store(Arc::new(MemoryNonceStore::new()));
    let factory = Arc::new(
        Factory::new(
            Arc::new(noncer),
            system_registry(),
            Descriptor::new("HS256", KeyDescriptor::new("mac", 256), true),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let factory = Arc::clone(&factory);
            std::thread::spawn(move || {
                (0..25)
                    .map(|_| {
                        let token = factory.new_token(&Request::new()).unwrap();
                        let (_, claims, _) = decode_token(&token);
                        claims["jti"].as_str().unwrap().to_string()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut nonces = HashSet::new();
    for handle in handles {
        for nonce in handle.join().unwrap() {
            assert!(nonces.insert(nonce), "nonce issued twice");
        }
    }
    assert_eq!(nonces.len(), 200);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property 1: Valid descriptors issue non-empty tokens
    #[test]
    fn prop_valid_descriptor_issues_token(
        (alg, bits) in arb_cheap_algorithm(),
        kid in arb_kid(),
        nonce in any::<bool>(),
    ) {
        let factory = Factory::new(
            system_noncer(32),
            system_registry(),
            Descriptor::new(alg, KeyDescriptor::new(kid.clone(), bits), nonce),
        ).unwrap();

        let token = factory.new_token(&Request::new()).unwrap();
        prop_assert!(!token.is_empty());

        let (header, claims, _) = decode_token(&token);
        prop_assert_eq!(&header["alg"], alg);
        prop_assert_eq!(&header["kid"], kid.as_str());
        prop_assert_eq!(claims.get("jti").is_some(), nonce);
    }

    /// Property 3: Nonce uniqueness under a replay store
    #[test]
    fn prop_nonces_unique_with_store(byte_length in 1usize..4, tokens in 2usize..20) {
        let noncer = Noncer::new(Arc::new(SystemRandom), byte_length)
            .unwrap()
            .with_store(Arc::new(MemoryNonceStore::new()))
            .with_max_attempts(10_000);
        let factory = Factory::new(
            Arc::new(noncer),
            system_registry(),
            Descriptor::new("HS256", KeyDescriptor::new("mac", 256), true),
        ).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..tokens {
            let (_, claims, _) = decode_token(&factory.new_token(&Request::new()).unwrap());
            let jti = claims["jti"].as_str().unwrap().to_string();
            prop_assert!(seen.insert(jti), "nonce repeated");
        }
    }

    /// Property 4: Insufficient key strength fails before key generation
    #[test]
    fn prop_weak_rsa_rejected(bits in 0u32..512) {
        let registry = system_registry();
        let result = Factory::new(
            system_noncer(16),
            Arc::clone(&registry),
            Descriptor::new("RS256", KeyDescriptor::new("weak", bits), true),
        );
        prop_assert!(matches!(result, Err(IssuanceError::InvalidDescriptor(_))));
        prop_assert!(registry.is_empty());
    }

    /// Request claims reach the token unchanged.
    #[test]
    fn prop_request_claims_embedded(claims in arb_claims(), subject in "[a-z0-9-]{1,32}") {
        let factory = Factory::new(
            system_noncer(16),
            system_registry(),
            Descriptor::new("ES256", KeyDescriptor::new("ec", 256), false),
        ).unwrap();

        let mut request = Request::new().subject(subject.clone());
        for (name, value) in &claims {
            request = request.claim(name.clone(), value.clone());
        }

        let (_, embedded, _) = decode_token(&factory.new_token(&request).unwrap());
        prop_assert_eq!(&embedded["sub"], subject.as_str());
        for (name, value) in request.claims() {
            prop_assert_eq!(&embedded[name.as_str()], value);
        }
    }
}
