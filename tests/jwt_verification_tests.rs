//! Issued tokens verify against the published key set with an independent
//! JWT implementation.

mod common;

use common::{system_noncer, system_registry};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use std::sync::Arc;
use token_issuer::{Descriptor, Factory, KeyDescriptor, Registry, Request};

fn issue(registry: &Arc<Registry>, alg: &str, kid: &str, bits: u32) -> String {
    let descriptor = Descriptor::new(alg, KeyDescriptor::new(kid, bits), true)
        .with_issuer("token-issuer-tests")
        .with_duration(chrono::Duration::minutes(5));
    let factory = Factory::new(system_noncer(32), Arc::clone(registry), descriptor).unwrap();

    factory
        .new_token(&Request::new().subject("user-1").audience(["api"]))
        .unwrap()
}

fn decoding_key(registry: &Registry, kid: &str) -> DecodingKey {
    let jwks = registry.jwks();
    let jwk = jwks.find(kid).unwrap();

    match jwk.kty.as_str() {
        "RSA" => DecodingKey::from_rsa_components(
            jwk.n.as_deref().unwrap(),
            jwk.e.as_deref().unwrap(),
        )
        .unwrap(),
        "EC" => DecodingKey::from_ec_components(
            jwk.x.as_deref().unwrap(),
            jwk.y.as_deref().unwrap(),
        )
        .unwrap(),
        "OKP" => DecodingKey::from_ed_components(jwk.x.as_deref().unwrap()).unwrap(),
        other => panic!("unexpected key type {other}"),
    }
}

fn verify(registry: &Registry, token: &str, algorithm: Algorithm) -> Value {
    let header = decode_header(token).unwrap();
    assert_eq!(header.alg, algorithm);
    assert_eq!(header.typ.as_deref(), Some("JWT"));

    let kid = header.kid.unwrap();
    let mut validation = Validation::new(algorithm);
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);
    validation.set_issuer(&["token-issuer-tests"]);

    decode::<Value>(token, &decoding_key(registry, &kid), &validation)
        .unwrap()
        .claims
}

#[test]
fn test_rs256_verifies() {
    let registry = system_registry();
    let token = issue(&registry, "RS256", "rsa", 2048);

    let claims = verify(&registry, &token, Algorithm::RS256);
    assert_eq!(claims["sub"], "user-1");
    assert_eq!(claims["aud"], "api");
    assert!(claims["jti"].is_string());
}

#[test]
fn test_ps256_verifies() {
    let registry = system_registry();
    let token = issue(&registry, "PS256", "pss", 2048);

    let claims = verify(&registry, &token, Algorithm::PS256);
    assert_eq!(claims["iss"], "token-issuer-tests");
}

#[test]
fn test_es256_verifies() {
    let registry = system_registry();
    let token = issue(&registry, "ES256", "p256", 256);

    verify(&registry, &token, Algorithm::ES256);
}

#[test]
fn test_es384_verifies() {
    let registry = system_registry();
    let token = issue(&registry, "ES384", "p384", 384);

    verify(&registry, &token, Algorithm::ES384);
}

#[test]
fn test_eddsa_verifies() {
    let registry = system_registry();
    let token = issue(&registry, "EdDSA", "ed", 256);

    let claims = verify(&registry, &token, Algorithm::EdDSA);
    let lifetime = claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap();
    assert_eq!(lifetime, 300);
}

#[test]
fn test_tampered_token_rejected() {
    let registry = system_registry();
    let token = issue(&registry, "ES256", "p256", 256);

    let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
    let forged = Request::new().subject("admin");
    segments[1] = base64::Engine::encode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        serde_json::to_vec(&forged).unwrap(),
    );
    let forged = segments.join(".");

    let mut validation = Validation::new(Algorithm::ES256);
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation.validate_exp = false;

    let result = decode::<Value>(&forged, &decoding_key(&registry, "p256"), &validation);
    assert!(result.is_err());
}

#[test]
fn test_jwks_lists_every_asymmetric_key() {
    let registry = system_registry();
    issue(&registry, "ES256", "a", 256);
    issue(&registry, "EdDSA", "b", 256);
    issue(&registry, "HS256", "c", 256);

    let jwks = registry.jwks();
    let kids: Vec<&str> = jwks.keys.iter().map(|k| k.kid.as_str()).collect();
    assert_eq!(kids, vec!["a", "b"]);

    let json: Value = serde_json::from_str(&jwks.to_json().unwrap()).unwrap();
    assert_eq!(json["keys"][0]["use"], "sig");
    assert_eq!(json["keys"][1]["crv"], "Ed25519");
}
