//! Signing key material.

use super::algorithm::{DigestSize, KeyFamily, SigningAlgorithm};
use crate::error::IssuanceError;
use crate::jwks::Jwk;
use crate::random::{self, RandomSource};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::StdRng;
use rand::RngCore;
use rsa::RsaPrivateKey;
use std::fmt;
use zeroize::Zeroizing;

enum KeyMaterial {
    Rsa(RsaPrivateKey),
    EcP256(p256::ecdsa::SigningKey),
    EcP384(p384::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
    Hmac(Zeroizing<Vec<u8>>),
}

/// A private key bound to a key id and algorithm.
///
/// Keys are created by the [`Registry`](super::Registry) and handed out as
/// shared handles; the material itself never leaves this type.
pub struct SigningKey {
    kid: String,
    algorithm: SigningAlgorithm,
    bits: u32,
    material: KeyMaterial,
}

impl SigningKey {
    /// Generate fresh material. `bits` must already be validated for `algorithm`.
    pub(crate) fn generate(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        bits: u32,
        source: &dyn RandomSource,
    ) -> Result<Self, IssuanceError> {
        let mut rng = random::derive_rng(source)?;

        let material = match algorithm.family() {
            KeyFamily::Rsa | KeyFamily::RsaPss => {
                let size = usize::try_from(bits)
                    .map_err(|e| IssuanceError::key_generation(e.to_string()))?;
                let key = RsaPrivateKey::new(&mut rng, size)
                    .map_err(|e| IssuanceError::key_generation(e.to_string()))?;
                KeyMaterial::Rsa(key)
            }
            KeyFamily::EcP256 => KeyMaterial::EcP256(p256::ecdsa::SigningKey::random(&mut rng)),
            KeyFamily::EcP384 => KeyMaterial::EcP384(p384::ecdsa::SigningKey::random(&mut rng)),
            KeyFamily::Ed25519 => {
                KeyMaterial::Ed25519(ed25519_dalek::SigningKey::generate(&mut rng))
            }
            KeyFamily::Hmac => {
                let mut secret = Zeroizing::new(vec![0u8; (bits / 8) as usize]);
                rng.try_fill_bytes(&mut secret)
                    .map_err(|e| IssuanceError::key_generation(e.to_string()))?;
                KeyMaterial::Hmac(secret)
            }
        };

        Ok(Self {
            kid: kid.into(),
            algorithm,
            bits,
            material,
        })
    }

    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm this key signs with.
    #[must_use]
    pub const fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Key strength in bits.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Check if this key was created for the given parameters.
    #[must_use]
    pub fn matches(&self, algorithm: SigningAlgorithm, bits: u32) -> bool {
        self.algorithm == algorithm && self.bits == bits
    }

    /// Sign `message` with this key's algorithm.
    ///
    /// Randomized schemes (RSA-PSS) draw their salt from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::SigningFailed`] on an algorithm-level failure
    /// and [`IssuanceError::RandomnessUnavailable`] if `source` fails.
    pub fn sign(&self, message: &[u8], source: &dyn RandomSource) -> Result<Vec<u8>, IssuanceError> {
        let digest = self.algorithm.digest();
        match (&self.material, self.algorithm.family()) {
            (KeyMaterial::Rsa(key), KeyFamily::Rsa) => sign_pkcs1v15(key, digest, message),
            (KeyMaterial::Rsa(key), KeyFamily::RsaPss) => {
                let mut rng = random::derive_rng(source)?;
                sign_pss(key, digest, message, &mut rng)
            }
            (KeyMaterial::EcP256(key), _) => sign_p256(key, message),
            (KeyMaterial::EcP384(key), _) => sign_p384(key, message),
            (KeyMaterial::Ed25519(key), _) => sign_ed25519(key, message),
            (KeyMaterial::Hmac(secret), _) => Ok(sign_hmac(secret, digest, message)),
            (KeyMaterial::Rsa(_), family) => Err(IssuanceError::signing(format!(
                "RSA key cannot sign for {family:?}"
            ))),
        }
    }

    /// Public half of the key as a JWK, or `None` for shared secrets.
    #[must_use]
    pub fn public_jwk(&self) -> Option<Jwk> {
        let mut jwk = Jwk {
            kty: String::new(),
            kid: self.kid.clone(),
            key_use: "sig".to_string(),
            alg: self.algorithm.as_str().to_string(),
            n: None,
            e: None,
            x: None,
            y: None,
            crv: None,
        };

        match &self.material {
            KeyMaterial::Rsa(key) => {
                use rsa::traits::PublicKeyParts;
                jwk.kty = "RSA".to_string();
                jwk.n = Some(URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()));
                jwk.e = Some(URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()));
            }
            KeyMaterial::EcP256(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                jwk.kty = "EC".to_string();
                jwk.crv = Some("P-256".to_string());
                jwk.x = Some(URL_SAFE_NO_PAD.encode(point.x()?));
                jwk.y = Some(URL_SAFE_NO_PAD.encode(point.y()?));
            }
            KeyMaterial::EcP384(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                jwk.kty = "EC".to_string();
                jwk.crv = Some("P-384".to_string());
                jwk.x = Some(URL_SAFE_NO_PAD.encode(point.x()?));
                jwk.y = Some(URL_SAFE_NO_PAD.encode(point.y()?));
            }
            KeyMaterial::Ed25519(key) => {
                jwk.kty = "OKP".to_string();
                jwk.crv = Some("Ed25519".to_string());
                jwk.x = Some(URL_SAFE_NO_PAD.encode(key.verifying_key().to_bytes()));
            }
            KeyMaterial::Hmac(_) => return None,
        }

        Some(jwk)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

fn sign_pkcs1v15(
    key: &RsaPrivateKey,
    digest: DigestSize,
    message: &[u8],
) -> Result<Vec<u8>, IssuanceError> {
    use rsa::pkcs1v15::SigningKey as Pkcs1SigningKey;
    use rsa::signature::{SignatureEncoding, Signer};

    let signature = match digest {
        DigestSize::Sha256 => Pkcs1SigningKey::<sha2::Sha256>::new(key.clone())
            .try_sign(message)
            .map(|s| s.to_vec()),
        DigestSize::Sha384 => Pkcs1SigningKey::<sha2::Sha384>::new(key.clone())
            .try_sign(message)
            .map(|s| s.to_vec()),
        DigestSize::Sha512 => Pkcs1SigningKey::<sha2::Sha512>::new(key.clone())
            .try_sign(message)
            .map(|s| s.to_vec()),
    };
    signature.map_err(|e| IssuanceError::signing(e.to_string()))
}

fn sign_pss(
    key: &RsaPrivateKey,
    digest: DigestSize,
    message: &[u8],
    rng: &mut StdRng,
) -> Result<Vec<u8>, IssuanceError> {
    use rsa::pss::BlindedSigningKey;
    use rsa::signature::{RandomizedSigner, SignatureEncoding};

    let signature = match digest {
        DigestSize::Sha256 => BlindedSigningKey::<sha2::Sha256>::new(key.clone())
            .try_sign_with_rng(rng, message)
            .map(|s| s.to_vec()),
        DigestSize::Sha384 => BlindedSigningKey::<sha2::Sha384>::new(key.clone())
            .try_sign_with_rng(rng, message)
            .map(|s| s.to_vec()),
        DigestSize::Sha512 => BlindedSigningKey::<sha2::Sha512>::new(key.clone())
            .try_sign_with_rng(rng, message)
            .map(|s| s.to_vec()),
    };
    signature.map_err(|e| IssuanceError::signing(e.to_string()))
}

fn sign_p256(key: &p256::ecdsa::SigningKey, message: &[u8]) -> Result<Vec<u8>, IssuanceError> {
    use p256::ecdsa::signature::Signer;

    let signature: p256::ecdsa::Signature = key
        .try_sign(message)
        .map_err(|e| IssuanceError::signing(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

fn sign_p384(key: &p384::ecdsa::SigningKey, message: &[u8]) -> Result<Vec<u8>, IssuanceError> {
    use p384::ecdsa::signature::Signer;

    let signature: p384::ecdsa::Signature = key
        .try_sign(message)
        .map_err(|e| IssuanceError::signing(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

fn sign_ed25519(key: &ed25519_dalek::SigningKey, message: &[u8]) -> Result<Vec<u8>, IssuanceError> {
    use ed25519_dalek::Signer;

    let signature = key
        .try_sign(message)
        .map_err(|e| IssuanceError::signing(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

fn sign_hmac(secret: &[u8], digest: DigestSize, message: &[u8]) -> Vec<u8> {
    use ring::hmac;

    let algorithm = match digest {
        DigestSize::Sha256 => hmac::HMAC_SHA256,
        DigestSize::Sha384 => hmac::HMAC_SHA384,
        DigestSize::Sha512 => hmac::HMAC_SHA512,
    };
    let key = hmac::Key::new(algorithm, secret);
    hmac::sign(&key, message).as_ref().to_vec()
}
