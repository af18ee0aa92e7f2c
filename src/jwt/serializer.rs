//! JWS compact serialization.

use crate::error::IssuanceError;
use crate::key::SigningKey;
use crate::random::RandomSource;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::Header;
use serde_json::{Map, Value};

/// Renders `header.claims.signature` tokens.
pub struct JwtSerializer;

impl JwtSerializer {
    /// Header naming the key's algorithm and id.
    #[must_use]
    pub fn header_for(key: &SigningKey) -> Header {
        let mut header = Header::new(key.algorithm().header_algorithm());
        header.kid = Some(key.kid().to_string());
        header
    }

    /// Serialize and sign.
    ///
    /// Claims are written with sorted keys, so identical claim sets always
    /// produce identical signing input.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::SigningFailed`] if the header or claims
    /// cannot be serialized or the key fails to sign, and
    /// [`IssuanceError::RandomnessUnavailable`] if a randomized signature
    /// cannot draw entropy.
    pub fn serialize(
        header: &Header,
        claims: &Map<String, Value>,
        key: &SigningKey,
        source: &dyn RandomSource,
    ) -> Result<String, IssuanceError> {
        let header_json = serde_json::to_vec(header)?;
        let claims_json = serde_json::to_vec(claims)?;

        let mut token = String::with_capacity(
            (header_json.len() + claims_json.len()) * 4 / 3 + key.bits() as usize / 4 + 8,
        );
        URL_SAFE_NO_PAD.encode_string(&header_json, &mut token);
        token.push('.');
        URL_SAFE_NO_PAD.encode_string(&claims_json, &mut token);

        let signature = key.sign(token.as_bytes(), source)?;
        token.push('.');
        URL_SAFE_NO_PAD.encode_string(&signature, &mut token);

        Ok(token)
    }
}
