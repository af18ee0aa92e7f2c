//! JSON Web Key Set published for token verifiers.

use serde::{Deserialize, Serialize};

/// Public signing key in RFC 7517 form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type: `RSA`, `EC` or `OKP`
    pub kty: String,
    /// Key id
    pub kid: String,
    /// Always `sig`
    #[serde(rename = "use")]
    pub key_use: String,
    /// JOSE algorithm name
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// RSA modulus
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// RSA public exponent
    pub e: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Curve x coordinate, or the Ed25519 public key
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Curve y coordinate
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Curve name
    pub crv: Option<String>,
}

/// Key set document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// Published keys
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Create an empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key.
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// Find a key by id.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Render as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            n: Some("test-n".to_string()),
            e: Some("AQAB".to_string()),
            x: None,
            y: None,
            crv: None,
        }
    }

    #[test]
    fn test_find_key() {
        let mut jwks = Jwks::new();
        jwks.add_key(rsa_jwk("key-1"));
        jwks.add_key(rsa_jwk("key-2"));

        assert_eq!(jwks.find("key-2").unwrap().kid, "key-2");
        assert!(jwks.find("key-3").is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut jwks = Jwks::new();
        jwks.add_key(rsa_jwk("key-1"));

        let value: serde_json::Value = serde_json::from_str(&jwks.to_json().unwrap()).unwrap();
        let key = &value["keys"][0];
        assert_eq!(key["use"], "sig");
        assert_eq!(key["kid"], "key-1");
        assert!(key.get("crv").is_none());
    }
}
