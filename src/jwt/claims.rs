//! Per-call claim data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Issuer claim
pub const ISSUER: &str = "iss";
/// Subject claim
pub const SUBJECT: &str = "sub";
/// Audience claim
pub const AUDIENCE: &str = "aud";
/// Expiry claim
pub const EXPIRES_AT: &str = "exp";
/// Not-before claim
pub const NOT_BEFORE: &str = "nbf";
/// Issued-at claim
pub const ISSUED_AT: &str = "iat";
/// Token id claim; carries the nonce
pub const TOKEN_ID: &str = "jti";

/// Claims supplied by the caller for a single token.
///
/// Serializes as a plain JSON object so requests can be read straight from
/// configuration or a transport payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Request {
    claims: Map<String, Value>,
}

impl Request {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request from an existing claim map.
    #[must_use]
    pub fn from_claims(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Set the subject.
    #[must_use]
    pub fn subject(self, subject: impl Into<String>) -> Self {
        self.claim(SUBJECT, subject.into())
    }

    /// Set the audience. A single audience is written as a string.
    #[must_use]
    pub fn audience<I, S>(self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut audience: Vec<Value> = audience
            .into_iter()
            .map(|a| Value::String(a.into()))
            .collect();
        let value = if audience.len() == 1 {
            audience.remove(0)
        } else {
            Value::Array(audience)
        };
        self.claim(AUDIENCE, value)
    }

    /// Set the expiry as a unix timestamp.
    ///
    /// Ignored when the issuer descriptor configures a token duration.
    #[must_use]
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.claim(EXPIRES_AT, timestamp)
    }

    /// Set an arbitrary claim.
    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Claims set so far.
    #[must_use]
    pub const fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Check if no claims are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = Request::new()
            .subject("user-123")
            .audience(["api"])
            .claim("scope", "read write");

        assert_eq!(request.claims()[SUBJECT], "user-123");
        assert_eq!(request.claims()[AUDIENCE], "api");
        assert_eq!(request.claims()["scope"], "read write");
    }

    #[test]
    fn test_multiple_audiences() {
        let request = Request::new().audience(vec!["api".to_string(), "admin".to_string()]);
        assert_eq!(request.claims()[AUDIENCE], serde_json::json!(["api", "admin"]));
    }

    #[test]
    fn test_request_is_a_plain_object() {
        let request: Request = serde_json::from_str(r#"{"sub":"svc","tenant":7}"#).unwrap();
        assert_eq!(request.claims()["tenant"], 7);
        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"sub":"svc","tenant":7}"#);
        assert!(Request::new().is_empty());
    }
}
