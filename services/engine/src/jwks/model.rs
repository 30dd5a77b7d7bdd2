//! Shared JWK / JWKS wire structures, per RFC 7517.

use serde::{Deserialize, Serialize};

/// JSON Web Key per RFC 7517. Only the RSA fields the engine uses are kept;
/// `use`/`alg` are always `sig`/`RS256` in v1 per the Key Store's algorithm
/// constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type, always `"RSA"` in v1.
    pub kty: String,
    /// Key ID, in the fixed `"{name}-v{version}"` format.
    pub kid: String,
    /// Key use, always `"sig"`.
    #[serde(rename = "use")]
    pub key_use: String,
    /// Algorithm, always `"RS256"`.
    pub alg: String,
    /// RSA modulus, base64url-encoded (no padding).
    pub n: String,
    /// RSA exponent, base64url-encoded (no padding).
    pub e: String,
}

/// JSON Web Key Set per RFC 7517.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Jwks {
    /// Array of JWK values.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Find a key by ID.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_key() {
        let jwks = Jwks {
            keys: vec![Jwk {
                kty: "RSA".into(),
                kid: "k1-v1".into(),
                key_use: "sig".into(),
                alg: "RS256".into(),
                n: "n".into(),
                e: "AQAB".into(),
            }],
        };
        assert!(jwks.find_key("k1-v1").is_some());
        assert!(jwks.find_key("k1-v2").is_none());
    }
}
