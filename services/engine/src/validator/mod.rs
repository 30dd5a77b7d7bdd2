//! Subject Validator: parses, verifies, and admits a subject token against
//! a [`Role`]'s bound issuer/audience constraints.
//!
//! Grounded in `services/auth-edge/src/jwt/validator.rs`'s step-by-step
//! verification shape, adapted to resolve the verifying key from this
//! engine's own [`JwksClient`] rather than the teacher's `JwkCache`.

use crate::config::SUBJECT_TOKEN_SKEW_SECS;
use crate::error::EngineError;
use crate::jwks::JwksClient;
use crate::role::Role;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::instrument;

/// Validates subject tokens against an external JWKS.
pub struct SubjectValidator<'a> {
    jwks_client: &'a JwksClient,
}

impl<'a> SubjectValidator<'a> {
    /// Construct a validator backed by the given JWKS client.
    #[must_use]
    pub fn new(jwks_client: &'a JwksClient) -> Self {
        Self { jwks_client }
    }

    /// Validate `token` against `role`'s admission constraints, returning
    /// the subject token's claim map on success.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidSubjectToken` for any verification or
    /// admission failure, with an opaque, crypto-detail-free message.
    /// Returns `EngineError::JwksUnavailable` if the external JWKS could not
    /// be fetched at all.
    #[instrument(skip(self, token), fields(role = %role.name))]
    pub async fn validate(
        &self,
        token: &str,
        role: &Role,
    ) -> Result<Map<String, Value>, EngineError> {
        if token.split('.').count() != 3 {
            return Err(EngineError::invalid_subject_token("malformed token"));
        }

        let header = decode_header(token)
            .map_err(|_| EngineError::invalid_subject_token("malformed token"))?;

        if matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(EngineError::invalid_subject_token("unsupported algorithm"));
        }

        let kid = header
            .kid
            .ok_or_else(|| EngineError::invalid_subject_token("missing kid"))?;

        let jwk = self.jwks_client.resolve(&kid).await?;
        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|_| EngineError::invalid_subject_token("signature invalid"))?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = SUBJECT_TOKEN_SKEW_SECS.max(0) as u64;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let claims: Value = decode(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)?;

        let claims = claims
            .as_object()
            .cloned()
            .ok_or_else(|| EngineError::invalid_subject_token("claims not a JSON object"))?;

        check_issuer(&claims, role)?;
        check_audience(&claims, role)?;

        Ok(claims)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> EngineError {
    use jsonwebtoken::errors::ErrorKind;
    let reason = match err.kind() {
        ErrorKind::ExpiredSignature => "expired",
        ErrorKind::ImmatureSignature => "not yet valid",
        ErrorKind::InvalidSignature => "signature invalid",
        _ => "signature invalid",
    };
    EngineError::invalid_subject_token(reason)
}

fn check_issuer(claims: &Map<String, Value>, role: &Role) -> Result<(), EngineError> {
    let Some(bound_issuer) = role.bound_issuer.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(());
    };
    match claims.get("iss").and_then(Value::as_str) {
        Some(iss) if iss == bound_issuer => Ok(()),
        _ => Err(EngineError::invalid_subject_token("issuer mismatch")),
    }
}

fn check_audience(claims: &Map<String, Value>, role: &Role) -> Result<(), EngineError> {
    if role.bound_audiences.is_empty() {
        return Ok(());
    }
    let token_auds: Vec<&str> = match claims.get("aud") {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    if token_auds.iter().any(|aud| role.bound_audiences.contains(*aud)) {
        Ok(())
    } else {
        Err(EngineError::invalid_subject_token("audience mismatch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role_with(bound_issuer: Option<&str>, bound_audiences: &[&str]) -> Role {
        Role {
            name: "agent".into(),
            signing_key_name: "k1".into(),
            ttl: std::time::Duration::from_secs(3600),
            bound_issuer: bound_issuer.map(str::to_string),
            bound_audiences: bound_audiences.iter().map(|s| s.to_string()).collect(),
            scope_list: vec![],
            actor_template: String::new(),
            subject_template: String::new(),
        }
    }

    #[test]
    fn test_check_issuer_exact_match_required() {
        let role = role_with(Some("https://idp.example.com"), &[]);
        let claims = json!({"iss": "https://idp.example.com"}).as_object().unwrap().clone();
        assert!(check_issuer(&claims, &role).is_ok());

        let claims = json!({"iss": "https://evil.example.com"}).as_object().unwrap().clone();
        assert!(check_issuer(&claims, &role).is_err());
    }

    #[test]
    fn test_check_issuer_unset_allows_any() {
        let role = role_with(None, &[]);
        let claims = json!({"iss": "https://anything.example.com"})
            .as_object()
            .unwrap()
            .clone();
        assert!(check_issuer(&claims, &role).is_ok());
    }

    #[test]
    fn test_check_audience_array_intersection() {
        let role = role_with(None, &["account"]);
        let claims = json!({"aud": ["account", "other"]}).as_object().unwrap().clone();
        assert!(check_audience(&claims, &role).is_ok());
    }

    #[test]
    fn test_check_audience_disjoint_fails() {
        let role = role_with(None, &["account"]);
        let claims = json!({"aud": ["other"]}).as_object().unwrap().clone();
        assert!(check_audience(&claims, &role).is_err());
    }

    #[test]
    fn test_check_audience_string_form() {
        let role = role_with(None, &["account"]);
        let claims = json!({"aud": "account"}).as_object().unwrap().clone();
        assert!(check_audience(&claims, &role).is_ok());
    }

    #[tokio::test]
    async fn test_alg_none_header_rejected() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine as _;

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"user"}"#);
        let token = format!("{header}.{payload}.");

        let jwks_client = JwksClient::new(
            "https://idp.example.com/jwks",
            std::time::Duration::from_secs(300),
            reqwest::Client::new(),
        );
        let validator = SubjectValidator::new(&jwks_client);
        let role = role_with(None, &[]);

        let err = validator.validate(&token, &role).await.unwrap_err();
        assert_eq!(err.kind(), "invalid-subject-token");
    }
}
