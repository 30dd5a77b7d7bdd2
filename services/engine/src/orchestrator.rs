//! Exchange Orchestrator: the single request path that ties every component
//! together to mint a delegation token.

use crate::error::EngineError;
use crate::identity::IdentityResolver;
use crate::jwks::JwksClient;
use crate::keystore::KeyStore;
use crate::store::{ConfigStore, RoleStore};
use crate::template::{render, TemplateContext, TemplateError};
use crate::validator::SubjectValidator;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

/// Ties Config/Role/Key Store, subject validation, identity resolution, and
/// claim templating together into the single `exchange` operation.
pub struct ExchangeOrchestrator {
    config_store: Arc<dyn ConfigStore>,
    role_store: Arc<dyn RoleStore>,
    key_store: Arc<KeyStore>,
    jwks_client: Arc<JwksClient>,
    identity_resolver: Arc<dyn IdentityResolver>,
}

impl ExchangeOrchestrator {
    /// Construct an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        role_store: Arc<dyn RoleStore>,
        key_store: Arc<KeyStore>,
        jwks_client: Arc<JwksClient>,
        identity_resolver: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            config_store,
            role_store,
            key_store,
            jwks_client,
            identity_resolver,
        }
    }

    /// Perform a token exchange: validate `subject_token`, admit it against
    /// `role_name`'s constraints, resolve `caller_identity`, render the
    /// role's claim templates, and return a freshly signed compact JWT.
    ///
    /// # Errors
    ///
    /// See the error handling design table: `not-configured`,
    /// `role-not-found`, `signing-key-missing`, `invalid-subject-token`,
    /// `template-invalid`, `jwks-unavailable`, `internal`.
    #[instrument(skip(self, subject_token, caller_identity), fields(role = %role_name))]
    pub async fn exchange(
        &self,
        role_name: &str,
        subject_token: &str,
        caller_identity: &str,
    ) -> Result<String, EngineError> {
        let config = self.config_store.read().await?;
        let role = self.role_store.read(role_name).await?;

        self.key_store
            .read(&role.signing_key_name)
            .map_err(|_| EngineError::SigningKeyMissing(role.signing_key_name.clone()))?;

        let validator = SubjectValidator::new(&self.jwks_client);
        let subject_token_claims = validator.validate(subject_token, &role).await?;

        let entity = match self.identity_resolver.resolve(caller_identity).await {
            Ok(entity) => Some(entity),
            Err(EngineError::NoEntity) => None,
            Err(other) => return Err(other),
        };

        let now = Utc::now().timestamp();
        let ctx = TemplateContext::new(entity.as_ref(), &subject_token_claims, now);

        let actor_rendered = render(&role.actor_template, &ctx)
            .map_err(|e| map_template_error(e, &role.name))?;
        let subject_rendered = render(&role.subject_template, &ctx)
            .map_err(|e| map_template_error(e, &role.name))?;

        let actor_rendered = actor_rendered.as_object().cloned().unwrap_or_default();
        let act_value = actor_rendered.get("act").cloned().ok_or_else(|| {
            EngineError::TemplateInvalid {
                role: role.name.clone(),
                reason: "actor_template output must contain an \"act\" object".to_string(),
            }
        })?;

        let mut claims = Map::new();
        claims.insert("iss".to_string(), Value::String(config.issuer.clone()));
        claims.insert(
            "sub".to_string(),
            subject_token_claims.get("sub").cloned().unwrap_or(Value::Null),
        );
        if let Some(aud) = actor_rendered.get("aud") {
            claims.insert("aud".to_string(), aud.clone());
        }
        claims.insert("iat".to_string(), Value::Number(now.into()));
        claims.insert(
            "exp".to_string(),
            Value::Number((now + role.ttl.as_secs() as i64).into()),
        );
        claims.insert("act".to_string(), act_value);
        claims.insert("scope".to_string(), Value::String(role.scope_string()));
        claims.insert("subject_claims".to_string(), subject_rendered);

        let claim_set = Value::Object(claims);
        let (jwt, _kid) = self.key_store.sign_with(&role.signing_key_name, &claim_set)?;
        Ok(jwt)
    }
}

fn map_template_error(err: TemplateError, role_name: &str) -> EngineError {
    match err {
        TemplateError::EntityRequired => EngineError::invalid_subject_token("no entity"),
        other => EngineError::TemplateInvalid {
            role: role_name.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::identity::{Entity, StaticIdentityResolver};
    use crate::role::Role;
    use crate::store::{InMemoryConfigStore, InMemoryRoleStore};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use std::collections::HashSet;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct SubjectSigner {
        encoding_key: EncodingKey,
        kid: String,
    }

    fn subject_signer_and_jwks() -> (SubjectSigner, crate::jwks::Jwks) {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine as _;
        use pkcs1::EncodeRsaPrivateKey;
        use pkcs8::EncodePublicKey;
        use rand::rngs::OsRng;
        use rsa::traits::PublicKeyParts;
        use rsa::RsaPrivateKey;

        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public_key = private_key.to_public_key();
        let pem = private_key.to_pkcs1_pem(pkcs1::LineEnding::LF).unwrap();
        let _ = public_key.to_public_key_pem(pkcs8::LineEnding::LF).unwrap();

        let jwk = crate::jwks::Jwk {
            kty: "RSA".to_string(),
            kid: "idp-v1".to_string(),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        };

        (
            SubjectSigner {
                encoding_key: EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
                kid: "idp-v1".to_string(),
            },
            crate::jwks::Jwks { keys: vec![jwk] },
        )
    }

    fn sign_subject_token(signer: &SubjectSigner, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(signer.kid.clone());
        encode(&header, claims, &signer.encoding_key).unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_exchange() {
        let server = MockServer::start().await;
        let (signer, jwks) = subject_signer_and_jwks();
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&jwks))
            .mount(&server)
            .await;

        let config_store = Arc::new(InMemoryConfigStore::new());
        config_store
            .write(
                Config::new(
                    "https://vault.example.com",
                    Duration::from_secs(3600),
                    format!("{}/jwks", server.uri()),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let role_store = Arc::new(InMemoryRoleStore::new());
        let mut bound_audiences = HashSet::new();
        bound_audiences.insert("account".to_string());
        role_store
            .write(Role {
                name: "agent".to_string(),
                signing_key_name: "k1".to_string(),
                ttl: Duration::from_secs(3600),
                bound_issuer: Some("https://idp.example.com".to_string()),
                bound_audiences,
                scope_list: vec!["read:customers".to_string(), "write:customers".to_string()],
                actor_template: r#"{"act":{"sub":"{{identity.entity.name}}"}}"#.to_string(),
                subject_template: r#"{"email":"{{identity.subject.email}}"}"#.to_string(),
            })
            .await
            .unwrap();

        let key_store = Arc::new(KeyStore::new());
        key_store.create("k1", "RS256", None).unwrap();

        let jwks_client = Arc::new(JwksClient::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            reqwest::Client::new(),
        ));

        let identity_resolver = Arc::new(
            StaticIdentityResolver::new().with_entity(
                "caller-token",
                Entity {
                    id: "e1".to_string(),
                    name: "customer-agent".to_string(),
                    ..Default::default()
                },
            ),
        );

        let orchestrator = ExchangeOrchestrator::new(
            config_store,
            role_store,
            key_store,
            jwks_client,
            identity_resolver,
        );

        let now = Utc::now().timestamp();
        let subject_token = sign_subject_token(
            &signer,
            &serde_json::json!({
                "sub": "user@example.com",
                "iss": "https://idp.example.com",
                "aud": ["account"],
                "email": "user@example.com",
                "exp": now + 600,
            }),
        );

        let jwt = orchestrator
            .exchange("agent", &subject_token, "caller-token")
            .await
            .unwrap();

        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);

        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine as _;
        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let claims: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(claims["iss"], "https://vault.example.com");
        assert_eq!(claims["sub"], "user@example.com");
        assert_eq!(claims["act"], serde_json::json!({"sub": "customer-agent"}));
        assert_eq!(claims["scope"], "read:customers write:customers");
        assert_eq!(
            claims["subject_claims"],
            serde_json::json!({"email": "user@example.com"})
        );
        assert_eq!(claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(), 3600);
    }

    #[tokio::test]
    async fn test_role_not_found() {
        let config_store = Arc::new(InMemoryConfigStore::new());
        config_store
            .write(
                Config::new(
                    "https://vault.example.com",
                    Duration::from_secs(3600),
                    "https://idp.example.com/jwks",
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let orchestrator = ExchangeOrchestrator::new(
            config_store,
            Arc::new(InMemoryRoleStore::new()),
            Arc::new(KeyStore::new()),
            Arc::new(JwksClient::new(
                "https://idp.example.com/jwks",
                Duration::from_secs(300),
                reqwest::Client::new(),
            )),
            Arc::new(StaticIdentityResolver::new()),
        );

        let err = orchestrator
            .exchange("missing-role", "x.y.z", "caller-token")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "role-not-found");
    }

    #[tokio::test]
    async fn test_not_configured() {
        let orchestrator = ExchangeOrchestrator::new(
            Arc::new(InMemoryConfigStore::new()),
            Arc::new(InMemoryRoleStore::new()),
            Arc::new(KeyStore::new()),
            Arc::new(JwksClient::new(
                "https://idp.example.com/jwks",
                Duration::from_secs(300),
                reqwest::Client::new(),
            )),
            Arc::new(StaticIdentityResolver::new()),
        );

        let err = orchestrator
            .exchange("agent", "x.y.z", "caller-token")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not-configured");
    }
}
