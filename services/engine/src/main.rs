//! Token delegation engine demo binary.
//!
//! Wires an in-memory config/role store, a local RSA key store, and a fixed
//! identity resolver into an `Engine`, then performs one token exchange to
//! demonstrate the composition. This binary is not a network server — no
//! gRPC/HTTP transport is implemented here.

use delegation_common::{init_tracing, TracingConfig};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use token_exchange_engine::{
    Config, Engine, Entity, InMemoryConfigStore, InMemoryRoleStore, JwksClient, Role,
    StaticIdentityResolver,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&TracingConfig::default().with_service_name("token-exchange-engine"));
    info!("starting token delegation engine demo");

    let config_store = Arc::new(InMemoryConfigStore::new());
    let role_store = Arc::new(InMemoryRoleStore::new());
    let key_store = Arc::new(token_exchange_engine::KeyStore::new());
    let jwks_client = Arc::new(JwksClient::with_default_http(
        "https://idp.example.com/.well-known/jwks.json",
        Duration::from_secs(300),
    )?);
    let identity_resolver = Arc::new(
        StaticIdentityResolver::new().with_entity(
            "demo-caller",
            Entity {
                id: "e1".to_string(),
                name: "customer-agent".to_string(),
                ..Default::default()
            },
        ),
    );

    let engine = Engine::new(
        config_store,
        role_store,
        key_store.clone(),
        jwks_client,
        identity_resolver,
    );

    engine
        .write_config(Config::new(
            "https://vault.example.com",
            Duration::from_secs(3600),
            "https://idp.example.com/.well-known/jwks.json",
        )?)
        .await?;

    engine.create_key("agent-signer", "RS256", None)?;

    let mut bound_audiences = HashSet::new();
    bound_audiences.insert("account".to_string());
    engine
        .write_role(Role {
            name: "agent".to_string(),
            signing_key_name: "agent-signer".to_string(),
            ttl: Duration::from_secs(3600),
            bound_issuer: Some("https://idp.example.com".to_string()),
            bound_audiences,
            scope_list: vec!["read:customers".to_string(), "write:customers".to_string()],
            actor_template: r#"{"act":{"sub":"{{identity.entity.name}}"}}"#.to_string(),
            subject_template: r#"{"email":"{{identity.subject.email}}"}"#.to_string(),
        })
        .await?;

    let subject_token = demo_subject_token();
    match engine.exchange("agent", &subject_token, "demo-caller").await {
        Ok(jwt) => {
            info!("issued delegation token");
            println!("{jwt}");
        }
        Err(err) => {
            // Expected in this offline demo: the subject token is signed by
            // a throwaway key whose JWKS is never actually published, so
            // subject validation cannot succeed end to end. The point is
            // the wiring above, not a live two-party handshake.
            tracing::warn!(kind = err.kind(), "demo exchange did not complete: {err}");
        }
    }

    Ok(())
}

/// Build a throwaway subject token for the demo, signed by an ephemeral key
/// whose public half this process has no way to publish — this binary only
/// demonstrates composition, not a working two-party handshake.
fn demo_subject_token() -> String {
    use rand::rngs::OsRng;
    use rsa::RsaPrivateKey;

    let private_key = RsaPrivateKey::new(&mut OsRng, 2048).expect("rsa keygen");
    let pem = pkcs1::EncodeRsaPrivateKey::to_pkcs1_pem(&private_key, pkcs1::LineEnding::LF)
        .expect("pkcs1 encode");
    let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("encoding key");

    let now = chrono::Utc::now().timestamp();
    let claims = serde_json::json!({
        "sub": "user@example.com",
        "iss": "https://idp.example.com",
        "aud": ["account"],
        "email": "user@example.com",
        "exp": now + 600,
    });

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("demo-idp-v1".to_string());
    encode(&header, &claims, &encoding_key).expect("sign demo subject token")
}
