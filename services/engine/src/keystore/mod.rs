//! Key Store: generates, rotates, and signs with named RSA keys.
//!
//! Grounded in `trysoma-soma/crates/identity/src/logic/jwk/mod.rs` for the
//! RSA-keygen-to-JWK pipeline, and in
//! `marcioazam-microservices-base/services/token/src/jwks/publisher.rs` for
//! the `RwLock`-guarded key set shape. Unlike the teacher's KMS-backed
//! signer, keys here are generated and held in-process — no external key
//! management service is in scope.

mod key;

pub use key::PublicKeyInfo;
use key::{KeyVersion, SigningKeyRecord};

use crate::config::MIN_KEY_SIZE_BITS;
use crate::error::EngineError;
use crate::jwks::model::{Jwk, Jwks};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use delegation_common::Gauge;
use jsonwebtoken::{encode, EncodingKey, Header};
use pkcs1::EncodeRsaPrivateKey;
use pkcs8::EncodePublicKey;
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::instrument;

/// Default RSA key size when a caller does not specify one.
pub const DEFAULT_KEY_SIZE_BITS: u32 = 2048;

/// Holds every named signing key known to the engine.
///
/// v1 supports RS256 only; the `algorithm` parameter on `create` exists for
/// forward compatibility and is validated against the one supported value.
pub struct KeyStore {
    keys: RwLock<HashMap<String, SigningKeyRecord>>,
    keys_gauge: Gauge,
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore {
    /// Construct an empty key store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            keys_gauge: Gauge::new("signing_keys", "Currently registered signing keys"),
        }
    }

    /// Number of currently registered signing key names.
    #[must_use]
    pub fn keys_gauge(&self) -> &Gauge {
        &self.keys_gauge
    }

    /// Create a new named signing key at version 1.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::KeyConflict` if `name` already exists, or
    /// `EngineError::InvalidKeySize` if `key_size` is below
    /// [`MIN_KEY_SIZE_BITS`]. Only the `"RS256"` algorithm is accepted in v1.
    #[instrument(skip(self), fields(key_name = %name))]
    pub fn create(
        &self,
        name: &str,
        algorithm: &str,
        key_size: Option<u32>,
    ) -> Result<PublicKeyInfo, EngineError> {
        if algorithm != "RS256" {
            return Err(EngineError::InvalidKeySize(format!(
                "unsupported algorithm: {algorithm}"
            )));
        }
        let key_size = key_size.unwrap_or(DEFAULT_KEY_SIZE_BITS);
        if key_size < MIN_KEY_SIZE_BITS {
            return Err(EngineError::InvalidKeySize(format!(
                "key size {key_size} is below the minimum of {MIN_KEY_SIZE_BITS} bits"
            )));
        }

        let mut keys = self
            .keys
            .write()
            .map_err(|_| EngineError::internal("key store lock poisoned"))?;
        if keys.contains_key(name) {
            return Err(EngineError::KeyConflict(name.to_string()));
        }

        let version = generate_version(name, 1, key_size)?;
        let info = public_info(&version, key_size);
        keys.insert(
            name.to_string(),
            SigningKeyRecord {
                name: name.to_string(),
                key_size,
                versions: vec![version],
            },
        );
        self.keys_gauge.inc();
        Ok(info)
    }

    /// Generate a new version of an existing key and make it the active
    /// signer. Prior versions remain valid verifiers.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::KeyNotFound` if `name` does not exist.
    #[instrument(skip(self), fields(key_name = %name))]
    pub fn rotate(&self, name: &str) -> Result<PublicKeyInfo, EngineError> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| EngineError::internal("key store lock poisoned"))?;
        let record = keys
            .get_mut(name)
            .ok_or_else(|| EngineError::KeyNotFound(name.to_string()))?;

        let next_version = record.current_version() + 1;
        let version = generate_version(name, next_version, record.key_size)?;
        let info = public_info(&version, record.key_size);
        record.versions.push(version);
        Ok(info)
    }

    /// Sign a JSON claim set with the active version of the named key,
    /// returning the compact JWT and the `kid` used.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SigningKeyMissing` if `name` does not exist, or
    /// `EngineError::Internal` on an encoding failure.
    #[instrument(skip(self, claims), fields(key_name = %name))]
    pub fn sign_with(
        &self,
        name: &str,
        claims: &serde_json::Value,
    ) -> Result<(String, String), EngineError> {
        let keys = self
            .keys
            .read()
            .map_err(|_| EngineError::internal("key store lock poisoned"))?;
        let record = keys
            .get(name)
            .ok_or_else(|| EngineError::SigningKeyMissing(name.to_string()))?;
        let active = record.active();

        let pem = active
            .private_key
            .to_pkcs1_pem(pkcs1::LineEnding::LF)
            .map_err(|e| EngineError::internal(format!("pkcs1 encode failed: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| EngineError::internal(format!("invalid signing key material: {e}")))?;

        let mut header = Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = Some(active.kid.clone());

        let jwt = encode(&header, claims, &encoding_key)
            .map_err(|e| EngineError::internal(format!("jwt signing failed: {e}")))?;
        Ok((jwt, active.kid.clone()))
    }

    /// Resolve the public key material for a specific `kid`, searching every
    /// version of every named key.
    #[instrument(skip(self))]
    pub fn resolve_public(&self, kid: &str) -> Result<Jwk, EngineError> {
        let keys = self
            .keys
            .read()
            .map_err(|_| EngineError::internal("key store lock poisoned"))?;
        for record in keys.values() {
            if let Some(version) = record.versions.iter().find(|v| v.kid == kid) {
                return Ok(jwk_for(version));
            }
        }
        Err(EngineError::KeyNotFound(kid.to_string()))
    }

    /// Return the full JWKS document: every valid verifier across every
    /// named key, active and retained.
    #[instrument(skip(self))]
    pub fn list_public_jwks(&self) -> Result<Jwks, EngineError> {
        let keys = self
            .keys
            .read()
            .map_err(|_| EngineError::internal("key store lock poisoned"))?;
        let mut out = Vec::new();
        for record in keys.values() {
            for version in &record.versions {
                out.push(jwk_for(version));
            }
        }
        Ok(Jwks { keys: out })
    }

    /// Read public info for the active version of a named key.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::KeyNotFound` if `name` does not exist.
    #[instrument(skip(self), fields(key_name = %name))]
    pub fn read(&self, name: &str) -> Result<PublicKeyInfo, EngineError> {
        let keys = self
            .keys
            .read()
            .map_err(|_| EngineError::internal("key store lock poisoned"))?;
        let record = keys
            .get(name)
            .ok_or_else(|| EngineError::KeyNotFound(name.to_string()))?;
        Ok(public_info(record.active(), record.key_size))
    }

    /// Delete a named key and all its versions.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::KeyNotFound` if `name` does not exist.
    #[instrument(skip(self), fields(key_name = %name))]
    pub fn delete(&self, name: &str) -> Result<(), EngineError> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| EngineError::internal("key store lock poisoned"))?;
        if keys.remove(name).is_none() {
            return Err(EngineError::KeyNotFound(name.to_string()));
        }
        self.keys_gauge.dec();
        Ok(())
    }
}

fn generate_version(name: &str, version: u32, key_size: u32) -> Result<KeyVersion, EngineError> {
    let private_key = RsaPrivateKey::new(&mut OsRng, key_size as usize)
        .map_err(|e| EngineError::internal(format!("rsa key generation failed: {e}")))?;
    let public_key = private_key.to_public_key();
    Ok(KeyVersion {
        version,
        kid: format!("{name}-v{version}"),
        private_key,
        public_key,
        created_at: Utc::now(),
    })
}

fn public_info(version: &KeyVersion, key_size: u32) -> PublicKeyInfo {
    let pem = version
        .public_key
        .to_public_key_pem(pkcs8::LineEnding::LF)
        .unwrap_or_default();
    let _ = key_size;
    PublicKeyInfo {
        algorithm: "RS256".to_string(),
        current_version: version.version,
        public_key_pem: pem,
    }
}

fn jwk_for(version: &KeyVersion) -> Jwk {
    Jwk {
        kty: "RSA".to_string(),
        kid: version.kid.clone(),
        key_use: "sig".to_string(),
        alg: "RS256".to_string(),
        n: URL_SAFE_NO_PAD.encode(version.public_key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(version.public_key.e().to_bytes_be()),
    }
}
