//! JWKS Publisher: exposes the engine's own signing keys as a JWKS document.
//!
//! Diverges deliberately from the teacher's `services/token/src/jwks/publisher.rs`,
//! which keeps its own current/previous key `RwLock` state independent of the
//! signer. Here the Key Store already owns every key version and its
//! retention, so the publisher is a thin read-through rather than a second
//! source of truth.

use crate::error::EngineError;
use crate::jwks::model::Jwks;
use crate::keystore::KeyStore;
use std::sync::Arc;
use tracing::instrument;

/// Publishes the engine's own signing keys as a verifier-facing JWKS document.
pub struct JwksPublisher {
    key_store: Arc<KeyStore>,
}

impl JwksPublisher {
    /// Construct a publisher backed by the given key store.
    #[must_use]
    pub fn new(key_store: Arc<KeyStore>) -> Self {
        Self { key_store }
    }

    /// Return the current JWKS document: every retained verifier across
    /// every named signing key.
    #[instrument(skip(self))]
    pub fn publish(&self) -> Result<Jwks, EngineError> {
        self.key_store.list_public_jwks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reflects_key_store_state() {
        let store = Arc::new(KeyStore::new());
        store.create("agent-signer", "RS256", None).unwrap();
        store.rotate("agent-signer").unwrap();

        let publisher = JwksPublisher::new(store);
        let jwks = publisher.publish().unwrap();
        assert_eq!(jwks.keys.len(), 2);
    }

    #[test]
    fn test_publish_empty_store_returns_empty_jwks() {
        let store = Arc::new(KeyStore::new());
        let publisher = JwksPublisher::new(store);
        assert!(publisher.publish().unwrap().keys.is_empty());
    }
}
