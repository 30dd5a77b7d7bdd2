//! Config/Role persistence boundary.
//!
//! Durable storage is a host responsibility (spec Non-goals), but the engine
//! still needs a trait seam to read/write these records without hard-coding
//! a concrete backend. Grounded in the teacher's dependency-injection shape
//! (`libs/rust/caep::handler::{SessionStore, CredentialCache}`): a small
//! `async_trait` boundary plus an in-memory implementation for tests and the
//! demo binary.

use crate::config::Config;
use crate::error::EngineError;
use crate::role::Role;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persists the engine's singleton [`Config`].
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Write (create or replace) the config.
    async fn write(&self, config: Config) -> Result<(), EngineError>;

    /// Read the current config.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotConfigured` if none has been written.
    async fn read(&self) -> Result<Config, EngineError>;
}

/// Persists named [`Role`] records.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Write (create or replace) a role.
    async fn write(&self, role: Role) -> Result<(), EngineError>;

    /// Read a role by name.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RoleNotFound` if `name` is unknown.
    async fn read(&self, name: &str) -> Result<Role, EngineError>;

    /// Delete a role by name.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RoleNotFound` if `name` is unknown.
    async fn delete(&self, name: &str) -> Result<(), EngineError>;

    /// List all role names.
    async fn list(&self) -> Result<Vec<String>, EngineError>;
}

/// In-memory [`ConfigStore`], guarded by a `tokio::sync::RwLock` for
/// multiple concurrent readers and serialized writers.
#[derive(Default)]
pub struct InMemoryConfigStore {
    config: RwLock<Option<Config>>,
}

impl InMemoryConfigStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn write(&self, config: Config) -> Result<(), EngineError> {
        *self.config.write().await = Some(config);
        Ok(())
    }

    async fn read(&self) -> Result<Config, EngineError> {
        self.config
            .read()
            .await
            .clone()
            .ok_or(EngineError::NotConfigured)
    }
}

/// In-memory [`RoleStore`].
#[derive(Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<String, Role>>,
}

impl InMemoryRoleStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn write(&self, role: Role) -> Result<(), EngineError> {
        // The store has no access to the issuer-configured ceiling (that
        // check lives in `Engine::write_role`), but a zero ttl is invalid
        // regardless of ceiling and is rejected here too.
        if role.ttl.is_zero() {
            return Err(EngineError::InvalidTtl(format!(
                "role {}: ttl must be greater than zero",
                role.name
            )));
        }
        self.roles.write().await.insert(role.name.clone(), role);
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Role, EngineError> {
        self.roles
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::RoleNotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<(), EngineError> {
        self.roles
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::RoleNotFound(name.to_string()))
    }

    async fn list(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.roles.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_role(name: &str) -> Role {
        Role {
            name: name.to_string(),
            signing_key_name: "k1".to_string(),
            ttl: Duration::from_secs(3600),
            bound_issuer: None,
            bound_audiences: Default::default(),
            scope_list: vec![],
            actor_template: "{}".to_string(),
            subject_template: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn test_config_store_round_trip() {
        let store = InMemoryConfigStore::new();
        assert!(matches!(store.read().await, Err(EngineError::NotConfigured)));

        let config = Config::new(
            "https://vault.example.com",
            Duration::from_secs(3600),
            "https://idp.example.com/jwks",
        )
        .unwrap();
        store.write(config.clone()).await.unwrap();
        assert_eq!(store.read().await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_role_store_crud() {
        let store = InMemoryRoleStore::new();
        store.write(sample_role("agent")).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["agent".to_string()]);
        assert!(store.read("agent").await.is_ok());

        store.delete("agent").await.unwrap();
        assert!(matches!(
            store.read("agent").await,
            Err(EngineError::RoleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_role_store_write_rejects_zero_ttl() {
        let store = InMemoryRoleStore::new();
        let mut role = sample_role("agent");
        role.ttl = Duration::ZERO;
        let err = store.write(role).await.unwrap_err();
        assert_eq!(err.kind(), "invalid-ttl");
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_role_store_delete_unknown_fails() {
        let store = InMemoryRoleStore::new();
        assert!(matches!(
            store.delete("nope").await,
            Err(EngineError::RoleNotFound(_))
        ));
    }
}
