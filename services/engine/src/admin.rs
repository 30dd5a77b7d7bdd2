//! `Engine`: wires every component together and exposes the admin
//! operations table (spec §6) as inherent methods, one per row.

use crate::config::Config;
use crate::error::EngineError;
use crate::identity::IdentityResolver;
use crate::jwks::{Jwks, JwksClient, JwksPublisher};
use crate::keystore::{KeyStore, PublicKeyInfo};
use crate::metrics::EngineMetrics;
use crate::orchestrator::ExchangeOrchestrator;
use crate::role::Role;
use crate::store::{ConfigStore, RoleStore};
use std::sync::Arc;
use tracing::instrument;

/// The token delegation engine: the composition root for every component
/// and the admin operations surface a host routes requests to.
pub struct Engine {
    config_store: Arc<dyn ConfigStore>,
    role_store: Arc<dyn RoleStore>,
    key_store: Arc<KeyStore>,
    jwks_client: Arc<JwksClient>,
    jwks_publisher: JwksPublisher,
    orchestrator: ExchangeOrchestrator,
    metrics: EngineMetrics,
}

impl Engine {
    /// Wire a new engine from its collaborators.
    #[must_use]
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        role_store: Arc<dyn RoleStore>,
        key_store: Arc<KeyStore>,
        jwks_client: Arc<JwksClient>,
        identity_resolver: Arc<dyn IdentityResolver>,
    ) -> Self {
        let orchestrator = ExchangeOrchestrator::new(
            config_store.clone(),
            role_store.clone(),
            key_store.clone(),
            jwks_client.clone(),
            identity_resolver,
        );
        Self {
            jwks_publisher: JwksPublisher::new(key_store.clone()),
            config_store,
            role_store,
            key_store,
            jwks_client,
            orchestrator,
            metrics: EngineMetrics::new(),
        }
    }

    /// `config` write: persist the singleton configuration.
    pub async fn write_config(&self, config: Config) -> Result<(), EngineError> {
        self.config_store.write(config).await
    }

    /// `config` read: return the current configuration.
    pub async fn read_config(&self) -> Result<Config, EngineError> {
        self.config_store.read().await
    }

    /// `key/<name>` write (create): generate a new named signing key.
    pub fn create_key(
        &self,
        name: &str,
        algorithm: &str,
        key_size: Option<u32>,
    ) -> Result<PublicKeyInfo, EngineError> {
        self.key_store.create(name, algorithm, key_size)
    }

    /// `key/<name>` write (rotate): append a new active version.
    #[instrument(skip(self))]
    pub fn rotate_key(&self, name: &str) -> Result<PublicKeyInfo, EngineError> {
        let info = self.key_store.rotate(name)?;
        self.metrics.key_rotations_total.inc();
        Ok(info)
    }

    /// `key/<name>` read: public material only.
    pub fn read_key(&self, name: &str) -> Result<PublicKeyInfo, EngineError> {
        self.key_store.read(name)
    }

    /// `key/<name>` delete.
    pub fn delete_key(&self, name: &str) -> Result<(), EngineError> {
        self.key_store.delete(name)
    }

    /// `key/` list: not tracked separately by the Key Store, so this reads
    /// back through the published JWKS and de-duplicates key names.
    pub fn list_keys(&self) -> Result<Vec<String>, EngineError> {
        let jwks = self.key_store.list_public_jwks()?;
        let mut names: Vec<String> = jwks
            .keys
            .iter()
            .filter_map(|jwk| jwk.kid.rsplit_once("-v").map(|(name, _)| name.to_string()))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// `role/<name>` write: persist a role record.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidTtl` if `role.ttl` is zero or exceeds the
    /// issuer-configured ceiling (`Config::max_ttl`).
    pub async fn write_role(&self, role: Role) -> Result<(), EngineError> {
        let config = self.config_store.read().await?;
        role.validate_ttl(config.max_ttl)?;
        self.role_store.write(role).await
    }

    /// `role/<name>` read.
    pub async fn read_role(&self, name: &str) -> Result<Role, EngineError> {
        self.role_store.read(name).await
    }

    /// `role/<name>` delete.
    pub async fn delete_role(&self, name: &str) -> Result<(), EngineError> {
        self.role_store.delete(name).await
    }

    /// `role/` list.
    pub async fn list_roles(&self) -> Result<Vec<String>, EngineError> {
        self.role_store.list().await
    }

    /// `token/<role>` write: perform a token exchange.
    #[instrument(skip(self, subject_token, caller_identity), fields(role = %role_name))]
    pub async fn exchange(
        &self,
        role_name: &str,
        subject_token: &str,
        caller_identity: &str,
    ) -> Result<String, EngineError> {
        let result = self
            .orchestrator
            .exchange(role_name, subject_token, caller_identity)
            .await;
        match &result {
            Ok(_) => self.metrics.exchanges_total.inc(),
            Err(_) => self.metrics.exchange_errors_total.inc(),
        }
        result
    }

    /// `jwks` read: the public verification JWKS for all active signing
    /// keys.
    pub fn jwks(&self) -> Result<Jwks, EngineError> {
        self.jwks_publisher.publish()
    }

    /// Render all tracked metrics in Prometheus text exposition format:
    /// the engine's own counters plus the JWKS Client's cache metrics and
    /// the Key Store's signing-key gauge, recorded where each is actually
    /// produced rather than duplicated here.
    #[must_use]
    pub fn metrics_snapshot(&self) -> String {
        [
            self.metrics.to_prometheus(),
            self.jwks_client.cache_metrics().to_prometheus(),
            self.key_store.keys_gauge().to_prometheus(),
        ]
        .join("\n")
    }
}
