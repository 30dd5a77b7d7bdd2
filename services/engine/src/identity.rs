//! Identity Resolver: the external collaborator that maps an authenticated
//! caller to an entity record. Grounded in the teacher's `KmsSigner`
//! trait-plus-mock shape (`kms::mod::KmsSigner` / `kms::mock::MockKms`) — a
//! small `async_trait` boundary with a fixture implementation beside it.

use crate::error::EngineError;
use async_trait::async_trait;
use std::collections::HashMap;

/// An alias entry: an identity known to the caller under a mount accessor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alias {
    /// Alias-scoped identifier.
    pub id: String,
    /// Alias-scoped display name.
    pub name: String,
    /// Alias-scoped metadata.
    pub metadata: HashMap<String, String>,
}

/// A group membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group identifier.
    pub id: String,
    /// Group display name.
    pub name: String,
}

/// The authenticated caller's entity record, as resolved by the host's
/// identity subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entity {
    /// Entity identifier.
    pub id: String,
    /// Entity display name.
    pub name: String,
    /// Free-form metadata.
    pub metadata: HashMap<String, String>,
    /// Aliases keyed by mount accessor.
    pub aliases: HashMap<String, Alias>,
    /// Group memberships.
    pub groups: Vec<Group>,
}

/// Resolves an authenticated caller token to an `Entity`.
///
/// This is a host collaborator: the engine never implements identity
/// resolution itself, only depends on this capability.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the caller token to an entity record.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoEntity` if the caller has no known entity.
    async fn resolve(&self, caller_token: &str) -> Result<Entity, EngineError>;
}

/// A fixed-table `IdentityResolver` for tests and the demo binary, standing
/// in for the host identity subsystem.
#[derive(Debug, Default)]
pub struct StaticIdentityResolver {
    entities: HashMap<String, Entity>,
}

impl StaticIdentityResolver {
    /// Construct an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }

    /// Register an entity under the given caller token.
    #[must_use]
    pub fn with_entity(mut self, caller_token: impl Into<String>, entity: Entity) -> Self {
        self.entities.insert(caller_token.into(), entity);
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, caller_token: &str) -> Result<Entity, EngineError> {
        self.entities
            .get(caller_token)
            .cloned()
            .ok_or(EngineError::NoEntity)
    }
}
