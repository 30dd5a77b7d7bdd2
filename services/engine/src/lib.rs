//! Token delegation engine: RFC 8693 actor-claim token exchange.
//!
//! Validates an externally-issued subject token against a JWKS, resolves
//! the authenticated caller to an identity record, renders role-scoped
//! claim templates, and mints a freshly signed delegation JWT carrying an
//! `act` claim. See `Engine` for the composition root and admin surface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
pub mod config;
pub mod error;
pub mod identity;
pub mod jwks;
pub mod keystore;
pub mod metrics;
pub mod orchestrator;
pub mod role;
pub mod store;
pub mod template;
pub mod validator;

pub use admin::Engine;
pub use config::Config;
pub use error::{EngineError, HostError};
pub use identity::{Entity, IdentityResolver, StaticIdentityResolver};
pub use jwks::{Jwk, Jwks, JwksClient, JwksPublisher};
pub use keystore::{KeyStore, PublicKeyInfo};
pub use role::Role;
pub use store::{ConfigStore, InMemoryConfigStore, InMemoryRoleStore, RoleStore};
