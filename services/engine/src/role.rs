//! Role record: the named policy binding a signing key, TTL, admission
//! constraints, and claim templates.

use crate::error::EngineError;
use std::collections::HashSet;
use std::time::Duration;

/// A named exchange policy. See the data model table for field semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Role name, referenced by exchange requests.
    pub name: String,
    /// Name of the `SigningKey` used to sign tokens issued under this role.
    pub signing_key_name: String,
    /// Token lifetime; `exp - iat` on every token issued under this role.
    pub ttl: Duration,
    /// If set, the subject token's `iss` must equal this exactly.
    pub bound_issuer: Option<String>,
    /// If non-empty, the subject token's `aud` must intersect this set.
    pub bound_audiences: HashSet<String>,
    /// Fixed scope list, joined with a single space for the `scope` claim.
    pub scope_list: Vec<String>,
    /// Template rendered into the `act` claim's contents.
    pub actor_template: String,
    /// Template rendered into the `subject_claims` claim.
    pub subject_template: String,
}

impl Role {
    /// Space-delimited scope string per RFC 8693.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scope_list.join(" ")
    }

    /// Validate `ttl` is greater than zero and does not exceed `max_ttl`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidTtl` if either bound is violated.
    pub fn validate_ttl(&self, max_ttl: Duration) -> Result<(), EngineError> {
        if self.ttl.is_zero() {
            return Err(EngineError::InvalidTtl(format!(
                "role {}: ttl must be greater than zero",
                self.name
            )));
        }
        if self.ttl > max_ttl {
            return Err(EngineError::InvalidTtl(format!(
                "role {}: ttl {:?} exceeds configured max {:?}",
                self.name, self.ttl, max_ttl
            )));
        }
        Ok(())
    }
}
