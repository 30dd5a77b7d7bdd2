//! Signing key and key version types.
//!
//! Private key material never derives `Serialize`/`Debug` in a way that
//! prints it — the same discipline the teacher's
//! `libs/rust/vault::secrets::JwtSigningKey` applies with
//! `#[serde(skip_serializing)]` on its `private_key` field.

use chrono::{DateTime, Utc};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// A single version of a named signing key.
///
/// `version` is monotonically increasing per key name, starting at 1. `kid`
/// is always `"{name}-v{version}"` — callers must never parse it back into
/// an integer on the hot path (per the key-version-ordering design note);
/// it exists solely as an opaque lookup key.
pub struct KeyVersion {
    pub(crate) version: u32,
    pub(crate) kid: String,
    pub(crate) private_key: RsaPrivateKey,
    pub(crate) public_key: RsaPublicKey,
    pub(crate) created_at: DateTime<Utc>,
}

impl std::fmt::Debug for KeyVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVersion")
            .field("version", &self.version)
            .field("kid", &self.kid)
            .field("private_key", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A named signing key: an ordered sequence of `KeyVersion`s. The last
/// element is the active signer; every element is a valid verifier until
/// pruned.
#[derive(Debug)]
pub struct SigningKeyRecord {
    pub(crate) name: String,
    pub(crate) key_size: u32,
    pub(crate) versions: Vec<KeyVersion>,
}

impl SigningKeyRecord {
    /// The active signer: the highest-versioned, most recently created key.
    pub(crate) fn active(&self) -> &KeyVersion {
        self.versions
            .last()
            .expect("a SigningKeyRecord always has at least one version")
    }

    pub(crate) fn current_version(&self) -> u32 {
        self.active().version
    }
}

/// Public-only view of a signing key, safe to return from an admin read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    /// Always `"RS256"` in v1.
    pub algorithm: String,
    /// Version number of the current active signer.
    pub current_version: u32,
    /// PEM-encoded public key (SubjectPublicKeyInfo / PKCS#8) of the active signer.
    pub public_key_pem: String,
}
