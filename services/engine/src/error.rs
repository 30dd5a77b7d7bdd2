//! Centralized error handling for the token delegation engine.
//!
//! Every variant corresponds to one of the error kinds in the error handling
//! design: `not-configured`, `role-not-found`, `signing-key-missing`,
//! `invalid-subject-token`, `template-invalid`, `jwks-unavailable`, and
//! `internal`. Messages are kept free of cryptographic detail and never
//! include raw subject tokens or key material.

use delegation_common::PlatformError;
use thiserror::Error;

/// Engine error types, one per documented error kind.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Platform infrastructure error (HTTP, serialization, ...)
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Config is missing or incomplete
    #[error("engine is not configured")]
    NotConfigured,

    /// Named role does not exist
    #[error("role not found: {0}")]
    RoleNotFound(String),

    /// Role references a signing key that does not exist
    #[error("signing key missing: {0}")]
    SigningKeyMissing(String),

    /// Subject token failed validation; message is intentionally opaque
    #[error("invalid subject token: {0}")]
    InvalidSubjectToken(String),

    /// Rendered claim template did not parse as a JSON object
    #[error("template invalid for role {role}: {reason}")]
    TemplateInvalid {
        /// Role whose template failed to render
        role: String,
        /// Parse/render failure reason
        reason: String,
    },

    /// Caller entity could not be resolved
    #[error("no entity for caller")]
    NoEntity,

    /// External JWKS unreachable and no valid cache entry
    #[error("jwks unavailable: {0}")]
    JwksUnavailable(String),

    /// Duplicate key name on create
    #[error("key already exists: {0}")]
    KeyConflict(String),

    /// Unknown key name on rotate/read/delete
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Key size below the minimum
    #[error("invalid key size: {0}")]
    InvalidKeySize(String),

    /// Role `ttl` is zero, negative, or exceeds the configured ceiling
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),

    /// Signing, encoding, or other internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Platform(e) => e.is_retryable(),
            Self::JwksUnavailable(_) => true,
            _ => false,
        }
    }

    /// Error kind string per the error handling design table.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Platform(_) | Self::Internal(_) => "internal",
            Self::NotConfigured => "not-configured",
            Self::RoleNotFound(_) => "role-not-found",
            Self::SigningKeyMissing(_) => "signing-key-missing",
            Self::InvalidSubjectToken(_) | Self::NoEntity => "invalid-subject-token",
            Self::TemplateInvalid { .. } => "template-invalid",
            Self::JwksUnavailable(_) => "jwks-unavailable",
            Self::KeyConflict(_) => "key-conflict",
            Self::KeyNotFound(_) => "key-not-found",
            Self::InvalidKeySize(_) => "invalid-key-size",
            Self::InvalidTtl(_) => "invalid-ttl",
        }
    }

    /// Construct an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Construct an invalid-subject-token error with an opaque, safe reason.
    ///
    /// Callers must pass one of: "signature invalid", "expired",
    /// "issuer mismatch", "audience mismatch", or similarly coarse text —
    /// never a raw parser error that might echo token content.
    #[must_use]
    pub fn invalid_subject_token(reason: impl Into<String>) -> Self {
        Self::InvalidSubjectToken(reason.into())
    }
}

/// The host's error shape: an error kind plus a human-readable message.
///
/// The engine does not mandate an RFC 8693 OAuth error envelope (spec
/// Non-goals); this is the neutral shape a host framework renders however it
/// sees fit.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HostError {
    /// Machine-readable error kind, see the error handling design table.
    pub kind: &'static str,
    /// Human-readable message, never containing secrets.
    pub message: String,
    /// Whether the caller may retry the operation as-is.
    pub retryable: bool,
}

impl From<&EngineError> for HostError {
    fn from(err: &EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<EngineError> for HostError {
    fn from(err: EngineError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(EngineError::JwksUnavailable("down".into()).is_retryable());
        assert!(!EngineError::RoleNotFound("agent".into()).is_retryable());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(EngineError::NotConfigured.kind(), "not-configured");
        assert_eq!(EngineError::RoleNotFound("x".into()).kind(), "role-not-found");
        assert_eq!(
            EngineError::TemplateInvalid {
                role: "x".into(),
                reason: "bad json".into()
            }
            .kind(),
            "template-invalid"
        );
    }

    #[test]
    fn test_host_error_does_not_leak_internals() {
        let err = EngineError::invalid_subject_token("signature invalid");
        let host: HostError = err.into();
        assert_eq!(host.kind, "invalid-subject-token");
        assert!(!host.message.to_lowercase().contains("rsa"));
    }
}
