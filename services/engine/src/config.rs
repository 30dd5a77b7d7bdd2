//! Global engine configuration.
//!
//! Config is the singleton described in the data model: issuer, default TTL,
//! and the subject-token JWKS URI. All fields are required before any
//! exchange can be performed.

use crate::error::EngineError;
use std::env;
use std::time::Duration;

/// Hard ceiling on the external JWKS cache TTL, per the JWKS Client contract.
pub const JWKS_CACHE_TTL_CEILING_SECS: u64 = 900;

/// Recommended default external JWKS cache TTL.
pub const JWKS_CACHE_TTL_DEFAULT_SECS: u64 = 300;

/// Allowed clock skew when validating `exp`/`nbf` on a subject token.
pub const SUBJECT_TOKEN_SKEW_SECS: i64 = 60;

/// Recommended default ceiling on any role's `ttl`.
pub const MAX_TTL_DEFAULT_SECS: u64 = 86_400;

/// Minimum RSA key size accepted by the Key Store.
pub const MIN_KEY_SIZE_BITS: u32 = 2048;

/// Global singleton configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Absolute URI identifying this engine as a token issuer (`iss` claim).
    pub issuer: String,
    /// Default token TTL, used when a role does not override it.
    pub default_ttl: Duration,
    /// Absolute URI of the external OP's JWKS document.
    pub subject_jwks_uri: String,
    /// Cache TTL applied to fetched copies of the external JWKS.
    pub jwks_cache_ttl: Duration,
    /// Ceiling on any role's `ttl`; `write_role` rejects a role whose `ttl`
    /// exceeds this.
    pub max_ttl: Duration,
}

impl Config {
    /// Construct a config, validating required fields are non-empty.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotConfigured` if `issuer` or `subject_jwks_uri`
    /// is empty, or `EngineError::Internal` if `default_ttl` is zero.
    pub fn new(
        issuer: impl Into<String>,
        default_ttl: Duration,
        subject_jwks_uri: impl Into<String>,
    ) -> Result<Self, EngineError> {
        let issuer = issuer.into();
        let subject_jwks_uri = subject_jwks_uri.into();

        if issuer.is_empty() || subject_jwks_uri.is_empty() {
            return Err(EngineError::NotConfigured);
        }
        if default_ttl.is_zero() {
            return Err(EngineError::internal("default_ttl must be greater than zero"));
        }

        Ok(Self {
            issuer,
            default_ttl,
            subject_jwks_uri,
            jwks_cache_ttl: Duration::from_secs(JWKS_CACHE_TTL_DEFAULT_SECS),
            max_ttl: Duration::from_secs(MAX_TTL_DEFAULT_SECS),
        })
    }

    /// Override the JWKS cache TTL, clamped to the hard ceiling.
    #[must_use]
    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        let ceiling = Duration::from_secs(JWKS_CACHE_TTL_CEILING_SECS);
        self.jwks_cache_ttl = ttl.min(ceiling);
        self
    }

    /// Override the ceiling applied to any role's `ttl`.
    #[must_use]
    pub fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = max_ttl;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `ISSUER` or `SUBJECT_JWKS_URI` are missing, or if
    /// a present variable fails to parse.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();

        let issuer = env::var("ISSUER").map_err(|_| EngineError::NotConfigured)?;
        let subject_jwks_uri = env::var("SUBJECT_JWKS_URI").map_err(|_| EngineError::NotConfigured)?;
        let default_ttl = Duration::from_secs(parse_env("DEFAULT_TTL_SECS", 3600)?);
        let jwks_cache_ttl = Duration::from_secs(parse_env(
            "JWKS_CACHE_TTL_SECS",
            JWKS_CACHE_TTL_DEFAULT_SECS,
        )?);
        let max_ttl = Duration::from_secs(parse_env("MAX_TTL_SECS", MAX_TTL_DEFAULT_SECS)?);

        Ok(Self::new(issuer, default_ttl, subject_jwks_uri)?
            .with_jwks_cache_ttl(jwks_cache_ttl)
            .with_max_ttl(max_ttl))
    }
}

/// Parse an environment variable with a default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, EngineError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| EngineError::internal(format!("invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_issuer_and_jwks_uri() {
        assert!(Config::new("", Duration::from_secs(60), "https://idp.example.com/jwks").is_err());
        assert!(Config::new("https://vault.example.com", Duration::from_secs(60), "").is_err());
    }

    #[test]
    fn test_new_rejects_zero_ttl() {
        let result = Config::new(
            "https://vault.example.com",
            Duration::ZERO,
            "https://idp.example.com/jwks",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_max_ttl_defaults_and_overrides() {
        let config = Config::new(
            "https://vault.example.com",
            Duration::from_secs(3600),
            "https://idp.example.com/jwks",
        )
        .unwrap();
        assert_eq!(config.max_ttl, Duration::from_secs(MAX_TTL_DEFAULT_SECS));

        let config = config.with_max_ttl(Duration::from_secs(120));
        assert_eq!(config.max_ttl, Duration::from_secs(120));
    }

    #[test]
    fn test_jwks_cache_ttl_clamped_to_ceiling() {
        let config = Config::new(
            "https://vault.example.com",
            Duration::from_secs(3600),
            "https://idp.example.com/jwks",
        )
        .unwrap()
        .with_jwks_cache_ttl(Duration::from_secs(10_000));

        assert_eq!(
            config.jwks_cache_ttl,
            Duration::from_secs(JWKS_CACHE_TTL_CEILING_SECS)
        );
    }
}
