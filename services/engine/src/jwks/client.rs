//! JWKS Client: single-flight cached fetch of the external subject-token
//! issuer's JWKS document.
//!
//! Grounded in `auth-edge/src/jwt/jwk_cache.rs::JwkCache`. The distributed
//! `CacheClient` layer there has no counterpart in this engine — there is no
//! Cache_Service in scope — so this keeps only the local `ArcSwap` cache and
//! the `Mutex<Option<Shared<BoxFuture>>>` single-flight coordinator.

use super::model::Jwks;
use crate::error::EngineError;
use arc_swap::ArcSwap;
use delegation_common::{build_http_client, CacheMetrics, HttpConfig, PlatformError};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, instrument};

struct CacheEntry {
    jwks: Jwks,
    fetched_at: Instant,
}

// `Shared` requires its future's `Output` to be `Clone`; `EngineError` is not
// (it wraps non-Clone platform errors), so the inflight future's error type
// is `Arc<EngineError>` and gets unwrapped at the call site.
type InflightFuture = Shared<BoxFuture<'static, Result<Arc<CacheEntry>, Arc<EngineError>>>>;

/// Fetches and caches the external JWKS document, coalescing concurrent
/// refreshes into a single HTTP request.
pub struct JwksClient {
    jwks_uri: String,
    ttl: Duration,
    cache: ArcSwap<Option<CacheEntry>>,
    inflight: Mutex<Option<InflightFuture>>,
    http: reqwest::Client,
    cache_metrics: CacheMetrics,
}

impl JwksClient {
    /// Construct a client for the given JWKS URI with the given cache TTL.
    #[must_use]
    pub fn new(jwks_uri: impl Into<String>, ttl: Duration, http: reqwest::Client) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            ttl,
            cache: ArcSwap::new(Arc::new(None)),
            inflight: Mutex::new(None),
            http,
            cache_metrics: CacheMetrics::new("jwks"),
        }
    }

    /// Construct a client using `delegation_common`'s shared default HTTP
    /// client configuration, the way a host wires one up in production.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Platform` if the underlying HTTP client cannot
    /// be built (e.g. TLS backend initialization failure).
    pub fn with_default_http(jwks_uri: impl Into<String>, ttl: Duration) -> Result<Self, EngineError> {
        let http = build_http_client(&HttpConfig::default()).map_err(PlatformError::from)?;
        Ok(Self::new(jwks_uri, ttl, http))
    }

    /// Cache hit/miss/size metrics for this client's JWKS cache.
    #[must_use]
    pub fn cache_metrics(&self) -> &CacheMetrics {
        &self.cache_metrics
    }

    /// Resolve a key by `kid`, refreshing the cache if the key is unknown or
    /// the cache is stale.
    ///
    /// Per the JWKS Client contract: on an unknown `kid`, refetch at most
    /// once before failing. If the network fetch fails but a populated
    /// cache entry exists (even if stale), serve the stale entry rather than
    /// fail the caller outright.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn resolve(&self, kid: &str) -> Result<super::model::Jwk, EngineError> {
        if let Some(jwk) = self.try_get_local(kid) {
            self.cache_metrics.record_hit();
            return Ok(jwk);
        }
        self.cache_metrics.record_miss();

        match self.refresh_single_flight().await {
            Ok(()) => self
                .try_get_local(kid)
                .ok_or_else(|| EngineError::invalid_subject_token("signing key not found")),
            Err(refresh_err) => {
                // Stale-if-error: if a previous fetch populated the cache,
                // prefer serving it over surfacing the network failure.
                if let Some(jwk) = self.try_get_any(kid) {
                    return Ok(jwk);
                }
                Err(refresh_err)
            }
        }
    }

    fn try_get_local(&self, kid: &str) -> Option<super::model::Jwk> {
        let cache = self.cache.load();
        if let Some(ref entry) = **cache {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.jwks.find_key(kid).cloned();
            }
        }
        None
    }

    fn try_get_any(&self, kid: &str) -> Option<super::model::Jwk> {
        let cache = self.cache.load();
        (**cache).as_ref().and_then(|entry| entry.jwks.find_key(kid).cloned())
    }

    /// Whether the cache has gone stale (no entry, or past TTL).
    #[must_use]
    pub fn is_stale(&self) -> bool {
        let cache = self.cache.load();
        match **cache {
            Some(ref entry) => entry.fetched_at.elapsed() >= self.ttl,
            None => true,
        }
    }

    async fn refresh_single_flight(&self) -> Result<(), EngineError> {
        let mut guard = self.inflight.lock().await;

        if let Some(fut) = guard.as_ref() {
            let fut = fut.clone();
            drop(guard);
            let entry = fut.await.map_err(|e| clone_engine_error(&e))?;
            self.cache_metrics.update_size(entry.jwks.keys.len() as u64);
            return Ok(());
        }

        let url = self.jwks_uri.clone();
        let client = self.http.clone();
        let cache = self.cache.clone();

        let fut: BoxFuture<'static, Result<Arc<CacheEntry>, Arc<EngineError>>> = Box::pin(async move {
            info!(url = %url, "fetching external jwks");

            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| Arc::new(EngineError::JwksUnavailable(format!("fetch failed: {e}"))))?;

            if !response.status().is_success() {
                return Err(Arc::new(EngineError::JwksUnavailable(format!(
                    "jwks fetch returned status {}",
                    response.status()
                ))));
            }

            let jwks: Jwks = response.json().await.map_err(|e| {
                Arc::new(EngineError::JwksUnavailable(format!("invalid jwks body: {e}")))
            })?;

            let entry = Arc::new(CacheEntry {
                jwks,
                fetched_at: Instant::now(),
            });
            cache.store(Arc::new(Some(CacheEntry {
                jwks: entry.jwks.clone(),
                fetched_at: entry.fetched_at,
            })));
            Ok(entry)
        });

        let shared = fut.shared();
        *guard = Some(shared.clone());
        drop(guard);

        let result = shared.await;
        self.inflight.lock().await.take();
        match result {
            Ok(entry) => {
                self.cache_metrics.update_size(entry.jwks.keys.len() as u64);
                Ok(())
            }
            Err(e) => Err(clone_engine_error(&e)),
        }
    }
}

/// `EngineError` is not `Clone`, so a shared inflight failure is re-wrapped
/// as a fresh `JwksUnavailable` carrying the original message rather than
/// cloned directly.
fn clone_engine_error(err: &EngineError) -> EngineError {
    EngineError::JwksUnavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::model::Jwk;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_jwks() -> Jwks {
        Jwks {
            keys: vec![Jwk {
                kty: "RSA".into(),
                kid: "idp-v1".into(),
                key_use: "sig".into(),
                alg: "RS256".into(),
                n: "n".into(),
                e: "AQAB".into(),
            }],
        }
    }

    #[test]
    fn test_with_default_http_builds_a_client() {
        let client = JwksClient::with_default_http(
            "https://idp.example.com/jwks",
            Duration::from_secs(300),
        );
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_fetches_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_jwks()))
            .expect(1)
            .mount(&server)
            .await;

        let client = JwksClient::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            reqwest::Client::new(),
        );

        let jwk = client.resolve("idp-v1").await.unwrap();
        assert_eq!(jwk.kid, "idp-v1");

        // Second resolve for a cached kid must not trigger another fetch.
        let jwk2 = client.resolve("idp-v1").await.unwrap();
        assert_eq!(jwk2.kid, "idp-v1");
    }

    #[tokio::test]
    async fn test_resolve_unknown_kid_fails_after_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_jwks()))
            .mount(&server)
            .await;

        let client = JwksClient::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            reqwest::Client::new(),
        );

        let err = client.resolve("unknown-kid").await.unwrap_err();
        assert_eq!(err.kind(), "invalid-subject-token");
    }

    #[tokio::test]
    async fn test_resolve_records_hit_and_miss_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_jwks()))
            .expect(1)
            .mount(&server)
            .await;

        let client = JwksClient::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            reqwest::Client::new(),
        );

        client.resolve("idp-v1").await.unwrap();
        assert_eq!(client.cache_metrics().misses.get(), 1);
        assert_eq!(client.cache_metrics().hits.get(), 0);
        assert_eq!(client.cache_metrics().size.get(), 1);

        client.resolve("idp-v1").await.unwrap();
        assert_eq!(client.cache_metrics().hits.get(), 1);
        assert_eq!(client.cache_metrics().misses.get(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_single_flight() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_jwks()))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(JwksClient::new(
            format!("{}/jwks", server.uri()),
            Duration::from_secs(300),
            reqwest::Client::new(),
        ));

        let a = client.clone();
        let b = client.clone();
        let (r1, r2) = tokio::join!(a.resolve("idp-v1"), b.resolve("idp-v1"));
        assert!(r1.is_ok());
        assert!(r2.is_ok());
    }
}
