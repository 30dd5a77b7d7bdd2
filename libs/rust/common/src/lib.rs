//! Shared library for cross-cutting concerns in the token delegation engine.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - HTTP client configuration and building
//! - Retry policies with exponential backoff
//! - OpenTelemetry-flavored tracing integration
//! - Prometheus metrics helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod metrics;
pub mod retry;
pub mod tracing_config;

pub use error::PlatformError;
pub use http::{build_http_client, HttpConfig};
pub use metrics::{CacheMetrics, Counter, Gauge};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{init_tracing, TracingConfig};
