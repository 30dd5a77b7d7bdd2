//! JWKS model, external client, and publisher.

pub mod client;
pub mod model;
pub mod publisher;

pub use client::JwksClient;
pub use model::{Jwk, Jwks};
pub use publisher::JwksPublisher;
