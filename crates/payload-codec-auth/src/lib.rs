//! Bearer token authentication for payload-codec.
//!
//! This crate validates JWTs presented to the codec server:
//!
//! - JWKS (JSON Web Key Set) fetching from the issuer, fresh on every call
//! - Signature and time-claim verification with `jsonwebtoken`
//! - Identity claims extraction for request logging
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Codec server   │────▶│  TokenValidator  │
//! │   (HTTP)         │     │  (trait)         │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  JwksValidator   │
//!                          │  (impl)          │
//!                          └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  JwksFetcher     │
//!                          │  (no cache)      │
//!                          └────────┬─────────┘
//!                                   │ HTTPS
//!                          ┌────────▼─────────┐
//!                          │   Issuer         │
//!                          │   JWKS endpoint  │
//!                          └──────────────────┘
//! ```
//!
//! Keys are deliberately not cached: every validation performs one fetch,
//! bounded by [`AuthConfig::fetch_timeout`].
//!
//! # Example
//!
//! ```no_run
//! use payload_codec_auth::{AuthConfig, JwksValidator, TokenValidator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = JwksValidator::new(AuthConfig::default())?;
//!
//! let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6IjEifQ...";
//! let identity = validator.validate(token).await?;
//!
//! println!("Subject: {:?}", identity.subject);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::time::Duration;

pub mod error;
pub mod jwks;
pub mod jwt;

pub use error::{AuthError, Result};
pub use jwks::JwksFetcher;
pub use jwt::{Identity, JwksValidator, TokenValidator};

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockTokenValidator;

/// JWKS endpoint of the workflow cloud's login issuer.
pub const DEFAULT_JWKS_URL: &str = "https://login.tmprl.cloud/.well-known/jwks.json";

/// Configuration for token validation.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// URL of the JWKS document.
    pub jwks_url: String,
    /// Upper bound on a single JWKS fetch, in seconds.
    pub fetch_timeout_seconds: u64,
}

impl AuthConfig {
    /// Create a configuration for a specific JWKS URL.
    #[must_use]
    pub fn with_jwks_url(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            ..Self::default()
        }
    }

    /// Get the fetch timeout as a `Duration`.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            fetch_timeout_seconds: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AuthConfig::default();
        assert_eq!(
            config.jwks_url,
            "https://login.tmprl.cloud/.well-known/jwks.json"
        );
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn custom_url_keeps_timeout() {
        let config = AuthConfig::with_jwks_url("http://localhost:9000/jwks.json");
        assert_eq!(config.jwks_url, "http://localhost:9000/jwks.json");
        assert_eq!(config.fetch_timeout_seconds, 10);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            AuthError::JwksFetchFailed("timeout".into()).kind(),
            "jwks_fetch_failed"
        );
        assert_eq!(AuthError::TokenExpired.kind(), "token_expired");
        assert!(AuthError::JwksFetchFailed("timeout".into()).is_key_set_unavailable());
        assert!(!AuthError::InvalidSignature.is_key_set_unavailable());
    }
}
