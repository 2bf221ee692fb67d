//! JWKS (JSON Web Key Set) fetching.
//!
//! The fetcher performs one HTTPS request per call and keeps nothing between
//! calls; only the underlying connection pool is shared.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Fetches the issuer's key set on demand.
#[derive(Debug, Clone)]
pub struct JwksFetcher {
    url: String,
    client: reqwest::Client,
}

impl JwksFetcher {
    /// Create a fetcher for the configured JWKS URL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| AuthError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: config.jwks_url.clone(),
            client,
        })
    }

    /// The JWKS URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the current key set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::JwksFetchFailed`] on transport errors, non-success
    /// status codes, timeouts, or an undecodable body.
    pub async fn fetch(&self) -> Result<JwkSet> {
        tracing::debug!(url = %self.url, "Fetching JWKS");

        let key_set: JwkSet = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        tracing::debug!(count = key_set.keys.len(), "Fetched JWKS keys");
        Ok(key_set)
    }
}

/// Build the verification key for `kid` from a key set.
///
/// # Errors
///
/// Returns [`AuthError::KeyNotFound`] if no key has that ID, or
/// [`AuthError::InvalidKey`] if the entry cannot be used for verification.
pub fn decoding_key(key_set: &JwkSet, kid: &str) -> Result<DecodingKey> {
    let jwk = key_set
        .find(kid)
        .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))?;

    DecodingKey::from_jwk(jwk).map_err(|e| AuthError::InvalidKey(e.to_string()))
}
