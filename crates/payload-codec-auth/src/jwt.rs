//! JWT validation and identity extraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::jwks::{self, JwksFetcher};
use crate::AuthConfig;

/// Identity claims of a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The `sub` claim.
    pub subject: Option<String>,
    /// The `iss` claim.
    pub issuer: Option<String>,
    /// The `aud` claim, normalized to a list.
    pub audience: Vec<String>,
    /// The `exp` claim.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Trait for validating bearer tokens.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate a token and extract its identity claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be validated.
    async fn validate(&self, token: &str) -> Result<Identity>;
}

/// Raw claims from a JWT. Every claim is optional.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Audience,
    #[serde(default)]
    exp: Option<u64>,
}

/// Audience claim that can be either a string or array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
enum Audience {
    Single(String),
    Multiple(Vec<String>),
    #[default]
    None,
}

impl Audience {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s],
            Self::Multiple(v) => v,
            Self::None => Vec::new(),
        }
    }
}

impl From<RawClaims> for Identity {
    fn from(claims: RawClaims) -> Self {
        let expires_at = claims
            .exp
            .and_then(|exp| i64::try_from(exp).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Self {
            subject: claims.sub,
            issuer: claims.iss,
            audience: claims.aud.into_vec(),
            expires_at,
        }
    }
}

/// JWKS-based token validator.
///
/// Every call fetches the key set afresh, then verifies the token signature
/// with the key named by the token's `kid` and checks `exp`/`nbf` when
/// present. Audience is not enforced.
#[derive(Debug, Clone)]
pub struct JwksValidator {
    jwks: JwksFetcher,
}

impl JwksValidator {
    /// Create a new JWKS-based validator.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: AuthConfig) -> Result<Self> {
        Ok(Self {
            jwks: JwksFetcher::new(&config)?,
        })
    }

    /// Get a reference to the JWKS fetcher.
    #[must_use]
    pub const fn jwks(&self) -> &JwksFetcher {
        &self.jwks
    }
}

#[async_trait]
impl TokenValidator for JwksValidator {
    async fn validate(&self, token: &str) -> Result<Identity> {
        // Fresh keys on every request.
        let key_set = self.jwks.fetch().await?;

        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = jwks::decoding_key(&key_set, &kid)?;

        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.required_spec_claims.clear();

        let token_data =
            decode::<RawClaims>(token, &key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                    AuthError::UnsupportedAlgorithm(e.to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        Ok(Identity::from(token_data.claims))
    }
}

/// A mock token validator for testing.
///
/// Accepts tokens of the form `test-token:<subject>` without any network access.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub struct MockTokenValidator {
    /// Issuer reported for every accepted token.
    pub issuer: String,
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockTokenValidator {
    fn default() -> Self {
        Self {
            issuer: "test-issuer".to_string(),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl TokenValidator for MockTokenValidator {
    async fn validate(&self, token: &str) -> Result<Identity> {
        let subject = token
            .strip_prefix("test-token:")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("expected test-token:<subject>".to_string()))?;

        Ok(Identity {
            subject: Some(subject.to_string()),
            issuer: Some(self.issuer.clone()),
            audience: Vec::new(),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        })
    }
}
