//! Authentication error types.
//!
//! Callers collapse every variant into one client-facing rejection; the
//! variants exist so logs can tell an unreachable issuer from a bad token.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while validating a token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The JWT has expired.
    #[error("token expired")]
    TokenExpired,

    /// The JWT is not valid yet (`nbf` in the future).
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// The JWT signature is invalid.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token header carries no key ID.
    #[error("token header has no key ID")]
    MissingKeyId,

    /// The key ID specified in the token was not found in the key set.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key set entry could not be turned into a verification key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The token's algorithm cannot be verified with a public key set.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Failed to fetch JWKS from the issuer.
    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    /// The token format is invalid.
    #[error("invalid token format: {0}")]
    InvalidToken(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable snake-case name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TokenExpired => "token_expired",
            Self::TokenNotYetValid => "token_not_yet_valid",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingKeyId => "missing_key_id",
            Self::KeyNotFound(_) => "key_not_found",
            Self::InvalidKey(_) => "invalid_key",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::JwksFetchFailed(_) => "jwks_fetch_failed",
            Self::InvalidToken(_) => "invalid_token",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns `true` if validation failed because the key set could not be obtained.
    #[must_use]
    pub const fn is_key_set_unavailable(&self) -> bool {
        matches!(self, Self::JwksFetchFailed(_))
    }
}
