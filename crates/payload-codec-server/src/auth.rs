//! Bearer token extraction and validation.
//!
//! Handlers call [`authenticate`] after the route has been resolved, so the
//! namespace and direction are available for logging.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use payload_codec_auth::{Identity, TokenValidator};

use crate::error::{ApiError, AuthRejection};
use crate::resolve::ResolvedRoute;

const MAX_LOGGED_CREDENTIAL: usize = 50;
const TRUNCATED_PREFIX: usize = 47;

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The header must split on single spaces into exactly two parts, the first
/// being `Bearer`.
///
/// # Errors
///
/// Returns [`AuthRejection::MissingHeader`] if the header is absent or empty
/// and [`AuthRejection::MalformedHeader`] if it has any other shape.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let value = match headers.get(AUTHORIZATION) {
        None => return Err(AuthRejection::MissingHeader),
        Some(value) if value.is_empty() => return Err(AuthRejection::MissingHeader),
        Some(value) => value.to_str().map_err(|_| AuthRejection::MalformedHeader)?,
    };

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AuthRejection::MalformedHeader),
    }
}

/// Shorten credential material for logging.
#[must_use]
pub fn truncate_credential(value: &str) -> String {
    if value.chars().count() > MAX_LOGGED_CREDENTIAL {
        let prefix: String = value.chars().take(TRUNCATED_PREFIX).collect();
        format!("{prefix}...")
    } else {
        value.to_string()
    }
}

/// Authenticate a request for a resolved route.
///
/// Every validation failure, including an unreachable key set, is reported to
/// the client as [`AuthRejection::InvalidToken`]; the cause is logged.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] if the header is missing or malformed,
/// or the token does not validate.
pub async fn authenticate<V>(
    validator: &V,
    headers: &HeaderMap,
    route: &ResolvedRoute,
) -> Result<Identity, ApiError>
where
    V: TokenValidator + ?Sized,
{
    let token = bearer_token(headers).inspect_err(|rejection| {
        tracing::warn!(
            namespace = %route.namespace,
            operation = %route.direction,
            reason = ?rejection,
            "Rejected request without usable credentials"
        );
    })?;

    tracing::debug!(token = %truncate_credential(token), "Bearer token received");

    let identity = validator.validate(token).await.map_err(|err| {
        tracing::warn!(
            namespace = %route.namespace,
            operation = %route.direction,
            kind = err.kind(),
            error = %err,
            "Token validation failed"
        );
        AuthRejection::InvalidToken
    })?;

    tracing::info!(
        subject = ?identity.subject,
        issuer = ?identity.issuer,
        audience = ?identity.audience,
        expires_at = ?identity.expires_at,
        namespace = %route.namespace,
        operation = %route.direction,
        "Token validated"
    );

    Ok(identity)
}
