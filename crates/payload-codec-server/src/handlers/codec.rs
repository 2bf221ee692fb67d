//! Encode and decode endpoints.
//!
//! All four routes funnel into [`dispatch`], which checks in order:
//! credentials, method, body, then runs the chain. Namespace resolution has
//! already happened by the time a handler calls it.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use payload_codec_auth::TokenValidator;
use payload_codec_core::{Direction, PayloadEnvelope};

use crate::auth::{authenticate, truncate_credential};
use crate::error::ApiError;
use crate::resolve::ResolvedRoute;
use crate::state::ServerState;

/// `/encode`, namespace from `X-Namespace`.
pub async fn encode<V>(
    State(state): State<Arc<ServerState<V>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError>
where
    V: TokenValidator + 'static,
{
    let route = ResolvedRoute::from_header(&state.registry, &headers, Direction::Encode)?;
    dispatch(&state, &method, &uri, &headers, body, route).await
}

/// `/decode`, namespace from `X-Namespace`.
pub async fn decode<V>(
    State(state): State<Arc<ServerState<V>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError>
where
    V: TokenValidator + 'static,
{
    let route = ResolvedRoute::from_header(&state.registry, &headers, Direction::Decode)?;
    dispatch(&state, &method, &uri, &headers, body, route).await
}

/// `/{namespace}/encode`.
pub async fn namespace_encode<V>(
    State(state): State<Arc<ServerState<V>>>,
    Path(namespace): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError>
where
    V: TokenValidator + 'static,
{
    let route = ResolvedRoute::from_path(&state.registry, &namespace, Direction::Encode)?;
    dispatch(&state, &method, &uri, &headers, body, route).await
}

/// `/{namespace}/decode`.
pub async fn namespace_decode<V>(
    State(state): State<Arc<ServerState<V>>>,
    Path(namespace): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError>
where
    V: TokenValidator + 'static,
{
    let route = ResolvedRoute::from_path(&state.registry, &namespace, Direction::Decode)?;
    dispatch(&state, &method, &uri, &headers, body, route).await
}

/// Authenticate, validate and run a request through its resolved chain.
///
/// The response body is fully serialized before it is returned, so a failure
/// never produces a partial envelope.
async fn dispatch<V>(
    state: &ServerState<V>,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
    route: ResolvedRoute,
) -> Result<Response, ApiError>
where
    V: TokenValidator + 'static,
{
    let start = Instant::now();

    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        tracing::debug!(
            method = %method,
            path = %uri.path(),
            namespace = %route.namespace,
            operation = %route.direction,
            auth = %truncate_credential(auth),
            "Processing codec request"
        );
    }

    authenticate(state.validator.as_ref(), headers, &route).await?;

    if *method != Method::POST {
        tracing::warn!(method = %method, operation = %route.direction, "Invalid method for codec operation");
        return Err(ApiError::MethodNotAllowed);
    }

    let body = body.map_err(|rejection| {
        tracing::warn!(operation = %route.direction, error = %rejection, "Failed to read request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest("Failed to read request body")
        }
    })?;

    let envelope: PayloadEnvelope = serde_json::from_slice(&body).map_err(|err| {
        tracing::warn!(operation = %route.direction, error = %err, "Failed to decode request body");
        ApiError::BadRequest("Invalid JSON in request body")
    })?;

    let count = envelope.payloads.len();
    tracing::debug!(payloads = count, operation = %route.direction, "Applying codec chain");

    let ResolvedRoute {
        namespace,
        direction,
        chain,
    } = route;

    let payloads = tokio::task::spawn_blocking(move || chain.apply(direction, envelope.payloads))
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "Codec task failed");
            ApiError::Internal
        })?
        .map_err(|err| {
            tracing::error!(
                namespace = %namespace,
                operation = %direction,
                stage = err.stage,
                codec = %err.codec,
                error = %err.source,
                "Codec error"
            );
            ApiError::Codec
        })?;

    let body = serde_json::to_vec(&PayloadEnvelope::new(payloads)).map_err(|err| {
        tracing::error!(operation = %direction, error = %err, "Failed to encode response");
        ApiError::Internal
    })?;

    tracing::info!(
        namespace = %namespace,
        operation = %direction,
        payloads = count,
        elapsed = ?start.elapsed(),
        "Processed codec request"
    );

    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}
