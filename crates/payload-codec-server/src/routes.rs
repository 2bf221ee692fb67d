//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

use payload_codec_auth::TokenValidator;

use crate::error::ApiError;
use crate::handlers::codec;
use crate::resolve::NAMESPACE_HEADER;
use crate::state::ServerState;

/// Create the codec server router with all routes and middleware.
///
/// # Routes
///
/// - `POST /encode` - Encode with the `X-Namespace` chain (default `default`)
/// - `POST /decode` - Decode with the `X-Namespace` chain
/// - `POST /:namespace/encode` - Encode with the namespace's chain
/// - `POST /:namespace/decode` - Decode with the namespace's chain
///
/// Every other path is a JSON `404`. When a console origin is configured,
/// CORS is enabled and `OPTIONS` requests are answered with an empty `200`.
pub fn create_router<V>(state: ServerState<V>) -> Router
where
    V: TokenValidator + 'static,
{
    // Extract config values before moving state
    let web_origin = state
        .config
        .web_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok());
    let max_body_bytes = state.config.max_body_bytes;

    let state = Arc::new(state);

    let router = Router::new()
        .route("/encode", any(codec::encode::<V>))
        .route("/decode", any(codec::decode::<V>))
        .route("/:namespace/encode", any(codec::namespace_encode::<V>))
        .route("/:namespace/decode", any(codec::namespace_decode::<V>))
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    let router = match web_origin {
        Some(origin) => router
            .layer(middleware::from_fn(answer_preflight))
            .layer(build_cors_layer(origin)),
        None => router,
    };

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}

/// Build the CORS layer for the workflow console origin.
#[must_use]
pub fn build_cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(NAMESPACE_HEADER),
        ])
        .allow_methods([Method::POST, Method::OPTIONS])
}

/// Request span carrying method, path and the requested namespace.
fn request_span(request: &Request) -> tracing::Span {
    let namespace = request
        .headers()
        .get(NAMESPACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        namespace = %namespace,
    )
}

async fn answer_preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
