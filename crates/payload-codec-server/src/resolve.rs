//! Request to codec chain resolution.
//!
//! A request names its namespace either in the path (`/{namespace}/encode`)
//! or, on the bare `/encode` and `/decode` routes, in the `X-Namespace`
//! header. Resolution happens before authentication.

use std::sync::Arc;

use axum::http::HeaderMap;

use payload_codec_core::{CodecChain, CodecRegistry, Direction, DEFAULT_NAMESPACE};

use crate::error::ApiError;

/// Header selecting the namespace on the bare codec routes.
pub const NAMESPACE_HEADER: &str = "x-namespace";

/// The chain a request will run, and for which namespace.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// Namespace the request addressed.
    pub namespace: String,
    /// Whether to encode or decode.
    pub direction: Direction,
    /// The namespace's chain.
    pub chain: Arc<CodecChain>,
}

impl ResolvedRoute {
    /// Resolve a namespace embedded in the request path.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the namespace is not registered.
    pub fn from_path(
        registry: &CodecRegistry,
        namespace: &str,
        direction: Direction,
    ) -> Result<Self, ApiError> {
        lookup(registry, namespace, direction)
    }

    /// Resolve the namespace named by the `X-Namespace` header.
    ///
    /// An absent or empty header selects the default namespace.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the namespace is not registered or
    /// the header is not valid UTF-8.
    pub fn from_header(
        registry: &CodecRegistry,
        headers: &HeaderMap,
        direction: Direction,
    ) -> Result<Self, ApiError> {
        let namespace = match headers.get(NAMESPACE_HEADER) {
            None => DEFAULT_NAMESPACE,
            Some(value) => value.to_str().map_err(|_| {
                tracing::warn!(operation = %direction, "X-Namespace header is not valid UTF-8");
                ApiError::NotFound
            })?,
        };

        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };

        lookup(registry, namespace, direction)
    }
}

fn lookup(
    registry: &CodecRegistry,
    namespace: &str,
    direction: Direction,
) -> Result<ResolvedRoute, ApiError> {
    let Some(chain) = registry.resolve(namespace) else {
        tracing::warn!(
            namespace = %namespace,
            operation = %direction,
            available = ?registry.namespaces(),
            "No codec chain found for namespace"
        );
        return Err(ApiError::NotFound);
    };

    Ok(ResolvedRoute {
        namespace: namespace.to_string(),
        direction,
        chain,
    })
}
