//! Codec server application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use payload_codec_auth::TokenValidator;
use payload_codec_core::CodecRegistry;

use crate::config::ServerConfig;

/// Shared application state for the codec server.
///
/// Nothing in here is mutated after startup, so handlers read it without locks.
pub struct ServerState<V>
where
    V: TokenValidator,
{
    /// Namespace to codec chain mapping.
    pub registry: Arc<CodecRegistry>,
    /// The bearer token validator.
    pub validator: Arc<V>,
    /// Server configuration.
    pub config: ServerConfig,
}

impl<V> ServerState<V>
where
    V: TokenValidator,
{
    /// Create a new server state.
    #[must_use]
    pub fn new(registry: Arc<CodecRegistry>, validator: Arc<V>, config: ServerConfig) -> Self {
        Self {
            registry,
            validator,
            config,
        }
    }
}

impl<V> Clone for ServerState<V>
where
    V: TokenValidator,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            validator: Arc::clone(&self.validator),
            config: self.config.clone(),
        }
    }
}
