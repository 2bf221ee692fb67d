//! HTTP codec server for workflow payloads.
//!
//! The workflow console and CLI send payload batches here to be encoded or
//! decoded with the chain registered for a namespace. This crate handles:
//!
//! - Namespace resolution from the path or the `X-Namespace` header
//! - Bearer token validation against a remote JWKS
//! - Running codec chains on the blocking thread pool
//! - CORS for the console, TLS, and request limits
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Workflow console / CLI                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  POST {"payloads": [...]}
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    payload-codec-server                     │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Resolve    │ │  Authorize  │ │  Dispatch           │    │
//! │  │  namespace  │ │  bearer JWT │ │  (spawn_blocking)   │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!        ┌──────────────┐             ┌──────────────┐
//!        │ Codec chains │             │ JWKS issuer  │
//!        │ (core)       │             │ (auth)       │
//!        └──────────────┘             └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use payload_codec_server::{create_router, ServerConfig, ServerState};
//! use payload_codec_auth::JwksValidator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let registry = Arc::new(config.build_registry()?);
//! let validator = Arc::new(JwksValidator::new(config.auth_config())?);
//!
//! let app = create_router(ServerState::new(registry, validator, config.clone()));
//! payload_codec_server::server::run(&config, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod resolve;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ConfigError, ServerArgs, ServerConfig};
pub use error::{ApiError, AuthRejection};
pub use resolve::{ResolvedRoute, NAMESPACE_HEADER};
pub use routes::create_router;
pub use server::ServerError;
pub use state::ServerState;
