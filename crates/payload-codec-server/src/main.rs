//! Payload Codec Server - JWT-gated encode/decode endpoint
//!
//! This is the main entry point for the codec server.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use a mock token validator that
//! doesn't require network access to the JWKS issuer.
//! Use tokens in format: `test-token:<subject>`

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(not(feature = "dev-mode"))]
use payload_codec_auth::JwksValidator;
#[cfg(feature = "dev-mode")]
use payload_codec_auth::MockTokenValidator;
use payload_codec_server::{create_router, server, ServerArgs, ServerState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,payload_codec=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Payload Codec Server");

    let config = ServerArgs::parse().into_config()?;

    tracing::info!(
        listen_addr = %config.listen_addr(),
        tls = config.tls.is_some(),
        web_origin = ?config.web_origin,
        max_body_bytes = config.max_body_bytes,
        max_decoded_bytes = config.max_decoded_bytes,
        "Server configuration loaded"
    );

    let registry = Arc::new(config.build_registry()?);
    for namespace in registry.namespaces() {
        let stages: Vec<String> = registry
            .resolve(namespace)
            .map(|chain| chain.stage_names().map(str::to_string).collect())
            .unwrap_or_default();
        tracing::info!(namespace, ?stages, "Registered namespace");
    }

    // Initialize token validator
    #[cfg(feature = "dev-mode")]
    let validator = {
        tracing::warn!("DEV MODE ENABLED - using mock token validator");
        tracing::warn!("Use tokens in format: test-token:<subject>");
        Arc::new(MockTokenValidator::default())
    };

    #[cfg(not(feature = "dev-mode"))]
    let validator = {
        let validator = JwksValidator::new(config.auth_config())?;
        tracing::info!(jwks_url = %validator.jwks().url(), "Token validator initialized");
        Arc::new(validator)
    };

    let state = ServerState::new(registry, validator, config.clone());
    let app = create_router(state);

    server::run(&config, app).await?;

    Ok(())
}
