//! Listener setup for plain HTTP and HTTPS.
//!
//! Both listeners stop as soon as Ctrl-C is received; in-flight requests are
//! dropped rather than drained.

use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;

use crate::config::{ServerConfig, TlsConfig};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The certificate chain could not be loaded.
    #[error("failed to load TLS certificate {}: {message}", path.display())]
    Certificate {
        /// Certificate file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The private key could not be loaded.
    #[error("failed to load TLS private key {}: {message}", path.display())]
    PrivateKey {
        /// Key file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// rustls rejected the certificate/key pair.
    #[error("invalid TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Listen address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The plain HTTP server failed.
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Build the rustls server configuration from PEM files.
///
/// # Errors
///
/// Returns an error if either file is unreadable, the certificate file holds
/// no certificates, or rustls rejects the pair.
pub fn load_tls_config(tls: &TlsConfig) -> Result<rustls::ServerConfig, ServerError> {
    let certs = load_certs(&tls.cert_path)?;
    let key = PrivateKeyDer::from_pem_file(&tls.key_path).map_err(|e| ServerError::PrivateKey {
        path: tls.key_path.clone(),
        message: e.to_string(),
    })?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let error = |message: String| ServerError::Certificate {
        path: path.to_path_buf(),
        message,
    };

    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| error(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| error(e.to_string()))?;

    if certs.is_empty() {
        return Err(error("no certificates found".to_string()));
    }
    Ok(certs)
}

/// Serve `app` until Ctrl-C.
///
/// TLS material is loaded before the listener is bound, so bad certificates
/// fail startup without opening the port.
///
/// # Errors
///
/// Returns an error if TLS material cannot be loaded, the address cannot be
/// bound, or the plain HTTP server fails.
pub async fn run(config: &ServerConfig, app: Router) -> Result<(), ServerError> {
    let acceptor = config
        .tls
        .as_ref()
        .map(load_tls_config)
        .transpose()?
        .map(|tls| TlsAcceptor::from(Arc::new(tls)));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    match acceptor {
        Some(acceptor) => {
            tracing::info!(%addr, "Starting HTTPS server");
            tokio::select! {
                () = serve_tls(listener, acceptor, app) => {}
                () = shutdown_signal() => {}
            }
        }
        None => {
            tracing::info!(%addr, "Starting HTTP server");
            tokio::select! {
                result = axum::serve(listener, app).into_future() => result.map_err(ServerError::Serve)?,
                () = shutdown_signal() => {}
            }
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn serve_tls(listener: TcpListener, acceptor: TlsAcceptor, app: Router) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to accept connection");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let app = app.clone();

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::debug!(%peer, error = %err, "TLS handshake failed");
                    return;
                }
            };

            let service = TowerToHyperService::new(app);
            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%peer, error = %err, "Connection closed with error");
            }
        });
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(err) => {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
