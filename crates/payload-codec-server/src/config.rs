//! Server configuration and command-line arguments.
//!
//! Every option can be given as a flag or through a `CODEC_*` environment
//! variable. Misconfiguration is reported as a [`ConfigError`] before the
//! listener starts.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use payload_codec_auth::{AuthConfig, DEFAULT_JWKS_URL};
use payload_codec_core::{
    CodecChain, CodecError, CodecRegistry, EncryptionCodec, RegistryError, ZstdCodec,
    DEFAULT_NAMESPACE,
};

/// Fatal startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Only one of the certificate and key was supplied.
    #[error("both --cert and --key must be provided together")]
    IncompleteTls,

    /// The console origin is not a valid header value.
    #[error("invalid console origin: {0:?}")]
    InvalidOrigin(String),

    /// A `--namespace` value could not be parsed.
    #[error("invalid namespace spec {0:?}: expected NAME or NAME=STAGE")]
    InvalidNamespaceSpec(String),

    /// A namespace names a stage that does not exist.
    #[error("unknown codec stage {0:?}: expected zstd or encryption")]
    UnknownStage(String),

    /// A namespace uses encryption but no key was configured.
    #[error("namespace {0} uses encryption but no encryption key is configured")]
    MissingEncryptionKey(String),

    /// The encryption key is malformed.
    #[error("invalid encryption key: {0}")]
    InvalidEncryptionKey(#[source] CodecError),

    /// The namespace registry rejected a namespace.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// The codec stage a namespace runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Zstandard compression.
    #[default]
    Zstd,
    /// ChaCha20-Poly1305 encryption with the configured key.
    Encryption,
}

impl FromStr for StageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "zstd" => Ok(Self::Zstd),
            "encryption" => Ok(Self::Encryption),
            other => Err(ConfigError::UnknownStage(other.to_string())),
        }
    }
}

/// A namespace and the stage its chain runs, written `NAME` or `NAME=STAGE`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamespaceSpec {
    /// Namespace name.
    pub name: String,
    /// Stage of the namespace's chain.
    #[serde(default)]
    pub stage: StageKind,
}

impl FromStr for NamespaceSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, stage) = match s.split_once('=') {
            Some((name, stage)) => (name.trim(), stage.parse()?),
            None => (s.trim(), StageKind::default()),
        };

        if name.is_empty() {
            return Err(ConfigError::InvalidNamespaceSpec(s.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            stage,
        })
    }
}

/// TLS certificate chain and private key, both PEM files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    /// Certificate chain path.
    pub cert_path: PathBuf,
    /// Private key path.
    pub key_path: PathBuf,
}

/// Hex-encoded encryption key. Never printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct EncryptionKey(String);

impl EncryptionKey {
    /// Wrap a hex-encoded key.
    #[must_use]
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Configuration for the codec server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on, on all interfaces.
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,

    /// Workflow console origin; enables CORS when set.
    #[serde(default)]
    pub web_origin: Option<String>,

    /// TLS material; plain HTTP when absent.
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Namespaces and their stages.
    #[serde(default = "ServerConfig::default_namespaces")]
    pub namespaces: Vec<NamespaceSpec>,

    /// Key for namespaces using the encryption stage.
    #[serde(default)]
    pub encryption_key: Option<EncryptionKey>,

    /// Id recorded in the metadata of encrypted payloads.
    #[serde(default = "ServerConfig::default_key_id")]
    pub encryption_key_id: String,

    /// JWKS document used to verify bearer tokens.
    #[serde(default = "ServerConfig::default_jwks_url")]
    pub jwks_url: String,

    /// Maximum request body size in bytes.
    #[serde(default = "ServerConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Largest decompressed size accepted for a single payload.
    #[serde(default = "ServerConfig::default_max_decoded")]
    pub max_decoded_bytes: usize,
}

impl ServerConfig {
    const fn default_port() -> u16 {
        8081
    }

    fn default_namespaces() -> Vec<NamespaceSpec> {
        vec![NamespaceSpec {
            name: DEFAULT_NAMESPACE.to_string(),
            stage: StageKind::Zstd,
        }]
    }

    fn default_key_id() -> String {
        "default".to_string()
    }

    fn default_jwks_url() -> String {
        DEFAULT_JWKS_URL.to_string()
    }

    const fn default_max_body() -> usize {
        4 * 1024 * 1024 // 4 MiB
    }

    const fn default_max_decoded() -> usize {
        4 * Self::default_max_body()
    }

    /// Address the listener binds.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Token validation settings.
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::with_jwks_url(self.jwks_url.clone())
    }

    /// Check values that cannot be expressed in the types.
    ///
    /// # Errors
    ///
    /// Returns an error if the console origin is not a valid header value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(origin) = &self.web_origin {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin(origin.clone()))?;
        }
        Ok(())
    }

    /// Build the namespace registry from the configured namespaces.
    ///
    /// # Errors
    ///
    /// Returns an error if a namespace is invalid or duplicated, or needs an
    /// encryption key that is missing or malformed.
    pub fn build_registry(&self) -> Result<CodecRegistry, ConfigError> {
        let mut builder = CodecRegistry::builder();

        for spec in &self.namespaces {
            let chain = match spec.stage {
                StageKind::Zstd => CodecChain::single(
                    ZstdCodec::new().with_max_decoded_bytes(self.max_decoded_bytes),
                ),
                StageKind::Encryption => {
                    let key = self
                        .encryption_key
                        .as_ref()
                        .ok_or_else(|| ConfigError::MissingEncryptionKey(spec.name.clone()))?;
                    let codec =
                        EncryptionCodec::from_hex(self.encryption_key_id.clone(), key.expose())
                            .map_err(ConfigError::InvalidEncryptionKey)?;
                    tracing::debug!(
                        namespace = %spec.name,
                        key_id = codec.key_id(),
                        "Configured encryption stage"
                    );
                    CodecChain::single(codec)
                }
            };
            builder = builder.register(spec.name.clone(), chain)?;
        }

        Ok(builder.build())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: Self::default_port(),
            web_origin: None,
            tls: None,
            namespaces: Self::default_namespaces(),
            encryption_key: None,
            encryption_key_id: Self::default_key_id(),
            jwks_url: Self::default_jwks_url(),
            max_body_bytes: Self::default_max_body(),
            max_decoded_bytes: Self::default_max_decoded(),
        }
    }
}

/// Command-line arguments of the codec server.
#[derive(Debug, Parser)]
#[command(name = "payload-codec-server", version, about = "Encode and decode workflow payloads per namespace")]
pub struct ServerArgs {
    /// Port to listen on.
    #[arg(long, env = "CODEC_PORT", default_value_t = ServerConfig::default_port())]
    pub port: u16,

    /// Workflow console URL. Enables CORS, which the console needs.
    #[arg(long, env = "CODEC_WEB_ORIGIN")]
    pub web: Option<String>,

    /// Path to the TLS certificate chain (enables HTTPS, requires --key).
    #[arg(long, env = "CODEC_TLS_CERT")]
    pub cert: Option<PathBuf>,

    /// Path to the TLS private key (requires --cert).
    #[arg(long, env = "CODEC_TLS_KEY")]
    pub key: Option<PathBuf>,

    /// Namespace to serve, as NAME or NAME=STAGE (zstd, encryption).
    #[arg(
        long = "namespace",
        env = "CODEC_NAMESPACES",
        value_delimiter = ',',
        default_value = DEFAULT_NAMESPACE
    )]
    pub namespaces: Vec<NamespaceSpec>,

    /// Hex-encoded 32-byte key for the encryption stage.
    #[arg(long, env = "CODEC_ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: Option<String>,

    /// Key id written into encrypted payloads.
    #[arg(long, env = "CODEC_ENCRYPTION_KEY_ID", default_value = "default")]
    pub encryption_key_id: String,

    /// JWKS document used to verify bearer tokens.
    #[arg(long, env = "CODEC_JWKS_URL", default_value = DEFAULT_JWKS_URL)]
    pub jwks_url: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "CODEC_MAX_BODY_BYTES", default_value_t = ServerConfig::default_max_body())]
    pub max_body_bytes: usize,

    /// Largest decompressed size accepted for a single zstd payload.
    #[arg(long, env = "CODEC_MAX_DECODED_BYTES", default_value_t = ServerConfig::default_max_decoded())]
    pub max_decoded_bytes: usize,
}

impl ServerArgs {
    /// Turn the arguments into a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if only one of `--cert`/`--key` is given or the
    /// console origin is invalid.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let tls = match (self.cert, self.key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path,
                key_path,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let config = ServerConfig {
            port: self.port,
            web_origin: self.web.filter(|origin| !origin.is_empty()),
            tls,
            namespaces: self.namespaces,
            encryption_key: self.encryption_key.map(EncryptionKey::new),
            encryption_key_id: self.encryption_key_id,
            jwks_url: self.jwks_url,
            max_body_bytes: self.max_body_bytes,
            max_decoded_bytes: self.max_decoded_bytes,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use payload_codec_core::Payload;

    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn parse(args: &[&str]) -> Result<ServerConfig, ConfigError> {
        let mut argv = vec!["payload-codec-server"];
        argv.extend_from_slice(args);
        ServerArgs::try_parse_from(argv).unwrap().into_config()
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8081);
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:8081");
        assert_eq!(config.jwks_url, DEFAULT_JWKS_URL);
        assert_eq!(config.max_body_bytes, 4 * 1024 * 1024);
        assert_eq!(config.max_decoded_bytes, 16 * 1024 * 1024);
        assert_eq!(config.namespaces, ServerConfig::default_namespaces());
        assert!(config.web_origin.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "namespaces": [{"name": "tenant-a"}]}"#)
                .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.namespaces[0].stage, StageKind::Zstd);
        assert_eq!(config.encryption_key_id, "default");
    }

    #[test]
    fn cli_defaults_match_config_defaults() {
        let config = parse(&[]).unwrap();
        let defaults = ServerConfig::default();
        assert_eq!(config.port, defaults.port);
        assert_eq!(config.namespaces, defaults.namespaces);
        assert_eq!(config.jwks_url, defaults.jwks_url);
        assert_eq!(config.max_body_bytes, defaults.max_body_bytes);
        assert_eq!(config.max_decoded_bytes, defaults.max_decoded_bytes);
    }

    #[test]
    fn tls_requires_both_files() {
        assert!(matches!(
            parse(&["--cert", "server.pem"]),
            Err(ConfigError::IncompleteTls)
        ));
        assert!(matches!(
            parse(&["--key", "server.key"]),
            Err(ConfigError::IncompleteTls)
        ));

        let config = parse(&["--cert", "server.pem", "--key", "server.key"]).unwrap();
        assert_eq!(
            config.tls,
            Some(TlsConfig {
                cert_path: "server.pem".into(),
                key_path: "server.key".into(),
            })
        );
    }

    #[test]
    fn rejects_invalid_origin() {
        assert!(matches!(
            parse(&["--web", "http://console\n.example"]),
            Err(ConfigError::InvalidOrigin(_))
        ));
        let config = parse(&["--web", "http://localhost:8233"]).unwrap();
        assert_eq!(config.web_origin.as_deref(), Some("http://localhost:8233"));
    }

    #[test]
    fn parses_namespace_specs() {
        let config = parse(&[
            "--namespace",
            "default,tenant-a.prod=encryption",
            "--namespace",
            "tenant-b=zstd",
        ])
        .unwrap();

        assert_eq!(
            config.namespaces,
            vec![
                NamespaceSpec {
                    name: "default".into(),
                    stage: StageKind::Zstd
                },
                NamespaceSpec {
                    name: "tenant-a.prod".into(),
                    stage: StageKind::Encryption
                },
                NamespaceSpec {
                    name: "tenant-b".into(),
                    stage: StageKind::Zstd
                },
            ]
        );
    }

    #[test]
    fn rejects_bad_namespace_specs() {
        assert!(matches!(
            "=zstd".parse::<NamespaceSpec>(),
            Err(ConfigError::InvalidNamespaceSpec(_))
        ));
        assert!(matches!(
            "tenant=gzip".parse::<NamespaceSpec>(),
            Err(ConfigError::UnknownStage(stage)) if stage == "gzip"
        ));
    }

    #[test]
    fn builds_registry_for_each_namespace() {
        let config = ServerConfig {
            namespaces: vec![
                "default".parse().unwrap(),
                "secure=encryption".parse().unwrap(),
            ],
            encryption_key: Some(EncryptionKey::new(KEY_HEX)),
            ..ServerConfig::default()
        };

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.namespaces(), vec!["default", "secure"]);
        let names: Vec<_> = registry
            .resolve("secure")
            .unwrap()
            .stage_names()
            .map(str::to_string)
            .collect();
        assert_eq!(names, vec!["encryption"]);
    }

    #[test]
    fn zstd_stage_uses_decoded_size_limit() {
        let config = parse(&["--max-decoded-bytes", "1024"]).unwrap();
        assert_eq!(config.max_decoded_bytes, 1024);

        let large = vec![Payload::new(vec![0u8; 64 * 1024])];
        let encoded = ServerConfig::default()
            .build_registry()
            .unwrap()
            .resolve(DEFAULT_NAMESPACE)
            .unwrap()
            .encode(large)
            .unwrap();

        let registry = config.build_registry().unwrap();
        let err = registry
            .resolve(DEFAULT_NAMESPACE)
            .unwrap()
            .decode(encoded)
            .unwrap_err();
        assert_eq!(err.codec, "zstd");
        assert!(matches!(err.source, CodecError::Decompression(_)));
    }

    #[test]
    fn encryption_namespace_needs_valid_key() {
        let mut config = ServerConfig {
            namespaces: vec!["secure=encryption".parse().unwrap()],
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::MissingEncryptionKey(ns)) if ns == "secure"
        ));

        config.encryption_key = Some(EncryptionKey::new("abcd"));
        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::InvalidEncryptionKey(_))
        ));
    }

    #[test]
    fn duplicate_namespace_is_fatal() {
        let config = ServerConfig {
            namespaces: vec!["default".parse().unwrap(), "default=zstd".parse().unwrap()],
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::Registry(RegistryError::DuplicateNamespace(_)))
        ));
    }

    #[test]
    fn key_is_redacted_in_debug() {
        let config = ServerConfig {
            encryption_key: Some(EncryptionKey::new(KEY_HEX)),
            ..ServerConfig::default()
        };
        assert!(!format!("{config:?}").contains(KEY_HEX));
    }
}
