//! Error types for codecs, chains and the namespace registry.

use thiserror::Error;

/// A result type using `CodecError`.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised by a single codec stage.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Compressing a payload failed.
    #[error("compression failed: {0}")]
    Compression(String),

    /// Decompressing a payload failed.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Encrypting a payload failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decrypting a payload failed (bad key, tampered or truncated data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The payload was encrypted with a key this codec does not hold.
    #[error("unknown encryption key: {0}")]
    UnknownKey(String),

    /// Key material could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A nested payload could not be decoded from its wire form.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A nested payload could not be written to its wire form.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A stage returned a batch of a different length than it was given.
    #[error("batch length changed: expected {expected}, got {actual}")]
    BatchLength {
        /// Number of payloads handed to the stage.
        expected: usize,
        /// Number of payloads the stage returned.
        actual: usize,
    },
}

/// A codec chain aborted at one of its stages.
#[derive(Debug, Error)]
#[error("codec '{codec}' at stage {stage} failed: {source}")]
pub struct ChainError {
    /// Zero-based index of the failing stage.
    pub stage: usize,
    /// Name of the failing codec.
    pub codec: String,
    /// The stage's error.
    #[source]
    pub source: CodecError,
}

/// Errors raised while building a [`CodecRegistry`](crate::CodecRegistry).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The namespace was already registered.
    #[error("namespace already registered: {0}")]
    DuplicateNamespace(String),

    /// The namespace is empty or contains characters that cannot appear in a path segment.
    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),
}

/// Errors raised by the [`DataConverter`](crate::DataConverter).
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The value could not be written to or read from JSON.
    #[error("json conversion failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The codec chain rejected the batch.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The decoded payload carries an encoding this converter does not read.
    #[error("unsupported payload encoding: {0}")]
    UnsupportedEncoding(String),
}
