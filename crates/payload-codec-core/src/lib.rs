//! Core payload and codec types for payload-codec.
//!
//! This crate provides the pieces the codec server and workflow clients share:
//!
//! - **Payloads**: opaque binary records with metadata, and the JSON envelope
//!   the workflow console exchanges with the server
//! - **Codecs**: the [`PayloadCodec`] stage trait, ordered [`CodecChain`]s and
//!   concrete stages for compression and encryption
//! - **Registry**: the startup-time mapping from namespace to chain
//!
//! # Example
//!
//! ```
//! use payload_codec_core::{CodecChain, CodecRegistry, Payload, ZstdCodec, DEFAULT_NAMESPACE};
//!
//! let registry = CodecRegistry::builder()
//!     .register(DEFAULT_NAMESPACE, CodecChain::single(ZstdCodec::new()))
//!     .unwrap()
//!     .build();
//!
//! let chain = registry.resolve(DEFAULT_NAMESPACE).unwrap();
//! let batch = vec![Payload::new(b"hello".to_vec())];
//!
//! let encoded = chain.encode(batch.clone()).unwrap();
//! assert_eq!(chain.decode(encoded).unwrap(), batch);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod compression;
pub mod converter;
pub mod encryption;
pub mod error;
pub mod payload;
pub mod registry;
pub mod wire;

pub use codec::{CodecChain, Direction, PayloadCodec};
pub use compression::{ZstdCodec, ZSTD_ENCODING};
pub use converter::{DataConverter, JSON_ENCODING};
pub use encryption::{EncryptionCodec, ENCRYPTED_ENCODING, METADATA_ENCRYPTION_KEY_ID};
pub use error::{ChainError, CodecError, ConvertError, RegistryError, Result};
pub use payload::{Payload, PayloadEnvelope, METADATA_ENCODING};
pub use registry::{CodecRegistry, CodecRegistryBuilder, DEFAULT_NAMESPACE};
