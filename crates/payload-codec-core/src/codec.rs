//! The codec stage abstraction and ordered codec chains.

use std::fmt;
use std::sync::Arc;

use crate::error::{ChainError, CodecError, Result};
use crate::payload::Payload;

/// Which way a batch travels through a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Apply each stage's forward transform.
    Encode,
    /// Apply each stage's reverse transform.
    Decode,
}

impl Direction {
    /// Lowercase name, as used in routes and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reversible transform over a batch of payloads.
///
/// Implementations must be stateless with respect to individual calls so a
/// single instance can serve concurrent requests, and must return exactly one
/// output payload per input payload, in order.
pub trait PayloadCodec: Send + Sync {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Forward transform.
    ///
    /// # Errors
    ///
    /// Returns an error if any payload cannot be transformed.
    fn encode(&self, payloads: &[Payload]) -> Result<Vec<Payload>>;

    /// Reverse transform.
    ///
    /// # Errors
    ///
    /// Returns an error if any payload cannot be transformed.
    fn decode(&self, payloads: &[Payload]) -> Result<Vec<Payload>>;
}

/// An ordered, immutable sequence of codec stages.
///
/// Both directions run the stages in declared order; decoding calls each
/// stage's reverse transform rather than reversing the stage order.
#[derive(Clone, Default)]
pub struct CodecChain {
    stages: Vec<Arc<dyn PayloadCodec>>,
}

impl CodecChain {
    /// Create a chain from its stages.
    #[must_use]
    pub fn new(stages: Vec<Arc<dyn PayloadCodec>>) -> Self {
        Self { stages }
    }

    /// Create a chain with a single stage.
    #[must_use]
    pub fn single(stage: impl PayloadCodec + 'static) -> Self {
        Self {
            stages: vec![Arc::new(stage)],
        }
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain is the identity transform.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in order.
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|stage| stage.name())
    }

    /// Run the batch through every stage in `direction`.
    ///
    /// The first failing stage aborts the chain; nothing from a partial run is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns a [`ChainError`] naming the failing stage.
    pub fn apply(
        &self,
        direction: Direction,
        payloads: Vec<Payload>,
    ) -> std::result::Result<Vec<Payload>, ChainError> {
        let mut current = payloads;

        for (stage, codec) in self.stages.iter().enumerate() {
            let fail = |source: CodecError| ChainError {
                stage,
                codec: codec.name().to_string(),
                source,
            };

            let next = match direction {
                Direction::Encode => codec.encode(&current),
                Direction::Decode => codec.decode(&current),
            }
            .map_err(fail)?;

            if next.len() != current.len() {
                return Err(fail(CodecError::BatchLength {
                    expected: current.len(),
                    actual: next.len(),
                }));
            }

            current = next;
        }

        Ok(current)
    }

    /// Shorthand for [`apply`](Self::apply) with [`Direction::Encode`].
    ///
    /// # Errors
    ///
    /// Returns a [`ChainError`] naming the failing stage.
    pub fn encode(&self, payloads: Vec<Payload>) -> std::result::Result<Vec<Payload>, ChainError> {
        self.apply(Direction::Encode, payloads)
    }

    /// Shorthand for [`apply`](Self::apply) with [`Direction::Decode`].
    ///
    /// # Errors
    ///
    /// Returns a [`ChainError`] naming the failing stage.
    pub fn decode(&self, payloads: Vec<Payload>) -> std::result::Result<Vec<Payload>, ChainError> {
        self.apply(Direction::Decode, payloads)
    }
}

impl fmt::Debug for CodecChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}
