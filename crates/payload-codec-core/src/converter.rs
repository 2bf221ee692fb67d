//! Value to payload conversion through a codec chain.
//!
//! Workflow starters and workers use a `DataConverter` so that their inputs
//! and results leave the process already encoded by the same chain the codec
//! server applies, and are decoded transparently on the way back.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::CodecChain;
use crate::error::ConvertError;
use crate::payload::{Payload, METADATA_ENCODING};

/// `encoding` metadata value for JSON payloads.
pub const JSON_ENCODING: &[u8] = b"json/plain";

/// Converts serializable values to encoded payloads and back.
#[derive(Debug, Clone, Default)]
pub struct DataConverter {
    chain: CodecChain,
}

impl DataConverter {
    /// Create a converter that runs payloads through `chain`.
    #[must_use]
    pub const fn new(chain: CodecChain) -> Self {
        Self { chain }
    }

    /// The chain applied to converted payloads.
    #[must_use]
    pub const fn chain(&self) -> &CodecChain {
        &self.chain
    }

    /// Serialize values to JSON payloads and encode them.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be serialized or the chain fails.
    pub fn to_payloads<T: Serialize>(&self, values: &[T]) -> Result<Vec<Payload>, ConvertError> {
        let payloads = values
            .iter()
            .map(|value| {
                let data = serde_json::to_vec(value)?;
                Ok::<_, ConvertError>(
                    Payload::new(data).with_metadata(METADATA_ENCODING, JSON_ENCODING),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.chain.encode(payloads)?)
    }

    /// Decode payloads and deserialize each one from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain fails, a payload is not JSON-encoded, or
    /// its data does not deserialize into `T`.
    pub fn from_payloads<T: DeserializeOwned>(
        &self,
        payloads: Vec<Payload>,
    ) -> Result<Vec<T>, ConvertError> {
        self.chain
            .decode(payloads)?
            .iter()
            .map(|payload| match payload.encoding() {
                Some(JSON_ENCODING) => Ok(serde_json::from_slice(payload.data())?),
                other => Err(ConvertError::UnsupportedEncoding(
                    other.map_or_else(
                        || "<none>".to_string(),
                        |e| String::from_utf8_lossy(e).into_owned(),
                    ),
                )),
            })
            .collect()
    }
}
