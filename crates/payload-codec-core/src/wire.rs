//! Binary wire form used when a codec wraps a whole payload.
//!
//! Wrapping codecs (compression, encryption) serialize the incoming payload,
//! metadata included, into a CBOR map and transform those bytes. Unwrapping
//! restores the original metadata exactly.

use std::collections::BTreeMap;

use ciborium::Value;

use crate::error::{CodecError, Result};
use crate::payload::Payload;

const METADATA_FIELD: &str = "metadata";
const DATA_FIELD: &str = "data";

/// Serialize a payload to its CBOR wire form.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the CBOR writer fails.
pub fn to_bytes(payload: &Payload) -> Result<Vec<u8>> {
    let metadata = payload
        .metadata()
        .iter()
        .map(|(key, value)| (Value::Text(key.clone()), Value::Bytes(value.clone())))
        .collect();

    let value = Value::Map(vec![
        (Value::Text(METADATA_FIELD.to_string()), Value::Map(metadata)),
        (
            Value::Text(DATA_FIELD.to_string()),
            Value::Bytes(payload.data().to_vec()),
        ),
    ]);

    let mut buf = Vec::new();
    ciborium::into_writer(&value, &mut buf)
        .map_err(|e| CodecError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Parse a payload from its CBOR wire form.
///
/// # Errors
///
/// Returns [`CodecError::MalformedPayload`] if the bytes are not a payload map.
pub fn from_bytes(bytes: &[u8]) -> Result<Payload> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CodecError::MalformedPayload(e.to_string()))?;

    let Value::Map(entries) = value else {
        return Err(malformed("expected a map"));
    };

    let mut metadata = BTreeMap::new();
    let mut data = Vec::new();

    for (key, value) in entries {
        match (key.as_text(), value) {
            (Some(METADATA_FIELD), Value::Map(items)) => {
                for item in items {
                    match item {
                        (Value::Text(k), Value::Bytes(v)) => {
                            metadata.insert(k, v);
                        }
                        _ => return Err(malformed("metadata entries must be text to bytes")),
                    }
                }
            }
            (Some(DATA_FIELD), Value::Bytes(bytes)) => data = bytes,
            (field, _) => {
                return Err(malformed(&format!(
                    "unexpected field {}",
                    field.unwrap_or("<non-text>")
                )))
            }
        }
    }

    Ok(Payload::from_parts(metadata, data))
}

fn malformed(reason: &str) -> CodecError {
    CodecError::MalformedPayload(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_metadata_and_data() {
        let payload = Payload::new(b"hello".to_vec())
            .with_metadata("encoding", b"json/plain".to_vec())
            .with_metadata("messageType", b"Greeting".to_vec());

        let bytes = to_bytes(&payload).unwrap();
        assert_eq!(from_bytes(&bytes).unwrap(), payload);
    }

    #[test]
    fn rejects_non_payload_bytes() {
        assert!(from_bytes(b"not cbor at all").is_err());

        let mut buf = Vec::new();
        ciborium::into_writer(&Value::Integer(7.into()), &mut buf).unwrap();
        assert!(matches!(
            from_bytes(&buf),
            Err(CodecError::MalformedPayload(_))
        ));
    }
}
