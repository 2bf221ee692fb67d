//! Payload records and the JSON envelope exchanged with the workflow console.
//!
//! On the wire a payload looks like the protobuf-JSON form of a workflow
//! engine payload: binary values are standard base64 strings.
//!
//! ```json
//! {"payloads": [{"metadata": {"encoding": "anNvbi9wbGFpbg=="}, "data": "eyJhIjoxfQ=="}]}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata key naming how a payload's data is encoded.
pub const METADATA_ENCODING: &str = "encoding";

/// An opaque binary record plus metadata.
///
/// Payloads are immutable; codecs build new payloads instead of editing them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(
        default,
        with = "base64_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    metadata: BTreeMap<String, Vec<u8>>,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    data: Vec<u8>,
}

impl Payload {
    /// Create a payload with the given data and no metadata.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            metadata: BTreeMap::new(),
            data: data.into(),
        }
    }

    /// Create a payload from its metadata and data.
    #[must_use]
    pub fn from_parts(metadata: BTreeMap<String, Vec<u8>>, data: Vec<u8>) -> Self {
        Self { metadata, data }
    }

    /// Return this payload with an additional metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The payload data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// All metadata entries.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.metadata
    }

    /// A single metadata value.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&[u8]> {
        self.metadata.get(key).map(Vec::as_slice)
    }

    /// The `encoding` metadata value, if any.
    #[must_use]
    pub fn encoding(&self) -> Option<&[u8]> {
        self.metadata_value(METADATA_ENCODING)
    }

    /// Split the payload into its metadata and data.
    #[must_use]
    pub fn into_parts(self) -> (BTreeMap<String, Vec<u8>>, Vec<u8>) {
        (self.metadata, self.data)
    }
}

/// Request and response body of the encode/decode endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadEnvelope {
    /// The payload batch, in order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub payloads: Vec<Payload>,
}

impl PayloadEnvelope {
    /// Wrap a batch.
    #[must_use]
    pub const fn new(payloads: Vec<Payload>) -> Self {
        Self { payloads }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

mod base64_bytes {
    use base64::prelude::*;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => BASE64_STANDARD.decode(encoded).map_err(D::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

mod base64_map {
    use std::collections::BTreeMap;

    use base64::prelude::*;
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            out.serialize_entry(key, &BASE64_STANDARD.encode(value))?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let Some(encoded) = Option::<BTreeMap<String, String>>::deserialize(deserializer)? else {
            return Ok(BTreeMap::new());
        };
        encoded
            .into_iter()
            .map(|(key, value)| {
                BASE64_STANDARD
                    .decode(value)
                    .map(|bytes| (key, bytes))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_console_envelope() {
        let body = r#"{"payloads":[{"metadata":{"encoding":"anNvbi9wbGFpbg=="},"data":"eyJhIjoxfQ=="}]}"#;
        let envelope: PayloadEnvelope = serde_json::from_str(body).unwrap();

        assert_eq!(envelope.payloads.len(), 1);
        let payload = &envelope.payloads[0];
        assert_eq!(payload.encoding(), Some(&b"json/plain"[..]));
        assert_eq!(payload.data(), br#"{"a":1}"#);
    }

    #[test]
    fn missing_and_null_fields_are_empty() {
        let envelope: PayloadEnvelope =
            serde_json::from_str(r#"{"payloads":[{"data":"AA=="},{"metadata":null}]}"#).unwrap();
        assert_eq!(envelope.payloads[0], Payload::new(vec![0u8]));
        assert_eq!(envelope.payloads[1], Payload::default());

        let envelope: PayloadEnvelope = serde_json::from_str(r#"{"payloads":null}"#).unwrap();
        assert!(envelope.payloads.is_empty());

        let envelope: PayloadEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.payloads.is_empty());
    }

    #[test]
    fn serializes_base64_and_omits_empty_fields() {
        let envelope = PayloadEnvelope::new(vec![
            Payload::new(b"hi".to_vec()).with_metadata(METADATA_ENCODING, b"binary/plain".to_vec()),
            Payload::default(),
        ]);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "payloads": [
                    {"metadata": {"encoding": "YmluYXJ5L3BsYWlu"}, "data": "aGk="},
                    {}
                ]
            })
        );
    }

    #[test]
    fn rejects_invalid_base64() {
        let result = serde_json::from_str::<PayloadEnvelope>(r#"{"payloads":[{"data":"%%%"}]}"#);
        assert!(result.is_err());
    }
}
