//! ChaCha20-Poly1305 encryption codec.
//!
//! Each payload is serialized whole, encrypted under a random 12-byte nonce,
//! and stored as `nonce || ciphertext`. The key id travels in metadata so a
//! decoder can refuse payloads sealed with a key it does not hold.

use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use crate::codec::PayloadCodec;
use crate::error::{CodecError, Result};
use crate::payload::{Payload, METADATA_ENCODING};
use crate::wire;

/// `encoding` metadata value for encrypted payloads.
pub const ENCRYPTED_ENCODING: &[u8] = b"binary/encrypted";

/// Metadata key carrying the id of the key a payload was sealed with.
pub const METADATA_ENCRYPTION_KEY_ID: &str = "encryption-key-id";

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Encrypts each payload with a single named key.
pub struct EncryptionCodec {
    key_id: String,
    cipher: ChaCha20Poly1305,
}

impl EncryptionCodec {
    /// Create a codec from a raw 32-byte key.
    #[must_use]
    pub fn new(key_id: impl Into<String>, key: &[u8; KEY_LEN]) -> Self {
        Self {
            key_id: key_id.into(),
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Create a codec from a hex-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidKey`] if the string is not 64 hex characters.
    pub fn from_hex(key_id: impl Into<String>, key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(key_hex.trim()).map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            CodecError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", bytes.len()))
        })?;
        Ok(Self::new(key_id, &key))
    }

    /// Id of the key this codec seals with.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    fn seal(&self, payload: &Payload) -> Result<Payload> {
        let plaintext = wire::to_bytes(payload)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| CodecError::Encryption(e.to_string()))?;

        let mut data = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        data.extend_from_slice(&nonce);
        data.extend_from_slice(&ciphertext);

        Ok(Payload::new(data)
            .with_metadata(METADATA_ENCODING, ENCRYPTED_ENCODING)
            .with_metadata(METADATA_ENCRYPTION_KEY_ID, self.key_id.as_bytes()))
    }

    fn open(&self, payload: &Payload) -> Result<Payload> {
        if payload.encoding() != Some(ENCRYPTED_ENCODING) {
            return Ok(payload.clone());
        }

        let key_id = payload
            .metadata_value(METADATA_ENCRYPTION_KEY_ID)
            .unwrap_or_default();
        if key_id != self.key_id.as_bytes() {
            return Err(CodecError::UnknownKey(
                String::from_utf8_lossy(key_id).into_owned(),
            ));
        }

        let data = payload.data();
        if data.len() < NONCE_LEN {
            return Err(CodecError::Decryption("ciphertext too short".to_string()));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CodecError::Decryption(e.to_string()))?;

        wire::from_bytes(&plaintext)
    }
}

impl fmt::Debug for EncryptionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionCodec")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl PayloadCodec for EncryptionCodec {
    fn name(&self) -> &str {
        "encryption"
    }

    fn encode(&self, payloads: &[Payload]) -> Result<Vec<Payload>> {
        payloads.iter().map(|p| self.seal(p)).collect()
    }

    fn decode(&self, payloads: &[Payload]) -> Result<Vec<Payload>> {
        payloads.iter().map(|p| self.open(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn codec() -> EncryptionCodec {
        EncryptionCodec::from_hex("test-key", KEY_HEX).unwrap()
    }

    #[test]
    fn round_trip() {
        let codec = codec();
        assert_eq!(codec.key_id(), "test-key");
        let original = vec![
            Payload::new(b"secret".to_vec()).with_metadata(METADATA_ENCODING, b"json/plain".to_vec()),
            Payload::default(),
        ];

        let sealed = codec.encode(&original).unwrap();
        assert_eq!(sealed[0].encoding(), Some(ENCRYPTED_ENCODING));
        assert_eq!(
            sealed[0].metadata_value(METADATA_ENCRYPTION_KEY_ID),
            Some(&b"test-key"[..])
        );
        assert!(!sealed[0].data().windows(6).any(|w| w == b"secret"));

        assert_eq!(codec.decode(&sealed).unwrap(), original);
    }

    #[test]
    fn nonces_differ_per_payload() {
        let codec = codec();
        let payload = Payload::new(b"same".to_vec());
        let sealed = codec.encode(&[payload.clone(), payload]).unwrap();

        assert_ne!(sealed[0].data(), sealed[1].data());
    }

    #[test]
    fn rejects_foreign_key_id() {
        let sealed = codec().encode(&[Payload::new(b"x".to_vec())]).unwrap();
        let other = EncryptionCodec::new("other-key", &[7u8; 32]);

        assert!(matches!(
            other.decode(&sealed),
            Err(CodecError::UnknownKey(id)) if id == "test-key"
        ));
    }

    #[test]
    fn rejects_tampered_or_short_ciphertext() {
        let codec = codec();
        let sealed = codec.encode(&[Payload::new(b"x".to_vec())]).unwrap();

        let (metadata, mut data) = sealed[0].clone().into_parts();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        let tampered = Payload::from_parts(metadata.clone(), data);
        assert!(matches!(
            codec.decode(&[tampered]),
            Err(CodecError::Decryption(_))
        ));

        let short = Payload::from_parts(metadata, vec![1, 2, 3]);
        assert!(matches!(
            codec.decode(&[short]),
            Err(CodecError::Decryption(_))
        ));
    }

    #[test]
    fn rejects_bad_key_material() {
        assert!(EncryptionCodec::from_hex("k", "zz").is_err());
        assert!(EncryptionCodec::from_hex("k", "0011").is_err());
    }
}
