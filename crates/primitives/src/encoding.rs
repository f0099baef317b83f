//! Base64url encoding of binary protocol fields.
//!
//! Every binary field on the wire (owners, signatures, ids, chunk bodies and
//! data paths) is base64url without padding. Decoding tolerates trailing `=`.

use alloy_primitives::B256;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;

const B256_LEN: usize = 32;

/// Errors decoding wire-encoded values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input is not valid base64url
    #[error("invalid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded value has the wrong length
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Encode bytes as unpadded base64url.
#[inline]
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded (or padded) base64url.
pub fn decode(input: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(URL_SAFE_NO_PAD.decode(input.trim_end_matches('='))?)
}

/// Decode a base64url string that must hold exactly 32 bytes.
pub fn decode_b256(input: &str) -> Result<B256, EncodingError> {
    let bytes = decode(input)?;
    if bytes.len() != B256_LEN {
        return Err(EncodingError::InvalidLength {
            expected: B256_LEN,
            actual: bytes.len(),
        });
    }
    Ok(B256::from_slice(&bytes))
}

/// Serde adapter for [`bytes::Bytes`] as base64url.
#[cfg(feature = "serde")]
pub mod b64 {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serialize as unpadded base64url.
    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(value))
    }

    /// Deserialize from base64url.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        super::decode(&s).map(Bytes::from).map_err(D::Error::custom)
    }
}

/// Serde adapter for [`B256`] as base64url.
#[cfg(feature = "serde")]
pub mod b64_b256 {
    use alloy_primitives::B256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serialize as unpadded base64url.
    pub fn serialize<S: Serializer>(value: &B256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(value))
    }

    /// Deserialize from base64url, requiring exactly 32 bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<B256, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        super::decode_b256(&s).map_err(D::Error::custom)
    }
}

/// Serde adapter for integers carried as decimal strings.
#[cfg(feature = "serde")]
pub mod decimal {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serialize as a decimal string.
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    /// Deserialize from a decimal string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_unpadded_and_url_safe() {
        assert_eq!(encode([0xfbu8, 0xff]), "-_8");
        assert_eq!(encode(b""), "");
    }

    #[test]
    fn test_decode_accepts_padding() {
        assert_eq!(decode("-_8=").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_b256_length() {
        let value = B256::repeat_byte(0xab);
        assert_eq!(decode_b256(&encode(value)).unwrap(), value);
        assert!(matches!(
            decode_b256(&encode([1u8; 31])),
            Err(EncodingError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not base64!"), Err(EncodingError::Base64(_))));
    }
}
