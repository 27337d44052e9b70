//! CBOR codec for message payloads.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::CodecError;

/// Encode a value into CBOR bytes.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<Bytes, CodecError> {
    let mut vec = Vec::new();
    ciborium::ser::into_writer(value, &mut vec)?;
    Ok(Bytes::from(vec))
}

/// Decode CBOR bytes into a value.
///
/// # Errors
///
/// Returns an error if the data is not valid CBOR for `T`.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    Ok(ciborium::de::from_reader(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        id: u32,
        name: String,
    }

    #[test]
    fn test_decode_error() {
        let result: Result<Probe, _> = decode(&[0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(CodecError::DeserializationFailed(_))));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        #[derive(Serialize)]
        struct Partial {
            id: u32,
        }

        let encoded = encode(&Partial { id: 1 }).unwrap();
        assert!(decode::<Probe>(&encoded).is_err());
    }
}
