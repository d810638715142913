use crate::error::{Error, Result};

/// Get the bincode configuration used for every stored value
fn get_config() -> impl bincode::config::Config {
    // Fixed-width integers keep the metadata prefix readable across versions.
    // Limit allocation to prevent memory exhaustion on corrupt data
    bincode::config::legacy().with_limit::<{ 16 * 1024 * 1024 }>() // 16MB limit
}

/// Serialize a record or metadata value for storage in a snapshot
///
/// # Errors
///
/// Returns [`Error::Serialization`] if encoding fails
pub fn serialize<T: serde::Serialize>(data: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(data, get_config())
        .map_err(|e| Error::Serialization(format!("encode: {e}")))
}

/// Deserialize a value read from a snapshot
///
/// # Errors
///
/// Returns [`Error::Serialization`] if:
/// - The bytes are truncated or malformed
/// - Trailing bytes remain after the value
pub fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (result, bytes_read) = bincode::serde::decode_from_slice(bytes, get_config())
        .map_err(|e| Error::Serialization(format!("decode: {e}")))?;
    if bytes_read != bytes.len() {
        return Err(Error::Serialization(format!(
            "decode: {} trailing bytes",
            bytes.len() - bytes_read
        )));
    }
    Ok(result)
}

/// Decode only the leading value of `bytes`, ignoring whatever follows.
///
/// Used to read the format version before committing to a full decode.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the prefix cannot be decoded
pub fn deserialize_prefix<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::serde::decode_from_slice(bytes, get_config())
        .map(|(value, _)| value)
        .map_err(|e| Error::Serialization(format!("decode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestStruct {
        id: u32,
        name: String,
        data: Option<[u8; 4]>,
    }

    #[test]
    fn test_serialize_deserialize() -> anyhow::Result<()> {
        let original = TestStruct {
            id: 42,
            name: "test".to_string(),
            data: Some([1, 2, 3, 4]),
        };

        let serialized = serialize(&original)?;
        let deserialized: TestStruct = deserialize(&serialized)?;

        assert_eq!(original, deserialized);
        Ok(())
    }

    #[test]
    fn test_truncated_input_is_serialization_error() -> anyhow::Result<()> {
        let serialized = serialize(&TestStruct {
            id: 1,
            name: "truncated".to_string(),
            data: None,
        })?;

        let result: Result<TestStruct> = deserialize(&serialized[..serialized.len() - 3]);
        assert!(matches!(result, Err(Error::Serialization(_))));
        Ok(())
    }

    #[test]
    fn test_trailing_bytes_rejected() -> anyhow::Result<()> {
        let mut serialized = serialize(&7u32)?;
        serialized.push(0xff);

        let result: Result<u32> = deserialize(&serialized);
        assert!(matches!(result, Err(Error::Serialization(_))));
        Ok(())
    }
}
