//! Portable f32 vector encoding.
//!
//! Vectors are stored as little-endian f32 byte blobs, base64-encoded so they
//! fit in a JSON document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Convert an f32 slice to a byte blob for storage.
pub fn f32_slice_to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a byte blob back to an f32 vector.
///
/// Returns `None` when the blob length is not a multiple of four.
pub fn blob_to_f32_vec(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Encode a vector as a base64 blob string.
pub fn encode_vector(v: &[f32]) -> String {
    STANDARD.encode(f32_slice_to_blob(v))
}

/// Decode a base64 blob string back into a vector.
pub fn decode_vector(s: &str) -> Option<Vec<f32>> {
    let bytes = STANDARD.decode(s).ok()?;
    blob_to_f32_vec(&bytes)
}

/// `#[serde(with = "...")]` adapter for a list of embedding vectors.
pub mod vectors {
    use super::{
        Deserialize, Deserializer, Error, Serialize, Serializer, decode_vector, encode_vector,
    };

    /// Serialize as a list of base64 blobs.
    pub fn serialize<S: Serializer>(vectors: &[Vec<f32>], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = vectors.iter().map(|v| encode_vector(v)).collect();
        encoded.serialize(serializer)
    }

    /// Deserialize from a list of base64 blobs.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<f32>>, D::Error> {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .enumerate()
            .map(|(i, s)| {
                decode_vector(s).ok_or_else(|| D::Error::custom(format!("invalid embedding blob at index {i}")))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    #[test]
    fn blob_roundtrip_f32() {
        let original = vec![1.0_f32, -2.5, 3.125, 0.0];
        let blob = f32_slice_to_blob(&original);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_f32_vec(&blob), Some(original));
    }

    #[test]
    fn blob_rejects_ragged_length() {
        assert_eq!(blob_to_f32_vec(&[0, 1, 2]), None);
    }

    #[test]
    fn base64_roundtrip_512d() {
        let original: Vec<f32> = (0..512).map(|i| i as f32 * 0.001).collect();
        let encoded = encode_vector(&original);
        assert_eq!(decode_vector(&encoded), Some(original));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_vector("not base64!!"), None);
    }

    #[test]
    fn empty_vector_encodes_empty() {
        assert_eq!(encode_vector(&[]), "");
        assert_eq!(decode_vector(""), Some(vec![]));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_blobs_decode_by_length(blob in proptest::collection::vec(any::<u8>(), 0..64)) {
                match blob_to_f32_vec(&blob) {
                    Some(v) => {
                        prop_assert_eq!(blob.len() % 4, 0);
                        prop_assert_eq!(v.len(), blob.len() / 4);
                        prop_assert_eq!(f32_slice_to_blob(&v), blob);
                    }
                    None => prop_assert_ne!(blob.len() % 4, 0),
                }
            }
        }
    }
}
