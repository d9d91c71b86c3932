//! Hex transport codec
//!
//! Ciphertext is sliced at fixed byte offsets and each slice is stored as a
//! lowercase hex string. Chunks carry no length or checksum of their own; the
//! total length is tracked in the container record.

use crate::{Result, StoreError, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

/// Configuration for the chunker
#[derive(Clone, Debug)]
pub struct ChunkerConfig {
    /// Size of each chunk in raw bytes (before hex encoding)
    pub chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkerConfig {
    /// Create with a custom chunk size
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(StoreError::Configuration(format!(
                "chunk size must be between 1 and {} bytes",
                MAX_CHUNK_SIZE
            )));
        }
        Ok(Self { chunk_size })
    }
}

/// Splits ciphertext into hex chunks and joins them back
#[derive(Clone, Debug, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Get the configured chunk size
    pub fn chunk_size(&self) -> usize {
        self.config.chunk_size
    }

    /// Split into ordered lowercase hex chunks
    pub fn split(&self, data: &[u8]) -> Vec<String> {
        data.chunks(self.config.chunk_size).map(hex::encode).collect()
    }

    /// Number of chunks `len` bytes occupy
    pub fn chunk_count(&self, len: u64) -> u64 {
        calculate_chunk_count(len, self.config.chunk_size)
    }

    /// Decode and concatenate chunks in the given order
    pub fn join<S: AsRef<str>>(&self, chunks: &[S]) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(chunks.len() * self.config.chunk_size);
        for chunk in chunks {
            data.extend_from_slice(&decode_chunk(chunk.as_ref())?);
        }
        Ok(data)
    }

    /// Join and check the result against the recorded shape.
    ///
    /// Every chunk but the last must be exactly `chunk_size` bytes and the
    /// total must equal `expected_len`, which catches missing, truncated and
    /// most reordered chunks.
    pub fn join_exact<S: AsRef<str>>(&self, chunks: &[S], expected_len: u64) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let last = chunks.len().saturating_sub(1);

        for (index, chunk) in chunks.iter().enumerate() {
            let bytes = decode_chunk(chunk.as_ref())?;
            if index < last && bytes.len() != self.config.chunk_size {
                return Err(StoreError::LengthMismatch {
                    expected: self.config.chunk_size as u64,
                    actual: bytes.len() as u64,
                });
            }
            data.extend_from_slice(&bytes);
        }

        if data.len() as u64 != expected_len {
            return Err(StoreError::LengthMismatch {
                expected: expected_len,
                actual: data.len() as u64,
            });
        }
        Ok(data)
    }
}

/// Decode one hex chunk
pub fn decode_chunk(chunk: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(chunk)?)
}

/// Calculate the number of chunks for a given size
pub fn calculate_chunk_count(size: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_split_uses_lowercase_hex() {
        let chunker = Chunker::with_config(ChunkerConfig::with_chunk_size(2).unwrap());
        let chunks = chunker.split(&[0xAB, 0xCD, 0xEF]);
        assert_eq!(chunks, vec!["abcd".to_string(), "ef".to_string()]);
    }

    #[test]
    fn test_default_chunk_size() {
        let chunker = Chunker::new();
        assert_eq!(chunker.chunk_size(), 16384);
        let data = vec![1u8; 16384 * 2 + 1];
        let chunks = chunker.split(&data);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 32768);
        assert_eq!(chunks[2], "01");
    }

    #[test]
    fn test_split_empty() {
        assert!(Chunker::new().split(&[]).is_empty());
        assert!(Chunker::new().join::<String>(&[]).unwrap().is_empty());
    }

    #[rstest]
    #[case(0, 16384, 0)]
    #[case(1, 16384, 1)]
    #[case(16384, 16384, 1)]
    #[case(16385, 16384, 2)]
    #[case(100, 0, 0)]
    fn test_calculate_chunk_count(#[case] size: u64, #[case] chunk: usize, #[case] expected: u64) {
        assert_eq!(calculate_chunk_count(size, chunk), expected);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            ChunkerConfig::with_chunk_size(0),
            Err(StoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_join_rejects_malformed_hex() {
        let result = Chunker::new().join(&["zz"]);
        assert!(matches!(result, Err(StoreError::MalformedChunk(_))));
    }

    #[test]
    fn test_join_exact_detects_missing_and_reordered_chunks() {
        let chunker = Chunker::with_config(ChunkerConfig::with_chunk_size(4).unwrap());
        let data: Vec<u8> = (0..10).collect();
        let chunks = chunker.split(&data);

        assert_eq!(chunker.join_exact(&chunks, 10).unwrap(), data);

        let missing = [chunks[0].clone(), chunks[2].clone()];
        assert!(matches!(
            chunker.join_exact(&missing, 10),
            Err(StoreError::LengthMismatch { .. })
        ));

        let reordered = [chunks[2].clone(), chunks[0].clone(), chunks[1].clone()];
        assert!(matches!(
            chunker.join_exact(&reordered, 10),
            Err(StoreError::LengthMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    proptest! {
        #[test]
        fn prop_split_join_preserves_bytes(
            data in prop::collection::vec(any::<u8>(), 0..5000),
            chunk_size in 1usize..2048,
        ) {
            let chunker = Chunker::with_config(ChunkerConfig::with_chunk_size(chunk_size).unwrap());
            let chunks = chunker.split(&data);
            prop_assert_eq!(chunks.len() as u64, chunker.chunk_count(data.len() as u64));
            prop_assert_eq!(chunker.join_exact(&chunks, data.len() as u64).unwrap(), data);
        }
    }
}
