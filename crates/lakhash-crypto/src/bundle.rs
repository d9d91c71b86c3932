//! Typed view over one key-derivation output
//!
//! A single KDF buffer is split into non-overlapping, named ranges. The
//! offsets are part of the wire format: changing an output length or a range
//! breaks every envelope written before.
//!
//! | Layout   | Length | StreamSeed | BlockKey | MacKey   | RecordKey |
//! |----------|--------|------------|----------|----------|-----------|
//! | File     | 416    | 0..64      | 64..96   | 96..224  | 224..416  |
//! | Metadata | 224    | 0..64      | 64..96   | 96..224  |           |
//! | Record   | 192    | 0..64      | 64..96   | 96..192  |           |

use crate::{kdf, CryptoError, Result};
use std::ops::Range;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of the ratchet seed
pub const STREAM_SEED_SIZE: usize = 64;

/// Size of the record key carried at the tail of a file bundle
pub const RECORD_KEY_SIZE: usize = 192;

const STREAM_SEED: Range<usize> = 0..64;
const BLOCK_KEY: Range<usize> = 64..96;
const MAC_KEY_FROM: usize = 96;
const FILE_MAC_END: usize = 224;
const RECORD_KEY: Range<usize> = 224..416;

/// The slicing scheme applied to a key buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleLayout {
    /// 416 bytes, derived per file
    File,
    /// 224 bytes, derived per metadata string
    Metadata,
    /// 192 bytes, sliced from a [`RecordKey`] without a KDF call
    Record,
}

impl BundleLayout {
    /// Total buffer length for this layout
    pub fn output_len(self) -> usize {
        match self {
            Self::File => kdf::FILE_OUTPUT_LEN,
            Self::Metadata => kdf::METADATA_OUTPUT_LEN,
            Self::Record => RECORD_KEY_SIZE,
        }
    }

    fn mac_key_range(self) -> Range<usize> {
        match self {
            Self::File => MAC_KEY_FROM..FILE_MAC_END,
            Self::Metadata | Self::Record => MAC_KEY_FROM..self.output_len(),
        }
    }
}

/// Named ranges over one derived key buffer
pub struct KeyBundle {
    layout: BundleLayout,
    bytes: Zeroizing<Vec<u8>>,
}

impl KeyBundle {
    /// Wrap a buffer whose length must match `layout`
    pub fn from_bytes(layout: BundleLayout, bytes: Zeroizing<Vec<u8>>) -> Result<Self> {
        if bytes.len() != layout.output_len() {
            return Err(CryptoError::InvalidKey(format!(
                "{:?} bundle must be {} bytes, got {}",
                layout,
                layout.output_len(),
                bytes.len()
            )));
        }
        Ok(Self { layout, bytes })
    }

    /// Run the KDF for `layout` and wrap the result
    pub fn derive(
        layout: BundleLayout,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> Result<Self> {
        let bytes = kdf::derive(password, salt, iterations, layout.output_len())?;
        Self::from_bytes(layout, bytes)
    }

    /// The layout this bundle was built with
    pub fn layout(&self) -> BundleLayout {
        self.layout
    }

    /// Initial ratchet state for the stream layer
    pub fn stream_seed(&self) -> Zeroizing<[u8; STREAM_SEED_SIZE]> {
        let mut seed = Zeroizing::new([0u8; STREAM_SEED_SIZE]);
        seed.copy_from_slice(&self.bytes[STREAM_SEED]);
        seed
    }

    /// Serpent-256 key for the CBC layer
    pub fn block_key(&self) -> &[u8] {
        &self.bytes[BLOCK_KEY]
    }

    /// HMAC-SHA-512 key (128 bytes for file/metadata, 96 for record)
    pub fn mac_key(&self) -> &[u8] {
        &self.bytes[self.layout.mac_key_range()]
    }

    /// The record key tail, present only on file bundles
    pub fn record_key(&self) -> Option<RecordKey> {
        match self.layout {
            BundleLayout::File => {
                let mut key = [0u8; RECORD_KEY_SIZE];
                key.copy_from_slice(&self.bytes[RECORD_KEY]);
                Some(RecordKey { bytes: key })
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for KeyBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBundle")
            .field("layout", &self.layout)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Single-use key binding one file's tag to its metadata
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RecordKey {
    bytes: [u8; RECORD_KEY_SIZE],
}

impl RecordKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "record key must be {} bytes, got {}",
                RECORD_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; RECORD_KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; RECORD_KEY_SIZE] {
        &self.bytes
    }

    /// Slice this key into a record-layout bundle
    pub fn bundle(&self) -> KeyBundle {
        KeyBundle {
            layout: BundleLayout::Record,
            bytes: Zeroizing::new(self.bytes.to_vec()),
        }
    }
}

impl std::fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecordKey([REDACTED])")
    }
}
