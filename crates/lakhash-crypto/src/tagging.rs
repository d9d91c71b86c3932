//! HMAC-SHA-512 tags, fed in bounded chunks

use crate::progress::{Reporter, Stage};
use crate::{CryptoError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Size of a tag (512 bits)
pub const TAG_SIZE: usize = 64;

/// Bytes fed to the MAC per progress step (256 KiB)
pub const MAC_CHUNK_SIZE: usize = 256 * 1024;

/// Compute a tag over the concatenation of `parts`
pub fn compute(key: &[u8], parts: &[&[u8]], reporter: &Reporter) -> Result<[u8; TAG_SIZE]> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKey(format!("HMAC key: {e}")))?;

    let total: u64 = parts.iter().map(|p| p.len() as u64).sum();
    let mut processed = 0u64;
    for part in parts {
        for chunk in part.chunks(MAC_CHUNK_SIZE) {
            mac.update(chunk);
            processed += chunk.len() as u64;
            reporter.report(Stage::Tagging, processed, total);
        }
    }

    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// Full-length, constant-time tag comparison
pub fn tags_match(expected: &[u8], actual: &[u8]) -> bool {
    expected.len() == actual.len() && bool::from(expected.ct_eq(actual))
}
