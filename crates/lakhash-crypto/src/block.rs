//! Serpent-256 block primitive and the CBC layer built on it
//!
//! Envelope body layout: `EncIV(16) ‖ C1 ‖ … ‖ Cn`. The IV itself is never
//! stored; `EncIV` is its single-block encryption and the chain starts from
//! the plaintext IV (`C0 = IV`).
//!
//! Padding is applied to a short final block with the value `16 - len`. The
//! decoder treats an all-`0x10` final block as pure padding, which lets
//! [`PaddingPolicy::AlwaysPad`] envelopes stay readable by decoders that only
//! know [`PaddingPolicy::Legacy`].

use crate::{CryptoError, Result};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serpent::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use serpent::Serpent;

/// Cipher block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Required block key size (256 bits)
pub const BLOCK_KEY_SIZE: usize = 32;

const FULL_PAD_BYTE: u8 = BLOCK_SIZE as u8;

/// How the encoder handles block-aligned input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingPolicy {
    /// No padding block for aligned input. Bit-compatible with existing
    /// envelopes, but an aligned payload is misread by the padding check.
    Legacy,
    /// Append a full `0x10` block to aligned input
    #[default]
    AlwaysPad,
}

/// Whether the decoder runs the padding check on the final block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaddingCheck {
    /// Apply [`padding_consumed`] and report invalid padding
    Enforce,
    /// Return the final block as-is (fixed-size record tags)
    Skip,
}

/// Output of a CBC decryption
#[derive(Debug)]
pub struct CbcOpened {
    /// Recovered bytes; the final block is dropped when its padding is invalid
    pub data: Vec<u8>,
    /// The final block failed the padding rule
    pub invalid_padding: bool,
}

/// Keyed single-block permutation
pub struct BlockCipher {
    cipher: Serpent,
}

impl BlockCipher {
    /// Build from a 32-byte key
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != BLOCK_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "block key must be {} bytes, got {}",
                BLOCK_KEY_SIZE,
                key.len()
            )));
        }
        let cipher = Serpent::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKey("rejected Serpent key".to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt one block in place
    pub fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        self.cipher
            .encrypt_block(GenericArray::from_mut_slice(block.as_mut_slice()));
    }

    /// Decrypt one block in place
    pub fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        self.cipher
            .decrypt_block(GenericArray::from_mut_slice(block.as_mut_slice()));
    }
}

impl std::fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlockCipher([REDACTED])")
    }
}

/// Padding bytes to strip from a decrypted final block, or `None` when the
/// block does not carry valid padding.
pub fn padding_consumed(block: &[u8; BLOCK_SIZE]) -> Option<usize> {
    if block.iter().all(|&b| b == FULL_PAD_BYTE) {
        return Some(BLOCK_SIZE);
    }
    let value = block[BLOCK_SIZE - 1];
    if value == 0 || value > FULL_PAD_BYTE {
        return None;
    }
    let count = value as usize;
    block[BLOCK_SIZE - count..]
        .iter()
        .all(|&b| b == value)
        .then_some(count)
}

/// CBC-encrypt under a fresh random IV
pub fn cbc_encrypt(cipher: &BlockCipher, plaintext: &[u8], policy: PaddingPolicy) -> Vec<u8> {
    let mut iv = [0u8; BLOCK_SIZE];
    rand::RngCore::fill_bytes(&mut OsRng, &mut iv);
    cbc_encrypt_with_iv(cipher, &iv, plaintext, policy)
}

pub(crate) fn cbc_encrypt_with_iv(
    cipher: &BlockCipher,
    iv: &[u8; BLOCK_SIZE],
    plaintext: &[u8],
    policy: PaddingPolicy,
) -> Vec<u8> {
    let aligned = plaintext.len() % BLOCK_SIZE == 0;
    let extra = if aligned && policy == PaddingPolicy::AlwaysPad { 2 } else { 1 };
    let mut out = Vec::with_capacity((plaintext.len() / BLOCK_SIZE + extra) * BLOCK_SIZE);

    let mut enc_iv = *iv;
    cipher.encrypt_block(&mut enc_iv);
    out.extend_from_slice(&enc_iv);

    let mut previous = *iv;
    let mut chain = |block: &mut [u8; BLOCK_SIZE], out: &mut Vec<u8>| {
        for (b, p) in block.iter_mut().zip(previous.iter()) {
            *b ^= p;
        }
        cipher.encrypt_block(block);
        previous = *block;
        out.extend_from_slice(block);
    };

    let mut chunks = plaintext.chunks_exact(BLOCK_SIZE);
    for chunk in &mut chunks {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(chunk);
        chain(&mut block, &mut out);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut block = [(BLOCK_SIZE - tail.len()) as u8; BLOCK_SIZE];
        block[..tail.len()].copy_from_slice(tail);
        chain(&mut block, &mut out);
    } else if policy == PaddingPolicy::AlwaysPad {
        let mut block = [FULL_PAD_BYTE; BLOCK_SIZE];
        chain(&mut block, &mut out);
    }

    out
}

/// CBC-decrypt `EncIV ‖ blocks`.
///
/// Fails only when the input is not a whole number of blocks or lacks the
/// encrypted IV; bad padding is reported in [`CbcOpened::invalid_padding`].
pub fn cbc_decrypt(cipher: &BlockCipher, envelope: &[u8], check: PaddingCheck) -> Result<CbcOpened> {
    if envelope.len() < BLOCK_SIZE || envelope.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertext(format!(
            "CBC input must be the encrypted IV plus whole {}-byte blocks, got {} bytes",
            BLOCK_SIZE,
            envelope.len()
        )));
    }

    let mut previous = [0u8; BLOCK_SIZE];
    previous.copy_from_slice(&envelope[..BLOCK_SIZE]);
    cipher.decrypt_block(&mut previous);

    let body = &envelope[BLOCK_SIZE..];
    let block_count = body.len() / BLOCK_SIZE;
    let mut data = Vec::with_capacity(body.len());
    let mut invalid_padding = false;

    for (index, chunk) in body.chunks_exact(BLOCK_SIZE).enumerate() {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        for (b, p) in block.iter_mut().zip(previous.iter()) {
            *b ^= p;
        }
        previous.copy_from_slice(chunk);

        if index + 1 < block_count || check == PaddingCheck::Skip {
            data.extend_from_slice(&block);
            continue;
        }

        match padding_consumed(&block) {
            Some(count) => data.extend_from_slice(&block[..BLOCK_SIZE - count]),
            None => invalid_padding = true,
        }
    }

    Ok(CbcOpened {
        data,
        invalid_padding,
    })
}
