//! Session capability: the master secret and its cost factor
//!
//! A [`SessionContext`] is built once at sign-in and handed explicitly to
//! every pipeline call. It is read-only; nothing in the crate stores it.

use crate::{CryptoError, Result};
use sha2::{Digest, Sha512};
use whirlpool::Whirlpool;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the master secret
pub const MASTER_SECRET_SIZE: usize = 272;

/// Length of the folded fingerprint
const FINGERPRINT_BYTES: usize = 8;

/// The 272-byte secret every file and metadata key is derived from
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret {
    bytes: [u8; MASTER_SECRET_SIZE],
}

impl MasterSecret {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != MASTER_SECRET_SIZE {
            return Err(CryptoError::InvalidMasterSecret {
                expected: MASTER_SECRET_SIZE,
                actual: bytes.len(),
            });
        }
        let mut secret = [0u8; MASTER_SECRET_SIZE];
        secret.copy_from_slice(bytes);
        Ok(Self { bytes: secret })
    }

    /// Get the secret bytes
    pub fn as_bytes(&self) -> &[u8; MASTER_SECRET_SIZE] {
        &self.bytes
    }

    /// Short display fingerprint, `xxxx-xxxx-xxxx-xxxx`.
    ///
    /// `Whirlpool(SHA-512(secret))` XOR-folded in halves down to 8 bytes.
    pub fn fingerprint(&self) -> String {
        let digest = Whirlpool::digest(Sha512::digest(self.bytes));
        let mut folded = digest.to_vec();
        while folded.len() > FINGERPRINT_BYTES {
            let half = folded.len() / 2;
            let (front, back) = folded.split_at(half);
            folded = front.iter().zip(back).map(|(a, b)| a ^ b).collect();
        }

        let rendered = hex::encode(&folded);
        rendered
            .as_bytes()
            .chunks(4)
            .map(|group| String::from_utf8_lossy(group).into_owned())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret([REDACTED])")
    }
}

/// Read-only context passed to every pipeline call
#[derive(Clone, Debug)]
pub struct SessionContext {
    master_secret: MasterSecret,
    identity: String,
    iterations: u32,
}

impl SessionContext {
    /// Create a new session context
    pub fn new(master_secret: MasterSecret, identity: impl Into<String>, iterations: u32) -> Self {
        Self {
            master_secret,
            identity: identity.into(),
            iterations,
        }
    }

    /// The master secret used as KDF password
    pub fn master_secret(&self) -> &MasterSecret {
        &self.master_secret
    }

    /// The signed-in identity
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Iteration count carried from sign-in
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Argon2id iterations used by each pipeline call: `round(100 + n / 11)`
    pub fn pipeline_iterations(&self) -> u32 {
        rescale_iterations(self.iterations)
    }
}

/// `round(100 + n / 11)` in integer arithmetic. `n / 11` never has a
/// fractional part of exactly one half, so rounding direction is unambiguous.
pub fn rescale_iterations(iterations: u32) -> u32 {
    100 + iterations.saturating_add(5) / 11
}
