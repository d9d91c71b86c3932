//! Key derivation: Argon2id with fixed cost parameters and variable output length
//!
//! Every encryption call derives a fresh buffer from the master secret and a
//! random salt. The buffer is later sliced positionally by [`crate::bundle`].

use crate::{CryptoError, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use tracing::debug;
use zeroize::Zeroizing;

/// Argon2id memory cost in KiB
pub const MEMORY_COST_KIB: u32 = 512;

/// Argon2id lane count
pub const PARALLELISM: u32 = 1;

/// Salt size prepended to every envelope (256 bits)
pub const SALT_SIZE: usize = 32;

/// Output length of a file-level derivation
pub const FILE_OUTPUT_LEN: usize = 416;

/// Output length of a metadata-level derivation
pub const METADATA_OUTPUT_LEN: usize = 224;

/// Output length of a credential-blinding derivation
pub const BLINDING_OUTPUT_LEN: usize = 336;

/// Generate a fresh random salt for one encryption call
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::RngCore::fill_bytes(&mut OsRng, &mut salt);
    salt
}

/// Derive `output_len` bytes from `password` and `salt` with Argon2id v0x13.
///
/// Deterministic for identical inputs. This is the expensive step of every
/// pipeline call and should not run on an async executor thread.
pub fn derive(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let params = Params::new(MEMORY_COST_KIB, iterations, PARALLELISM, Some(output_len))
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid Argon2id params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    debug!(iterations, output_len, "deriving key material");

    let mut output = Zeroizing::new(vec![0u8; output_len]);
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2id failed: {e}")))?;

    Ok(output)
}
