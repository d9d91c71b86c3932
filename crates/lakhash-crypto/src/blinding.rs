//! Credential blinding: (identity, passphrase) to opaque backend credentials
//!
//! The backend only ever sees a synthetic username and password. Both are
//! reproduced deterministically at every sign-in, together with the master
//! secret and the iteration count carried into the session.

use crate::block::{BlockCipher, BLOCK_SIZE};
use crate::kdf::{self, BLINDING_OUTPUT_LEN};
use crate::session::{MasterSecret, SessionContext};
use crate::Result;
use sha2::{Digest, Sha512};
use tracing::debug;
use whirlpool::Whirlpool;

/// Fixed domain appended to the synthetic username
pub const USERNAME_SUFFIX: &str = "@notanemail.com";

/// Lower bound of the identity-dependent Argon2id iteration count
pub const BASE_ITERATIONS: u32 = 7000;

const ITERATION_SPREAD: u32 = 50001;
const SALT_RANGE: std::ops::Range<usize> = 24..48;
const ITERATION_BYTES_FROM: usize = 16;
const CREDENTIAL_KEY: std::ops::Range<usize> = 32..64;
const MASTER_SECRET_FROM: usize = 64;

/// Identity-dependent KDF parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlindingParams {
    /// `Whirlpool(SHA-512(identity))[24..48]`
    pub salt: [u8; 24],
    /// Argon2id passes for the sign-in derivation
    pub kdf_iterations: u32,
}

impl BlindingParams {
    /// Compute the salt and iteration count for `identity`
    pub fn for_identity(identity: &str) -> Self {
        let hash = identity_hash(identity);

        let mut salt = [0u8; 24];
        salt.copy_from_slice(&hash[SALT_RANGE]);

        let sum: u32 = hash[ITERATION_BYTES_FROM..].iter().map(|&b| u32::from(b)).sum();
        let kdf_iterations = BASE_ITERATIONS + (3 * sum) % ITERATION_SPREAD;

        Self {
            salt,
            kdf_iterations,
        }
    }
}

/// Everything produced by one sign-in
#[derive(Clone)]
pub struct BlindedCredentials {
    username: String,
    password: String,
    kdf_iterations: u32,
    master_secret: MasterSecret,
}

impl BlindedCredentials {
    /// Synthetic backend username, `[a-z]{16}@notanemail.com`
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Synthetic backend password, 32 lowercase hex characters
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Argon2id passes used for the sign-in derivation
    pub fn kdf_iterations(&self) -> u32 {
        self.kdf_iterations
    }

    /// Iteration count carried into the session
    pub fn session_iterations(&self) -> u32 {
        self.kdf_iterations.saturating_sub(BASE_ITERATIONS)
    }

    /// The 272-byte master secret
    pub fn master_secret(&self) -> &MasterSecret {
        &self.master_secret
    }

    /// Display fingerprint of the master secret
    pub fn fingerprint(&self) -> String {
        self.master_secret.fingerprint()
    }

    /// Build the session context for `identity`
    pub fn into_session(self, identity: impl Into<String>) -> SessionContext {
        let iterations = self.session_iterations();
        SessionContext::new(self.master_secret, identity, iterations)
    }
}

impl std::fmt::Debug for BlindedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlindedCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("kdf_iterations", &self.kdf_iterations)
            .field("master_secret", &self.master_secret)
            .finish()
    }
}

/// Blind `identity` and `passphrase` with the identity-derived parameters.
///
/// Runs Argon2id with at least 7000 passes; expect seconds of CPU time.
pub fn blind(identity: &str, passphrase: &str) -> Result<BlindedCredentials> {
    blind_with(identity, passphrase, &BlindingParams::for_identity(identity))
}

/// Blind with explicit parameters
pub fn blind_with(
    identity: &str,
    passphrase: &str,
    params: &BlindingParams,
) -> Result<BlindedCredentials> {
    debug!(iterations = params.kdf_iterations, "blinding credentials");

    let password_input = zeroize::Zeroizing::new(format!("{identity}{passphrase}"));
    let derived = kdf::derive(
        password_input.as_bytes(),
        &params.salt,
        params.kdf_iterations,
        BLINDING_OUTPUT_LEN,
    )?;

    let cipher = BlockCipher::new(&derived[CREDENTIAL_KEY])?;

    let mut password_block = xor_halves(&derived[..2 * BLOCK_SIZE]);
    cipher.encrypt_block(&mut password_block);

    let second_hash = Whirlpool::digest(identity_hash(identity));
    let mut username_block = xor_halves(&second_hash[..2 * BLOCK_SIZE]);
    cipher.encrypt_block(&mut username_block);

    let mut username: String = username_block
        .iter()
        .map(|&b| char::from(b'a' + b % 26))
        .collect();
    username.push_str(USERNAME_SUFFIX);

    Ok(BlindedCredentials {
        username,
        password: hex::encode(password_block),
        kdf_iterations: params.kdf_iterations,
        master_secret: MasterSecret::from_bytes(&derived[MASTER_SECRET_FROM..])?,
    })
}

fn identity_hash(identity: &str) -> [u8; 64] {
    let digest = Whirlpool::digest(Sha512::digest(identity.as_bytes()));
    let mut hash = [0u8; 64];
    hash.copy_from_slice(&digest);
    hash
}

fn xor_halves(bytes: &[u8]) -> [u8; BLOCK_SIZE] {
    let mut out = [0u8; BLOCK_SIZE];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = bytes[i] ^ bytes[i + BLOCK_SIZE];
    }
    out
}
