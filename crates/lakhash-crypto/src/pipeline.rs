//! Authenticated pipeline: files, metadata strings and record tags
//!
//! Sealing composes the layers in a fixed order:
//!
//! 1. derive a key bundle from the master secret under a fresh salt
//! 2. `Tag = HMAC-SHA-512(MacKey, plaintext)`
//! 3. ratcheted ChaCha20 over `Tag ‖ plaintext`
//! 4. Serpent CBC over the stream output
//! 5. emit `Salt ‖ EncIV ‖ blocks`
//!
//! Opening walks the same steps backwards. Padding and tag problems are
//! returned as a [`Verdict`] next to whatever plaintext could be recovered;
//! only structurally impossible input is an error.

use crate::block::{self, BlockCipher, PaddingCheck, PaddingPolicy, BLOCK_SIZE};
use crate::bundle::{BundleLayout, KeyBundle, RecordKey};
use crate::kdf::{self, SALT_SIZE};
use crate::progress::{ProgressCallback, Reporter, Stage};
use crate::session::SessionContext;
use crate::stream;
use crate::tagging::{self, TAG_SIZE};
use crate::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

/// Size of an encrypted record tag: `EncIV ‖ 4 blocks`
pub const RECORD_TAG_ENVELOPE_SIZE: usize = BLOCK_SIZE + TAG_SIZE;

/// Hex length of a stored record tag
pub const RECORD_TAG_HEX_LEN: usize = RECORD_TAG_ENVELOPE_SIZE * 2;

/// Smallest envelope that can be opened: salt, encrypted IV and one block
pub const MIN_ENVELOPE_SIZE: usize = SALT_SIZE + 2 * BLOCK_SIZE;

/// Largest envelope sealing `plaintext_len` bytes can produce under either
/// padding policy
pub fn max_envelope_len(plaintext_len: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    let stream_len = plaintext_len.saturating_add(TAG_SIZE as u64);
    (SALT_SIZE as u64 + block)
        .saturating_add((stream_len / block).saturating_add(1).saturating_mul(block))
}

/// Non-fatal outcome flags of an open operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// The final CBC block failed the padding rule and was dropped
    pub invalid_padding: bool,
    /// The recovered tag does not match the recovered plaintext
    pub integrity_failed: bool,
}

impl Verdict {
    /// Neither flag is set
    pub fn is_clean(&self) -> bool {
        !self.invalid_padding && !self.integrity_failed
    }
}

/// Result of sealing a file
pub struct SealedFile {
    /// `Salt ‖ EncIV ‖ blocks`
    pub envelope: Vec<u8>,
    /// Tag over the plaintext, needed to build the record tag
    pub tag: [u8; TAG_SIZE],
    /// Single-use key for this file's record tag
    pub record_key: RecordKey,
}

impl std::fmt::Debug for SealedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedFile")
            .field("envelope_len", &self.envelope.len())
            .finish_non_exhaustive()
    }
}

/// Result of opening a file
pub struct OpenedFile {
    /// Recovered plaintext, returned even when integrity failed
    pub plaintext: Vec<u8>,
    /// Tag recovered from the stream window
    pub tag: [u8; TAG_SIZE],
    /// Record key re-derived from the envelope's salt
    pub record_key: RecordKey,
    /// Padding and integrity flags
    pub verdict: Verdict,
}

impl std::fmt::Debug for OpenedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedFile")
            .field("plaintext_len", &self.plaintext.len())
            .field("verdict", &self.verdict)
            .finish_non_exhaustive()
    }
}

/// Result of opening a metadata string
#[derive(Debug)]
pub struct OpenedMetadata {
    /// Recovered bytes
    pub plaintext: Vec<u8>,
    /// Padding and integrity flags
    pub verdict: Verdict,
}

struct Opened {
    plaintext: Vec<u8>,
    tag: [u8; TAG_SIZE],
    bundle: KeyBundle,
    verdict: Verdict,
}

/// Encryption pipeline configuration.
///
/// Holds no key material. The [`SessionContext`] is supplied on every call.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    padding: PaddingPolicy,
    reporter: Reporter,
}

impl Pipeline {
    /// Create a pipeline with the default padding policy and no progress
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CBC padding policy used when sealing
    pub fn with_padding_policy(mut self, padding: PaddingPolicy) -> Self {
        self.padding = padding;
        self
    }

    /// Report progress to `callback`
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.reporter = Reporter::new(callback);
        self
    }

    /// The padding policy used when sealing
    pub fn padding_policy(&self) -> PaddingPolicy {
        self.padding
    }

    /// Seal a file under a 416-byte bundle
    pub fn encrypt_file(&self, session: &SessionContext, plaintext: &[u8]) -> Result<SealedFile> {
        let (envelope, tag, bundle) = self.seal(session, BundleLayout::File, plaintext)?;
        let record_key = bundle
            .record_key()
            .ok_or_else(|| CryptoError::InvalidKey("file bundle without record key".into()))?;
        Ok(SealedFile {
            envelope,
            tag,
            record_key,
        })
    }

    /// Open a file envelope
    pub fn decrypt_file(&self, session: &SessionContext, envelope: &[u8]) -> Result<OpenedFile> {
        let opened = self.open(session, BundleLayout::File, envelope)?;
        let record_key = opened
            .bundle
            .record_key()
            .ok_or_else(|| CryptoError::InvalidKey("file bundle without record key".into()))?;
        Ok(OpenedFile {
            plaintext: opened.plaintext,
            tag: opened.tag,
            record_key,
            verdict: opened.verdict,
        })
    }

    /// Seal a short metadata string under a 224-byte bundle
    pub fn encrypt_metadata(&self, session: &SessionContext, plaintext: &[u8]) -> Result<Vec<u8>> {
        let (envelope, _, _) = self.seal(session, BundleLayout::Metadata, plaintext)?;
        Ok(envelope)
    }

    /// Open a metadata envelope
    pub fn decrypt_metadata(
        &self,
        session: &SessionContext,
        envelope: &[u8],
    ) -> Result<OpenedMetadata> {
        let opened = self.open(session, BundleLayout::Metadata, envelope)?;
        Ok(OpenedMetadata {
            plaintext: opened.plaintext,
            verdict: opened.verdict,
        })
    }

    /// Compute and encrypt the record tag binding `filename ‖ description ‖ tag`.
    ///
    /// Returns the 80-byte `EncIV ‖ 4 blocks` envelope. No salt and no KDF
    /// call; the record key is sliced directly.
    pub fn seal_record_tag(
        &self,
        record_key: &RecordKey,
        filename: &[u8],
        description: &[u8],
        tag: &[u8; TAG_SIZE],
    ) -> Result<Vec<u8>> {
        let bundle = record_key.bundle();
        let mut record_tag = Zeroizing::new(tagging::compute(
            bundle.mac_key(),
            &[filename, description, tag],
            &Reporter::silent(),
        )?);

        stream::apply_keystream(&bundle.stream_seed(), record_tag.as_mut_slice(), &Reporter::silent());
        let cipher = BlockCipher::new(bundle.block_key())?;
        // 64 bytes are block aligned: legacy policy adds no padding block
        Ok(block::cbc_encrypt(&cipher, record_tag.as_slice(), PaddingPolicy::Legacy))
    }

    /// Decrypt an 80-byte record tag envelope
    pub fn open_record_tag(&self, record_key: &RecordKey, envelope: &[u8]) -> Result<[u8; TAG_SIZE]> {
        if envelope.len() != RECORD_TAG_ENVELOPE_SIZE {
            return Err(CryptoError::InvalidCiphertext(format!(
                "record tag envelope must be {} bytes, got {}",
                RECORD_TAG_ENVELOPE_SIZE,
                envelope.len()
            )));
        }

        let bundle = record_key.bundle();
        let cipher = BlockCipher::new(bundle.block_key())?;
        let mut opened = block::cbc_decrypt(&cipher, envelope, PaddingCheck::Skip)?;
        stream::apply_keystream(&bundle.stream_seed(), &mut opened.data, &Reporter::silent());

        let mut record_tag = [0u8; TAG_SIZE];
        record_tag.copy_from_slice(&opened.data);
        Ok(record_tag)
    }

    /// Recompute the record tag and compare it with a stored hex value.
    ///
    /// Anything other than exactly 160 hex characters stands for an absent
    /// tag and never matches.
    pub fn verify_record_tag(
        &self,
        record_key: &RecordKey,
        filename: &[u8],
        description: &[u8],
        tag: &[u8; TAG_SIZE],
        stored_hex: &str,
    ) -> Result<bool> {
        let stored = match decode_record_tag(stored_hex) {
            Some(envelope) => self.open_record_tag(record_key, &envelope)?.to_vec(),
            None => vec![0u8],
        };

        let bundle = record_key.bundle();
        let expected =
            tagging::compute(bundle.mac_key(), &[filename, description, tag], &Reporter::silent())?;
        Ok(tagging::tags_match(&expected, &stored))
    }

    fn derive_bundle(
        &self,
        session: &SessionContext,
        layout: BundleLayout,
        salt: &[u8],
    ) -> Result<KeyBundle> {
        self.reporter.report(Stage::DerivingKey, 0, 1);
        let bundle = KeyBundle::derive(
            layout,
            session.master_secret().as_bytes(),
            salt,
            session.pipeline_iterations(),
        )?;
        self.reporter.report(Stage::DerivingKey, 1, 1);
        Ok(bundle)
    }

    fn seal(
        &self,
        session: &SessionContext,
        layout: BundleLayout,
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_SIZE], KeyBundle)> {
        debug!(?layout, len = plaintext.len(), "sealing");

        let salt = kdf::generate_salt();
        let bundle = self.derive_bundle(session, layout, &salt)?;
        let tag = tagging::compute(bundle.mac_key(), &[plaintext], &self.reporter)?;

        let mut stream_data = Zeroizing::new(Vec::with_capacity(TAG_SIZE + plaintext.len()));
        stream_data.extend_from_slice(&tag);
        stream_data.extend_from_slice(plaintext);
        stream::apply_keystream(&bundle.stream_seed(), &mut stream_data, &self.reporter);

        let total = stream_data.len() as u64;
        self.reporter.report(Stage::BlockCipher, 0, total);
        let cipher = BlockCipher::new(bundle.block_key())?;
        let body = block::cbc_encrypt(&cipher, &stream_data, self.padding);
        self.reporter.report(Stage::BlockCipher, total, total);

        let mut envelope = Vec::with_capacity(SALT_SIZE + body.len());
        envelope.extend_from_slice(&salt);
        envelope.extend_from_slice(&body);
        Ok((envelope, tag, bundle))
    }

    fn open(&self, session: &SessionContext, layout: BundleLayout, envelope: &[u8]) -> Result<Opened> {
        if envelope.len() < MIN_ENVELOPE_SIZE || (envelope.len() - SALT_SIZE) % BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidCiphertext(format!(
                "envelope of {} bytes is not salt, encrypted IV and whole blocks",
                envelope.len()
            )));
        }
        debug!(?layout, len = envelope.len(), "opening");

        let (salt, body) = envelope.split_at(SALT_SIZE);
        let bundle = self.derive_bundle(session, layout, salt)?;

        let total = body.len() as u64;
        self.reporter.report(Stage::BlockCipher, 0, total);
        let cipher = BlockCipher::new(bundle.block_key())?;
        let cbc = block::cbc_decrypt(&cipher, body, PaddingCheck::Enforce)?;
        self.reporter.report(Stage::BlockCipher, total, total);

        let mut stream_data = Zeroizing::new(cbc.data);
        stream::apply_keystream(&bundle.stream_seed(), &mut stream_data, &self.reporter);

        let mut tag = [0u8; TAG_SIZE];
        let (plaintext, integrity_failed) = if stream_data.len() < TAG_SIZE {
            // Tag window truncated: nothing to authenticate against
            (Vec::new(), true)
        } else {
            tag.copy_from_slice(&stream_data[..TAG_SIZE]);
            let plaintext = stream_data[TAG_SIZE..].to_vec();
            let expected = tagging::compute(bundle.mac_key(), &[&plaintext], &self.reporter)?;
            (plaintext, !tagging::tags_match(&expected, &tag))
        };

        let verdict = Verdict {
            invalid_padding: cbc.invalid_padding,
            integrity_failed,
        };
        if !verdict.is_clean() {
            debug!(?layout, ?verdict, "opened with failed verdict");
        }

        Ok(Opened {
            plaintext,
            tag,
            bundle,
            verdict,
        })
    }
}

fn decode_record_tag(stored_hex: &str) -> Option<Vec<u8>> {
    if stored_hex.len() != RECORD_TAG_HEX_LEN {
        return None;
    }
    hex::decode(stored_hex).ok()
}
