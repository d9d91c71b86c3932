//! Vault orchestration over a chunk store
//!
//! Every cipher call runs on a blocking worker so the async host stays
//! responsive while Argon2id is busy.

use crate::types::*;
use crate::{ClientError, Result, VaultConfig};
use futures::future::{join_all, try_join_all};
use lakhash_crypto::{
    CryptoError, Pipeline, ProgressCallback, Reporter, SessionContext, Stage,
};
use lakhash_store::{decode_chunk, ChunkStore, Chunker, ContainerRecord, StoreError};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Length of a generated container id
pub const CONTAINER_ID_LEN: usize = 10;

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random container id from `[A-Za-z0-9]`
pub fn generate_container_id() -> String {
    let mut bytes = [0u8; CONTAINER_ID_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| ID_CHARSET[*b as usize % ID_CHARSET.len()] as char)
        .collect()
}

/// A decrypted title or description with its checks
struct MetadataField {
    text: String,
    integrity: bool,
    padding_valid: bool,
}

impl MetadataField {
    fn broken() -> Self {
        Self {
            text: BROKEN_METADATA.to_string(),
            integrity: false,
            padding_valid: false,
        }
    }

    fn trusted(text: String) -> Self {
        Self {
            text,
            integrity: true,
            padding_valid: true,
        }
    }
}

/// Stored metadata fields are hex of whole 16-byte blocks
fn is_block_hex(value: &str) -> bool {
    !value.is_empty()
        && value.len() % 32 == 0
        && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn open_metadata_field(
    pipeline: &Pipeline,
    session: &SessionContext,
    stored_hex: &str,
) -> lakhash_crypto::Result<MetadataField> {
    if !is_block_hex(stored_hex) {
        return Ok(MetadataField::broken());
    }
    let envelope = hex::decode(stored_hex)?;
    match pipeline.decrypt_metadata(session, &envelope) {
        Ok(opened) => Ok(MetadataField {
            text: String::from_utf8_lossy(&opened.plaintext).into_owned(),
            integrity: !opened.verdict.integrity_failed,
            padding_valid: !opened.verdict.invalid_padding,
        }),
        Err(CryptoError::InvalidCiphertext(reason)) => {
            warn!(%reason, "unreadable metadata envelope");
            Ok(MetadataField::broken())
        }
        Err(e) => Err(e),
    }
}

/// Decode chunks in order, skipping any that are not valid hex
fn join_lenient(id: &str, chunks: &[String]) -> (Vec<u8>, bool) {
    let mut data = Vec::new();
    let mut complete = true;
    for (index, chunk) in chunks.iter().enumerate() {
        match decode_chunk(chunk) {
            Ok(bytes) => data.extend_from_slice(&bytes),
            Err(e) => {
                warn!(%id, index, error = %e, "skipping malformed chunk");
                complete = false;
            }
        }
    }
    (data, complete)
}

struct SealedUpload {
    envelope: Vec<u8>,
    encrypted_filename: Vec<u8>,
    encrypted_description: Vec<u8>,
    record_tag: Vec<u8>,
}

/// Encrypted file vault bound to one session and one chunk store
pub struct VaultClient {
    store: Arc<dyn ChunkStore>,
    session: Arc<SessionContext>,
    config: VaultConfig,
    chunker: Chunker,
    progress: Option<ProgressCallback>,
}

impl VaultClient {
    /// Create a client, validating the configuration
    pub fn new(
        store: Arc<dyn ChunkStore>,
        session: Arc<SessionContext>,
        config: VaultConfig,
    ) -> Result<Self> {
        let chunker = config.chunker()?;
        Ok(Self {
            store,
            session,
            config,
            chunker,
            progress: None,
        })
    }

    /// Report progress of every stage to `callback`
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Get the session this client encrypts under
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Get the underlying chunk store
    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    fn pipeline(&self) -> Pipeline {
        let pipeline = Pipeline::new().with_padding_policy(self.config.padding_policy);
        match &self.progress {
            Some(callback) => pipeline.with_progress(callback.clone()),
            None => pipeline,
        }
    }

    /// Recorded ciphertext length, unless missing, zero or larger than any
    /// envelope this configuration could have written
    fn trusted_length(&self, record: &ContainerRecord) -> Option<u64> {
        record.encrypted_length_within(self.config.max_encrypted_length())
    }

    fn reporter(&self) -> Reporter {
        Reporter::from(self.progress.clone())
    }

    async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Pipeline, &SessionContext) -> lakhash_crypto::Result<T> + Send + 'static,
    {
        let pipeline = self.pipeline();
        let session = Arc::clone(&self.session);
        let output = tokio::task::spawn_blocking(move || work(&pipeline, &session)).await?;
        Ok(output?)
    }

    /// Encrypt and store a file.
    ///
    /// A missing or blank description is replaced by the configured default,
    /// which is stored as plain hex rather than encrypted.
    #[instrument(skip(self, data, description), fields(size = data.len()))]
    pub async fn upload(
        &self,
        filename: &str,
        data: &[u8],
        description: Option<&str>,
    ) -> Result<UploadedFile> {
        let file_size = data.len() as u64;
        if file_size == 0 {
            return Err(ClientError::EmptyFile);
        }
        if file_size > self.config.max_file_size {
            return Err(ClientError::FileTooLarge {
                size: file_size,
                max: self.config.max_file_size,
            });
        }

        let description = match description {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => self.config.default_description.clone(),
        };
        let store_plain = description == self.config.default_description;

        let data = data.to_vec();
        let filename = filename.as_bytes().to_vec();
        let sealed = self
            .run_blocking(move |pipeline, session| {
                let file = pipeline.encrypt_file(session, &data)?;
                let encrypted_filename = pipeline.encrypt_metadata(session, &filename)?;
                let encrypted_description = if store_plain {
                    description.as_bytes().to_vec()
                } else {
                    pipeline.encrypt_metadata(session, description.as_bytes())?
                };
                let record_tag = pipeline.seal_record_tag(
                    &file.record_key,
                    &filename,
                    description.as_bytes(),
                    &file.tag,
                )?;
                Ok(SealedUpload {
                    envelope: file.envelope,
                    encrypted_filename,
                    encrypted_description,
                    record_tag,
                })
            })
            .await?;

        let id = self.unused_id().await?;
        let encrypted_length = sealed.envelope.len() as u64;
        let chunk_count = self.put_chunks(&id, &sealed.envelope).await?;

        let record = ContainerRecord {
            encrypted_filename: hex::encode(&sealed.encrypted_filename),
            encrypted_description: hex::encode(&sealed.encrypted_description),
            encrypted_tag: hex::encode(&sealed.record_tag),
            file_size: Some(file_size),
            encrypted_length: Some(encrypted_length),
            ..ContainerRecord::new(id.as_str())
        };
        self.store.put_metadata(&record).await?;

        info!(%id, file_size, encrypted_length, chunk_count, "file uploaded");
        Ok(UploadedFile {
            id,
            file_size,
            encrypted_length,
            chunk_count,
        })
    }

    async fn unused_id(&self) -> Result<String> {
        loop {
            let id = generate_container_id();
            if !self.store.container_exists(&id).await? {
                return Ok(id);
            }
            debug!(%id, "container id taken, regenerating");
        }
    }

    async fn put_chunks(&self, id: &str, envelope: &[u8]) -> Result<u64> {
        let chunks = self.chunker.split(envelope);
        let total = chunks.len() as u64;
        let reporter = self.reporter();
        reporter.report(Stage::Uploading, 0, total);

        let mut pending = chunks.into_iter().enumerate();
        let mut uploaded = 0u64;
        loop {
            let batch: Vec<_> = pending
                .by_ref()
                .take(self.config.upload_batch_size)
                .map(|(index, chunk)| self.store.put_chunk(id, index as u32, chunk))
                .collect();
            if batch.is_empty() {
                break;
            }
            uploaded += batch.len() as u64;
            try_join_all(batch).await?;
            debug!(%id, uploaded, total, "chunk batch stored");
            reporter.report(Stage::Uploading, uploaded, total);
        }
        Ok(total)
    }

    /// Decrypt the metadata of every stored file.
    ///
    /// Damaged titles and descriptions show as `"Broken Metadata"` with failed
    /// checks; listing itself only fails on store or key derivation errors.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<FileEntry>> {
        let records = self.store.list_metadata().await?;
        let mut entries = Vec::with_capacity(records.len());
        for record in &records {
            entries.push(self.describe(record).await?);
        }
        debug!(count = entries.len(), "listed files");
        Ok(entries)
    }

    async fn describe(&self, record: &ContainerRecord) -> Result<FileEntry> {
        let filename_hex = record.encrypted_filename.clone();
        let description_hex = record.encrypted_description.clone();
        let default_hex = self.config.default_description_hex();
        let default_description = self.config.default_description.clone();

        let (title, description) = self
            .run_blocking(move |pipeline, session| {
                let title = open_metadata_field(pipeline, session, &filename_hex)?;
                let description = if description_hex == default_hex {
                    MetadataField::trusted(default_description)
                } else {
                    open_metadata_field(pipeline, session, &description_hex)?
                };
                Ok((title, description))
            })
            .await?;

        if !title.integrity || !description.integrity {
            warn!(id = %record.id, "metadata failed verification");
        }

        Ok(FileEntry {
            id: record.id.clone(),
            title: title.text,
            description: description.text,
            file_size: record.file_size.filter(|&size| size > 0),
            encrypted_length: self.trusted_length(record),
            title_integrity: title.integrity,
            title_padding_valid: title.padding_valid,
            description_integrity: description.integrity,
            description_padding_valid: description.padding_valid,
        })
    }

    async fn get_record(&self, id: &str) -> Result<ContainerRecord> {
        self.store
            .get_metadata(id)
            .await?
            .ok_or_else(|| ClientError::NotFound(id.to_string()))
    }

    /// Fetch and decrypt a file.
    ///
    /// The content is returned even when checks fail; the report says which.
    #[instrument(skip(self))]
    pub async fn download(&self, id: &str) -> Result<DownloadedFile> {
        let record = self.get_record(id).await?;
        let entry = self.describe(&record).await?;

        let trusted_length = self.trusted_length(&record);
        let (envelope, transport_complete) = match trusted_length {
            Some(encrypted_length) => self.fetch_chunks(id, encrypted_length).await?,
            None => {
                warn!(%id, "broken metadata, probing chunks from index 0");
                self.probe_chunks(id).await?
            }
        };

        let filename = entry.title.clone();
        let description = entry.description.clone();
        let stored_tag = record.encrypted_tag.clone();
        let (plaintext, content, record_integrity) = self
            .run_blocking(move |pipeline, session| {
                let opened = pipeline.decrypt_file(session, &envelope)?;
                let record_integrity = pipeline.verify_record_tag(
                    &opened.record_key,
                    filename.as_bytes(),
                    description.as_bytes(),
                    &opened.tag,
                    &stored_tag,
                )?;
                Ok((opened.plaintext, opened.verdict, record_integrity))
            })
            .await?;

        let report = IntegrityReport {
            content,
            record_integrity,
            title_integrity: entry.title_integrity,
            title_padding_valid: entry.title_padding_valid,
            description_integrity: entry.description_integrity,
            description_padding_valid: entry.description_padding_valid,
            transport_complete,
            broken_metadata: trusted_length.is_none(),
        };
        if report.is_clean() {
            info!(%id, size = plaintext.len(), "file downloaded and verified");
        } else {
            warn!(%id, issues = ?report.issues(), "file downloaded with issues");
        }

        Ok(DownloadedFile {
            id: record.id,
            filename: entry.title,
            description: entry.description,
            data: plaintext.into(),
            report,
        })
    }

    async fn fetch_chunks(&self, id: &str, encrypted_length: u64) -> Result<(Vec<u8>, bool)> {
        let total = self.chunker.chunk_count(encrypted_length);
        let reporter = self.reporter();
        let mut chunks = Vec::new();

        for index in 0..total {
            match self.store.get_chunk(id, index as u32).await? {
                Some(chunk) => chunks.push(chunk),
                None => {
                    warn!(%id, index, total, "missing chunk, decrypting what arrived");
                    break;
                }
            }
            reporter.report(Stage::Downloading, index + 1, total);
        }

        if chunks.len() as u64 == total {
            match self.chunker.join_exact(&chunks, encrypted_length) {
                Ok(envelope) => return Ok((envelope, true)),
                Err(e @ (StoreError::LengthMismatch { .. } | StoreError::MalformedChunk(_))) => {
                    warn!(%id, error = %e, "chunks do not match the recorded length");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let (envelope, _) = join_lenient(id, &chunks);
        Ok((envelope, false))
    }

    async fn probe_chunks(&self, id: &str) -> Result<(Vec<u8>, bool)> {
        let reporter = self.reporter();
        let mut chunks = Vec::new();
        while let Some(chunk) = self.store.get_chunk(id, chunks.len() as u32).await? {
            chunks.push(chunk);
            reporter.report(Stage::Downloading, chunks.len() as u64, 0);
        }
        debug!(%id, found = chunks.len(), "probed chunks");
        Ok(join_lenient(id, &chunks))
    }

    /// Delete a file's chunks in batches, then its record.
    ///
    /// Failed chunk deletions are logged and counted, never retried.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<DeletedFile> {
        let record = self.get_record(id).await?;
        let broken_metadata = self.trusted_length(&record).is_none();
        if broken_metadata {
            warn!(%id, "broken metadata, deleting every stored chunk");
        }

        let indices = self.store.chunk_indices(id).await?;

        let total = indices.len() as u64;
        let reporter = self.reporter();
        let mut chunks_deleted = 0u64;
        let mut chunks_failed = 0u64;

        for batch in indices.chunks(self.config.delete_batch_size) {
            let results = join_all(batch.iter().map(|&index| self.store.delete_chunk(id, index))).await;
            for (index, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => chunks_deleted += 1,
                    Err(e) => {
                        warn!(%id, index, error = %e, "chunk deletion failed");
                        chunks_failed += 1;
                    }
                }
            }
            reporter.report(Stage::Deleting, chunks_deleted + chunks_failed, total);
        }

        self.store.delete_metadata(id).await?;
        info!(%id, chunks_deleted, chunks_failed, "file deleted");

        Ok(DeletedFile {
            id: id.to_string(),
            chunks_deleted,
            chunks_failed,
            broken_metadata,
        })
    }
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("identity", &self.session.identity())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
