//! Filesystem chunk store
//!
//! Layout under the store root:
//!
//! ```text
//! {root}/records/{id}.json        container record
//! {root}/chunks/{id}/{index}.hex  transport chunk
//! ```
//!
//! Files are written atomically (temp then rename).

use crate::{validate_id, ChunkStore, ContainerRecord, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};

const RECORDS_DIR: &str = "records";
const CHUNKS_DIR: &str = "chunks";

/// A chunk store backed by a local directory tree
#[derive(Clone, Debug)]
pub struct FsChunkStore {
    root: PathBuf,
}

impl FsChunkStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(RECORDS_DIR)).await?;
        fs::create_dir_all(root.join(CHUNKS_DIR)).await?;
        debug!(root = %root.display(), "opened filesystem chunk store");
        Ok(Self { root })
    }

    /// The store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(RECORDS_DIR).join(format!("{id}.json"))
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(CHUNKS_DIR).join(container)
    }

    fn chunk_path(&self, container: &str, index: u32) -> PathBuf {
        self.container_dir(container).join(format!("{index}.hex"))
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

async fn read_if_present(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ChunkStore for FsChunkStore {
    #[instrument(skip(self, chunk), fields(len = chunk.len()))]
    async fn put_chunk(&self, container: &str, index: u32, chunk: String) -> Result<()> {
        validate_id(container)?;
        write_atomic(&self.chunk_path(container, index), chunk.as_bytes()).await
    }

    #[instrument(skip(self))]
    async fn get_chunk(&self, container: &str, index: u32) -> Result<Option<String>> {
        validate_id(container)?;
        read_if_present(&self.chunk_path(container, index)).await
    }

    #[instrument(skip(self))]
    async fn delete_chunk(&self, container: &str, index: u32) -> Result<()> {
        validate_id(container)?;
        remove_if_present(&self.chunk_path(container, index)).await?;

        // Drop the container directory once it is empty
        let dir = self.container_dir(container);
        if let Ok(mut entries) = fs::read_dir(&dir).await {
            if entries.next_entry().await?.is_none() {
                let _ = fs::remove_dir(&dir).await;
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn chunk_indices(&self, container: &str) -> Result<Vec<u32>> {
        validate_id(container)?;
        let mut entries = match fs::read_dir(self.container_dir(container)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut indices = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(index) = name.strip_suffix(".hex").and_then(|s| s.parse::<u32>().ok()) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn put_metadata(&self, record: &ContainerRecord) -> Result<()> {
        validate_id(&record.id)?;
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.record_path(&record.id), &json).await
    }

    #[instrument(skip(self))]
    async fn get_metadata(&self, id: &str) -> Result<Option<ContainerRecord>> {
        validate_id(id)?;
        match read_if_present(&self.record_path(id)).await? {
            Some(json) => Ok(Some(parse_record(id, &json))),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_metadata(&self) -> Result<Vec<ContainerRecord>> {
        let mut entries = fs::read_dir(self.root.join(RECORDS_DIR)).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(id) = name.to_string_lossy().strip_suffix(".json").map(str::to_string) else {
                continue;
            };
            if validate_id(&id).is_err() {
                continue;
            }

            let json = fs::read_to_string(entry.path()).await?;
            records.push(parse_record(&id, &json));
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn delete_metadata(&self, id: &str) -> Result<()> {
        validate_id(id)?;
        remove_if_present(&self.record_path(id)).await
    }
}

/// Parse a stored record. An unreadable document becomes an empty record so
/// the container can still be listed, downloaded as broken and deleted.
fn parse_record(id: &str, json: &str) -> ContainerRecord {
    match serde_json::from_str::<ContainerRecord>(json) {
        Ok(mut record) => {
            record.id = id.to_string();
            record
        }
        Err(e) => {
            warn!(%id, error = %e, "unreadable container record");
            ContainerRecord::new(id)
        }
    }
}
