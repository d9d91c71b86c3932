//! In-memory chunk store for testing and caching

use crate::{validate_id, ChunkStore, ContainerRecord, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// An in-memory chunk store
#[derive(Clone, Default)]
pub struct MemoryChunkStore {
    chunks: Arc<DashMap<(String, u32), String>>,
    records: Arc<DashMap<String, ContainerRecord>>,
}

impl MemoryChunkStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of chunks stored across all containers
    pub fn chunk_len(&self) -> usize {
        self.chunks.len()
    }

    /// Get the number of container records stored
    pub fn record_len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.records.is_empty()
    }

    /// Clear all chunks and records
    pub fn clear(&self) {
        self.chunks.clear();
        self.records.clear();
    }

    /// Get total hex characters stored
    pub fn total_size(&self) -> u64 {
        self.chunks.iter().map(|entry| entry.value().len() as u64).sum()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn put_chunk(&self, container: &str, index: u32, chunk: String) -> Result<()> {
        validate_id(container)?;
        self.chunks.insert((container.to_string(), index), chunk);
        Ok(())
    }

    async fn get_chunk(&self, container: &str, index: u32) -> Result<Option<String>> {
        Ok(self
            .chunks
            .get(&(container.to_string(), index))
            .map(|entry| entry.value().clone()))
    }

    async fn delete_chunk(&self, container: &str, index: u32) -> Result<()> {
        self.chunks.remove(&(container.to_string(), index));
        Ok(())
    }

    async fn chunk_indices(&self, container: &str) -> Result<Vec<u32>> {
        let mut indices: Vec<u32> = self
            .chunks
            .iter()
            .filter(|entry| entry.key().0 == container)
            .map(|entry| entry.key().1)
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }

    async fn put_metadata(&self, record: &ContainerRecord) -> Result<()> {
        validate_id(&record.id)?;
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_metadata(&self, id: &str) -> Result<Option<ContainerRecord>> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn list_metadata(&self) -> Result<Vec<ContainerRecord>> {
        let mut records: Vec<ContainerRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn delete_metadata(&self, id: &str) -> Result<()> {
        self.records.remove(id);
        Ok(())
    }
}
