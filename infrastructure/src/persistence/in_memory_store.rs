// ./infrastructure/src/persistence/in_memory_store.rs
use application::{ApplicationError, BlobStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Volatile blob storage. Cloning shares the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    // Blob key -> serialized collection
    blobs: Arc<DashMap<String, String>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(DashMap::new()),
        }
    }

    /// Number of keys written so far.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    #[instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<Option<String>, ApplicationError> {
        debug!(key = %key, "Reading blob from in-memory store");
        Ok(self.blobs.get(key).map(|blob| blob.value().clone()))
    }

    #[instrument(skip(self, blob), fields(bytes = blob.len()))]
    async fn write(&self, key: &str, blob: String) -> Result<(), ApplicationError> {
        debug!(key = %key, "Replacing blob in in-memory store");
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool, ApplicationError> {
        Ok(self.blobs.contains_key(key))
    }
}
