//! Blob stores for unit tests of the services.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{ApplicationError, BlobStore};

#[derive(Default)]
pub struct MemoryBlobs {
    blobs: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryBlobs {
    pub fn put(&self, key: &str, blob: &str) {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), blob.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn read(&self, key: &str) -> Result<Option<String>, ApplicationError> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, blob: String) -> Result<(), ApplicationError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.blobs.lock().unwrap().insert(key.to_string(), blob);
        Ok(())
    }
}

/// Reads succeed, every write fails as if the storage quota were exhausted.
pub struct FailingWrites {
    inner: MemoryBlobs,
}

impl FailingWrites {
    pub fn with_blob(key: &str, blob: &str) -> Self {
        let inner = MemoryBlobs::default();
        inner.put(key, blob);
        Self { inner }
    }
}

#[async_trait]
impl BlobStore for FailingWrites {
    async fn read(&self, key: &str) -> Result<Option<String>, ApplicationError> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, _blob: String) -> Result<(), ApplicationError> {
        Err(ApplicationError::Storage {
            key: key.to_string(),
            source: Box::new(io::Error::other("quota exceeded")),
        })
    }
}
