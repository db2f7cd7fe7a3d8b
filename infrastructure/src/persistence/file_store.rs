// ./infrastructure/src/persistence/file_store.rs
use application::{ApplicationError, BlobStore};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};

/// Blob storage on disk: blob `key` lives in `<root>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed over the target, so a reader
/// sees either the previous blob or the new one, and a failed write leaves the previous
/// blob in place.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Opens (creating if needed) the data directory.
    #[instrument]
    pub async fn open(root: impl Into<PathBuf> + std::fmt::Debug) -> Result<Self, ApplicationError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            error!(path = %root.display(), "Failed to create data directory: {}", e);
            storage_error(&root.display().to_string(), e)
        })?;
        info!(path = %root.display(), "File blob store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`. Keys are restricted to ASCII alphanumerics,
    /// `_` and `-` so they can never escape the data directory.
    pub fn blob_path(&self, key: &str) -> Result<PathBuf, ApplicationError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            warn!(key = %key, "Rejected blob key");
            return Err(ApplicationError::InvalidInput(format!(
                "Blob key '{}' must be non-empty ASCII alphanumerics, '_' or '-'",
                key
            )));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!(".{}.{}.json.tmp", key, std::process::id()))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    #[instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<Option<String>, ApplicationError> {
        let path = self.blob_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(blob) => {
                debug!(key = %key, bytes = blob.len(), "Read blob from disk");
                Ok(Some(blob))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(key = %key, "Blob file does not exist yet");
                Ok(None)
            }
            Err(e) => {
                error!(key = %key, path = %path.display(), "Failed to read blob: {}", e);
                Err(storage_error(key, e))
            }
        }
    }

    #[instrument(skip(self, blob), fields(bytes = blob.len()))]
    async fn write(&self, key: &str, blob: String) -> Result<(), ApplicationError> {
        let path = self.blob_path(key)?;
        let temp = self.temp_path(key);

        if let Err(e) = write_synced(&temp, blob.as_bytes()).await {
            error!(key = %key, "Failed to write temporary blob: {}", e);
            // The target file was never touched.
            let _ = fs::remove_file(&temp).await;
            return Err(storage_error(key, e));
        }
        if let Err(e) = fs::rename(&temp, &path).await {
            error!(key = %key, "Failed to move blob into place: {}", e);
            let _ = fs::remove_file(&temp).await;
            return Err(storage_error(key, e));
        }
        debug!(key = %key, path = %path.display(), "Blob replaced on disk");
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool, ApplicationError> {
        let path = self.blob_path(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| storage_error(key, e))
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn storage_error(key: &str, source: io::Error) -> ApplicationError {
    ApplicationError::Storage {
        key: key.to_string(),
        source: Box::new(source),
    }
}
