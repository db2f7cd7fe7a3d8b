use domain::{Collection, Record};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::{ApplicationError, BlobStore};

/// Generic accessor over the record collections.
///
/// Each collection is one JSON array blob in the [`BlobStore`]. There is no in-memory
/// mirror: every call re-reads the blob, and every mutation writes the whole collection
/// back. Mutations made through one `RecordStore` are serialized; separate processes
/// sharing the same storage still race, and the last write wins.
pub struct RecordStore {
    blobs: Arc<dyn BlobStore>,
    write_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            write_lock: Mutex::new(()),
        }
    }

    /// Writes an empty sequence for every collection that has never been persisted.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), ApplicationError> {
        let _guard = self.write_lock.lock().await;
        for collection in Collection::ALL {
            if !self.blobs.contains(collection.name()).await? {
                info!(collection = %collection, "Initializing empty collection");
                self.write_collection(collection, &[]).await?;
            }
        }
        Ok(())
    }

    /// All records in insertion order. A never-written collection is empty.
    #[instrument(skip(self))]
    pub async fn get_all(&self, collection: Collection) -> Result<Vec<Record>, ApplicationError> {
        self.read_collection(collection).await
    }

    /// Replaces the whole collection. The previous blob survives a failed write.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn save(
        &self,
        collection: Collection,
        records: &[Record],
    ) -> Result<(), ApplicationError> {
        let _guard = self.write_lock.lock().await;
        self.write_collection(collection, records).await
    }

    /// Appends `record` without checking for a duplicate id and returns it unchanged.
    #[instrument(skip(self, record), fields(record_id = record.id().unwrap_or_default()))]
    pub async fn add(
        &self,
        collection: Collection,
        record: Record,
    ) -> Result<Record, ApplicationError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_collection(collection).await?;
        records.push(record.clone());
        self.write_collection(collection, &records).await?;
        info!(collection = %collection, count = records.len(), "Record added");
        Ok(record)
    }

    /// Appends the record `build` derives from the current contents of the collection.
    /// The read, `build` and the write all happen under the write lock, so ids chosen by
    /// `build` cannot be handed out twice. Nothing is written when `build` fails.
    #[instrument(skip(self, build))]
    pub async fn add_with<F>(
        &self,
        collection: Collection,
        build: F,
    ) -> Result<Record, ApplicationError>
    where
        F: FnOnce(&[Record]) -> Result<Record, ApplicationError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_collection(collection).await?;
        let record = build(&records)?;
        records.push(record.clone());
        self.write_collection(collection, &records).await?;
        info!(
            collection = %collection,
            record_id = record.id().unwrap_or_default(),
            count = records.len(),
            "Record added"
        );
        Ok(record)
    }

    /// Like [`RecordStore::update`], but the partial record is produced by `build` from the
    /// stored record under the write lock. `build` sees exactly the record it patches.
    #[instrument(skip(self, build))]
    pub async fn update_with<F>(
        &self,
        collection: Collection,
        id: &str,
        build: F,
    ) -> Result<Option<Record>, ApplicationError>
    where
        F: FnOnce(&Record) -> Result<Record, ApplicationError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_collection(collection).await?;
        let Some(position) = records.iter().position(|record| record.has_id(id)) else {
            debug!(collection = %collection, record_id = %id, "No record to update");
            return Ok(None);
        };
        let partial = build(&records[position])?;
        records[position].merge(partial);
        let updated = records[position].clone();
        self.write_collection(collection, &records).await?;
        info!(collection = %collection, record_id = %id, position, "Record updated");
        Ok(Some(updated))
    }

    /// Shallow-merges `partial` into the first record with `id`, in place.
    /// Returns `None` without writing anything when no record matches.
    #[instrument(skip(self, partial))]
    pub async fn update(
        &self,
        collection: Collection,
        id: &str,
        partial: Record,
    ) -> Result<Option<Record>, ApplicationError> {
        self.update_with(collection, id, move |_| Ok(partial)).await
    }

    /// Removes every record with `id`. Returns whether anything was removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, collection: Collection, id: &str) -> Result<bool, ApplicationError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_collection(collection).await?;
        let before = records.len();
        records.retain(|record| !record.has_id(id));
        if records.len() == before {
            debug!(collection = %collection, record_id = %id, "No record to delete");
            return Ok(false);
        }
        self.write_collection(collection, &records).await?;
        info!(collection = %collection, record_id = %id, removed = before - records.len(), "Record deleted");
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Record>, ApplicationError> {
        let records = self.read_collection(collection).await?;
        Ok(records.into_iter().find(|record| record.has_id(id)))
    }

    /// Records where any of `fields` contains `term`, ignoring case. Missing fields
    /// count as empty text. An empty term matches every record when `fields` is non-empty.
    #[instrument(skip(self, fields))]
    pub async fn search<S: AsRef<str> + Sync>(
        &self,
        collection: Collection,
        term: &str,
        fields: &[S],
    ) -> Result<Vec<Record>, ApplicationError> {
        let records = self.read_collection(collection).await?;
        let total = records.len();
        let hits: Vec<Record> = records
            .into_iter()
            .filter(|record| record.matches(term, fields))
            .collect();
        debug!(collection = %collection, total, hits = hits.len(), "Linear search finished");
        Ok(hits)
    }

    async fn read_collection(&self, collection: Collection) -> Result<Vec<Record>, ApplicationError> {
        match self.blobs.read(collection.name()).await? {
            None => {
                debug!(collection = %collection, "Collection never written, treating as empty");
                Ok(Vec::new())
            }
            Some(blob) => serde_json::from_str(&blob).map_err(|source| {
                error!(collection = %collection, "Stored collection is not a sequence of records: {}", source);
                ApplicationError::Serialization { collection, source }
            }),
        }
    }

    async fn write_collection(
        &self,
        collection: Collection,
        records: &[Record],
    ) -> Result<(), ApplicationError> {
        let blob = serde_json::to_string(records).map_err(|source| {
            error!(collection = %collection, "Failed to serialize collection: {}", source);
            ApplicationError::Serialization { collection, source }
        })?;
        self.blobs.write(collection.name(), blob).await.map_err(|e| {
            error!(collection = %collection, "Failed to persist collection: {}", e);
            e
        })
    }
}
