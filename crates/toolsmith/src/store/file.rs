//! File-backed record store.

use super::{FunctionRecord, RecordStore};
use crate::{error::StoreError, id::is_url_safe};
use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tokio::fs;

/// A record store which keeps one JSON document per record in a directory.
///
/// Every write goes to its own uniquely named temporary sibling which is then
/// renamed over the document, so readers and concurrent writers never observe
/// a partially written document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens the store, creating the directory if necessary.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Returns the directory of the store.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the document path for the id, or `None` if the id can not be
    /// used as a file name.
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        is_url_safe(id).then(|| self.dir.join(format!("{id}.json")))
    }
}

#[async_trait::async_trait]
impl RecordStore for FileStore {
    async fn get(&self, id: &str) -> Result<Option<FunctionRecord>, StoreError> {
        // Such an id could never have been written.
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, record: FunctionRecord) -> Result<(), StoreError> {
        let path = self
            .record_path(&record.id)
            .ok_or_else(|| StoreError::InvalidId(record.id.clone()))?;
        let bytes = serde_json::to_vec_pretty(&record)?;
        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut file = tempfile::Builder::new()
                .prefix(".record-")
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            file.as_file().sync_all()?;
            file.persist(&target).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(|err| StoreError::Datastore(Box::new(err)))??;
        tracing::debug!(id = %record.id, path = %path.display(), "function record written");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let Some(path) = self.record_path(id) else {
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<FunctionRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                // Deleted since the directory was read.
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            match serde_json::from_slice::<FunctionRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(path = %path.display(), "skip the malformed function record: {err}");
                }
            }
        }
        Ok(records)
    }

    #[inline]
    fn store_name(&self) -> &'static str {
        "file"
    }
}
