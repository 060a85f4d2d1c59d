//! Record stores for function entities.
//!
//! The function manager only needs a key-value surface keyed by id; any
//! backend implementing [`RecordStore`] can be plugged in. Two stores ship with
//! the crate: [`MemoryStore`] and [`FileStore`].

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use toolsmith_core::{JsonValue, extension::TomlTableExt, state::Config};

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Native record shape of a function entity.
///
/// When serialized, the date is kept as a native timestamp in milliseconds
/// since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Function id.
    pub id: String,
    /// Creation or last save time.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    /// Cached function name.
    pub name: String,
    /// Cached function description.
    pub description: String,
    /// Cached parameters schema.
    pub parameters: JsonValue,
    /// Source text.
    pub code: String,
}

/// Key-value persistence surface for function records.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Looks up a record by id.
    async fn get(&self, id: &str) -> Result<Option<FunctionRecord>, StoreError>;

    /// Inserts or replaces the record with the same id.
    async fn put(&self, record: FunctionRecord) -> Result<(), StoreError>;

    /// Removes a record by id. Removing a missing id succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Returns all records in an unspecified order.
    async fn list(&self) -> Result<Vec<FunctionRecord>, StoreError>;

    /// Returns the store name.
    fn store_name(&self) -> &'static str;
}

/// Opens the record store selected by the `[store]` table of the config.
///
/// `kind = "file"` uses a [`FileStore`] rooted at `dir` (default `./functions`);
/// anything else uses a [`MemoryStore`].
pub async fn open(config: &Config) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store_config = config.get_table("store");
    let kind = store_config
        .and_then(|config| config.get_str("kind"))
        .unwrap_or("memory");
    let store: Arc<dyn RecordStore> = match kind {
        "file" => {
            let dir = store_config
                .and_then(|config| config.get_path("dir"))
                .unwrap_or_else(|| std::path::Path::new("functions"));
            Arc::new(FileStore::open(dir).await?)
        }
        "memory" => Arc::new(MemoryStore::new()),
        kind => {
            tracing::warn!(kind, "unknown record store kind, falling back to memory");
            Arc::new(MemoryStore::new())
        }
    };
    tracing::info!(store = store.store_name(), "record store opened");
    Ok(store)
}
