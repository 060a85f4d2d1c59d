//! In-memory record store.

use super::{FunctionRecord, RecordStore};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A record store which keeps the records in a `HashMap` keyed by id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, FunctionRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if the store contains no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<FunctionRecord>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn put(&self, record: FunctionRecord) -> Result<(), StoreError> {
        self.records.write().insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records.write().remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<FunctionRecord>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }

    #[inline]
    fn store_name(&self) -> &'static str {
        "memory"
    }
}
