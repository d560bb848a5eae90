use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use super::{Document, DocumentId, FieldFilter, RecordStore, StoreError, StoredDocument};

type Collections = HashMap<String, Vec<StoredDocument>>;

/// Process-local store keeping each collection in insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    collections: Arc<Mutex<Collections>>,
    sequence: Arc<Mutex<u64>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of objects into `collection`, returning how many were inserted.
    pub fn seed_from_reader<R: Read>(
        &self,
        collection: &str,
        reader: R,
    ) -> Result<usize, StoreError> {
        let documents: Vec<Value> = serde_json::from_reader(reader)?;
        let mut inserted = 0;
        for value in documents {
            match value {
                Value::Object(document) => self.insert(collection, document)?,
                other => return Err(StoreError::InvalidDocument(other.to_string())),
            };
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Snapshot of every document currently in `collection`.
    pub fn documents(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        self.query(collection, &[])
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("collection mutex poisoned".to_string()))
    }

    fn next_id(&self, collection: &str) -> Result<DocumentId, StoreError> {
        let mut sequence = self
            .sequence
            .lock()
            .map_err(|_| StoreError::Unavailable("sequence mutex poisoned".to_string()))?;
        *sequence += 1;
        Ok(DocumentId(format!("{collection}-{:06}", *sequence)))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, collection: &str, document: Document) -> Result<DocumentId, StoreError> {
        let id = self.next_id(collection)?;
        let mut guard = self.lock()?;
        guard
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                data: document,
            });
        Ok(id)
    }

    fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|stored| filters.iter().all(|filter| filter.matches(&stored.data)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
