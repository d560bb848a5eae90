//! Document store boundary used by the intake workflow.
//!
//! Records are schemaless JSON objects grouped into named collections, which keeps the
//! workflow independent of the backing database.

mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use memory::InMemoryRecordStore;

/// Collection holding submitted requirements.
pub const REQUIREMENTS_COLLECTION: &str = "requirements";
/// Collection holding registered supplier shops.
pub const SHOPS_COLLECTION: &str = "shops";

/// JSON object body of a stored record.
pub type Document = Map<String, Value>;

/// Identifier assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record returned from a query alongside its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub data: Document,
}

/// Field equality predicate. Values compare as exact JSON values, so string matches are
/// case-sensitive and untrimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// Storage abstraction so the workflow can be exercised in isolation.
pub trait RecordStore: Send + Sync {
    fn insert(&self, collection: &str, document: Document) -> Result<DocumentId, StoreError>;

    /// Return every document in `collection` matching all `filters`, in store order.
    fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("document is not a JSON object: {0}")]
    InvalidDocument(String),
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serialize a typed record into a store document.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(other.to_string())),
    }
}
