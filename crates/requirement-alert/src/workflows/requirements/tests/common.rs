use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};
use tracing_subscriber::fmt::MakeWriter;

use crate::notify::{Notifier, NotifyError, OutboundEmail};
use crate::store::{
    Document, DocumentId, FieldFilter, InMemoryRecordStore, RecordStore, StoreError,
    StoredDocument, SHOPS_COLLECTION,
};
use crate::workflows::requirements::{
    requirement_router, DispatchPolicy, RequirementIntakeService, RequirementSubmission,
};

pub(super) fn submission() -> RequirementSubmission {
    RequirementSubmission {
        category: Some("Services".to_string()),
        sub_category: Some("Healthcare".to_string()),
        product: Some("Nurse visit".to_string()),
        quantity: Some(json!(1)),
        description: None,
        contact: Some("9876543210".to_string()),
        name: Some("Asha".to_string()),
    }
}

pub(super) fn shop(email: &str, category: &str, sub_category: &str) -> Document {
    match json!({
        "shopName": format!("{email} shop"),
        "email": email,
        "category": category,
        "subCategory": sub_category,
        "state": "Kerala",
        "district": "Ernakulam",
        "city": "Kochi",
    }) {
        Value::Object(map) => map,
        _ => unreachable!("shop fixture is an object"),
    }
}

pub(super) fn seeded_store(shops: &[Document]) -> Arc<InMemoryRecordStore> {
    let store = Arc::new(InMemoryRecordStore::new());
    for document in shops {
        store
            .insert(SHOPS_COLLECTION, document.clone())
            .expect("seed shop");
    }
    store
}

pub(super) fn build_service(
    shops: &[Document],
    notifier: MemoryNotifier,
    policy: DispatchPolicy,
) -> (
    RequirementIntakeService<InMemoryRecordStore, MemoryNotifier>,
    Arc<InMemoryRecordStore>,
    Arc<MemoryNotifier>,
) {
    let store = seeded_store(shops);
    let notifier = Arc::new(notifier);
    let service = RequirementIntakeService::new(store.clone(), notifier.clone(), policy);
    (service, store, notifier)
}

/// Records every attempted send; addresses in `failing` error out.
#[derive(Default)]
pub(super) struct MemoryNotifier {
    attempts: Mutex<Vec<OutboundEmail>>,
    failing: HashSet<String>,
}

impl MemoryNotifier {
    pub(super) fn failing_for(addresses: &[&str]) -> Self {
        Self {
            attempts: Mutex::default(),
            failing: addresses.iter().map(|address| address.to_string()).collect(),
        }
    }

    pub(super) fn attempts(&self) -> Vec<OutboundEmail> {
        self.attempts.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn recipients(&self) -> Vec<String> {
        self.attempts()
            .into_iter()
            .map(|email| email.to)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, email: &OutboundEmail) -> Result<(), NotifyError> {
        self.attempts
            .lock()
            .expect("notifier mutex poisoned")
            .push(email.clone());
        if self.failing.contains(&email.to) {
            return Err(NotifyError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

/// Store whose inserts always fail.
pub(super) struct UnavailableStore;

impl RecordStore for UnavailableStore {
    fn insert(&self, _collection: &str, _document: Document) -> Result<DocumentId, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn query(
        &self,
        _collection: &str,
        _filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Store that accepts inserts but cannot answer supplier queries.
#[derive(Default)]
pub(super) struct QueryFailingStore {
    pub(super) inner: InMemoryRecordStore,
}

impl RecordStore for QueryFailingStore {
    fn insert(&self, collection: &str, document: Document) -> Result<DocumentId, StoreError> {
        self.inner.insert(collection, document)
    }

    fn query(
        &self,
        _collection: &str,
        _filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        Err(StoreError::Unavailable("index building".to_string()))
    }
}

pub(super) fn router_with_service(
    service: RequirementIntakeService<InMemoryRecordStore, MemoryNotifier>,
) -> axum::Router {
    requirement_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// In-memory sink for formatted `tracing` output.
#[derive(Clone, Default)]
pub(super) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Run `f` with a subscriber writing into this sink.
    pub(super) fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub(super) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log mutex poisoned")).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .expect("log mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
