//! In-memory storage backend.
//!
//! Thread-safe implementations of the storage traits for embedded usage and
//! tests.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::graph::Ssot;
use crate::intent::IntentId;
use crate::storage::traits::{DocumentStore, HistoryRecord, HistoryStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Holds the most recently saved document.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<DocumentState>,
}

#[derive(Debug, Default)]
struct DocumentState {
    document: Option<Ssot>,
    saves: u64,
}

impl InMemoryDocumentStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with `ssot` (not counted as a save).
    #[must_use]
    pub fn with_document(ssot: Ssot) -> Self {
        Self {
            state: RwLock::new(DocumentState {
                document: Some(ssot),
                saves: 0,
            }),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> Result<u64, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("document.save_count"))?;
        Ok(state.saves)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn load(&self) -> Result<Ssot, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("document.load"))?;
        state
            .document
            .clone()
            .ok_or_else(|| StorageError::DocumentNotFound("in-memory".to_string()))
    }

    fn save(&self, ssot: &Ssot) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("document.save"))?;
        state.document = Some(ssot.clone());
        state.saves += 1;
        Ok(())
    }
}

/// Append-only in-memory history.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<BTreeMap<IntentId, HistoryRecord>>,
}

impl InMemoryHistoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn append(&self, record: &HistoryRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| lock_err("history.append"))?;
        if records.contains_key(&record.intent_id) {
            return Err(StorageError::DuplicateKey(record.intent_id.to_string()));
        }
        records.insert(record.intent_id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, id: &IntentId) -> Result<Option<HistoryRecord>, StorageError> {
        let records = self.records.read().map_err(|_| lock_err("history.get"))?;
        Ok(records.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        let records = self.records.read().map_err(|_| lock_err("history.list"))?;
        let mut out: Vec<HistoryRecord> = records.values().cloned().collect();
        out.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.intent_id.cmp(&b.intent_id))
        });
        Ok(out)
    }
}
