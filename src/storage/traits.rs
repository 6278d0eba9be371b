//! Abstract storage traits for the SSoT document and the intent history.
//!
//! The engine persists through these traits so that callers can choose
//! in-memory backends (tests, embedded use) or file-backed ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::Ssot;
use crate::intent::{IntentId, IntentType, ResolvedMetadata};
use crate::value::Map;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No document has been stored yet.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Backing store for the full SSoT document.
///
/// `save` overwrites the whole document; there is no partial write.
pub trait DocumentStore: Send + Sync {
    /// Load the stored document.
    fn load(&self) -> Result<Ssot, StorageError>;

    /// Replace the stored document.
    fn save(&self, ssot: &Ssot) -> Result<(), StorageError>;
}

/// Immutable audit entry for one successfully executed intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Id of the committed intent.
    pub intent_id: IntentId,
    /// Intent timestamp.
    pub timestamp: DateTime<Utc>,
    /// Intent type tag.
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    /// Parameters as submitted.
    pub params: Map,
    /// Resolved intent metadata.
    pub metadata: ResolvedMetadata,
    /// Fingerprint of the SSoT right after the intent committed.
    pub state_fingerprint: String,
}

/// Append-only history keyed by intent id.
pub trait HistoryStore: Send + Sync {
    /// Append a record. Returns `DuplicateKey` if the intent id is taken.
    fn append(&self, record: &HistoryRecord) -> Result<(), StorageError>;

    /// Get a record by intent id.
    fn get(&self, id: &IntentId) -> Result<Option<HistoryRecord>, StorageError>;

    /// All records ordered by timestamp (ties by intent id).
    fn list(&self) -> Result<Vec<HistoryRecord>, StorageError>;
}
