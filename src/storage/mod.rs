//! Persistence for the SSoT document and the intent history.
//!
//! Traits are defined in `traits`; `memory` and `file` provide backends.

pub mod file;
pub mod memory;
mod traits;

pub use file::{JsonDirHistoryStore, JsonFileDocumentStore};
pub use memory::{InMemoryDocumentStore, InMemoryHistoryStore};
pub use traits::{DocumentStore, HistoryRecord, HistoryStore, StorageError};
