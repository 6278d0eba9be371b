//! File-backed storage.
//!
//! - The SSoT document is one pretty-printed JSON file, replaced atomically
//!   (write temp file, fsync, rename).
//! - History is a directory with one `<intent_id>.json` per record, created
//!   with `create_new` so that records are never overwritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::graph::Ssot;
use crate::intent::IntentId;
use crate::storage::traits::{DocumentStore, HistoryRecord, HistoryStore, StorageError};

/// SSoT document stored as a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileDocumentStore {
    path: PathBuf,
}

impl JsonFileDocumentStore {
    /// A store backed by the file at `path`; nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonFileDocumentStore {
    fn load(&self) -> Result<Ssot, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::DocumentNotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, ssot: &Ssot) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let temp_path = self
            .path
            .with_extension(format!("json.tmp.{}", Uuid::new_v4()));

        let written = write_json(&temp_path, ssot, false);
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::from(e)
        })
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, create_new: bool) -> Result<(), StorageError> {
    let file = if create_new {
        OpenOptions::new().write(true).create_new(true).open(path)
    } else {
        File::create(path)
    };
    let file = file.map_err(|e| {
        if e.kind() == ErrorKind::AlreadyExists {
            StorageError::DuplicateKey(path.display().to_string())
        } else {
            StorageError::from(e)
        }
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// History stored as one JSON file per intent.
#[derive(Debug, Clone)]
pub struct JsonDirHistoryStore {
    dir: PathBuf,
}

impl JsonDirHistoryStore {
    /// Opens (and creates if needed) the history directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, id: &IntentId) -> Result<PathBuf, StorageError> {
        let name = id.as_str();
        let safe = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !name.starts_with('.');
        if !safe {
            return Err(StorageError::Backend(format!(
                "intent id '{name}' is not usable as a file name"
            )));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl HistoryStore for JsonDirHistoryStore {
    fn append(&self, record: &HistoryRecord) -> Result<(), StorageError> {
        let path = self.record_path(&record.intent_id)?;
        write_json(&path, record, true).map_err(|e| match e {
            StorageError::DuplicateKey(_) => StorageError::DuplicateKey(record.intent_id.to_string()),
            other => other,
        })
    }

    fn get(&self, id: &IntentId) -> Result<Option<HistoryRecord>, StorageError> {
        let path = self.record_path(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            out.push(serde_json::from_slice::<HistoryRecord>(&bytes)?);
        }
        out.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.intent_id.cmp(&b.intent_id))
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    use crate::graph::{CollaborationMode, Node};
    use crate::intent::{IntentMetadata, IntentType};
    use crate::value::Map;

    fn record(id: &str) -> HistoryRecord {
        let now = Utc::now();
        HistoryRecord {
            intent_id: IntentId::from(id),
            timestamp: now,
            intent_type: IntentType::AddNeed,
            params: Map::new(),
            metadata: IntentMetadata::default().resolve(now),
            state_fingerprint: "abc".to_string(),
        }
    }

    #[test]
    fn document_save_replaces_file_atomically() {
        let dir = tempdir().unwrap();
        let store = JsonFileDocumentStore::new(dir.path().join("nested").join("ssot.json"));
        assert!(matches!(store.load(), Err(StorageError::DocumentNotFound(_))));

        let mut doc = Ssot::new("p", CollaborationMode::Autonomous);
        store.save(&doc).unwrap();
        doc.nodes.push(Node::new("Need", Map::new()));
        store.save(&doc).unwrap();

        assert_eq!(store.load().unwrap(), doc);
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn corrupt_document_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ssot.json");
        fs::write(&path, b"{not json").unwrap();
        let store = JsonFileDocumentStore::new(path);
        assert!(matches!(store.load(), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn history_records_are_immutable() {
        let dir = tempdir().unwrap();
        let store = JsonDirHistoryStore::open(dir.path().join("history")).unwrap();
        store.append(&record("intent-1")).unwrap();
        let err = store.append(&record("intent-1")).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(ref k) if k == "intent-1"));

        let loaded = store.get(&IntentId::from("intent-1")).unwrap().unwrap();
        assert_eq!(loaded.state_fingerprint, "abc");
        assert!(store.get(&IntentId::from("intent-2")).unwrap().is_none());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn history_rejects_path_like_ids() {
        let dir = tempdir().unwrap();
        let store = JsonDirHistoryStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.append(&record("../escape")),
            Err(StorageError::Backend(_))
        ));
    }
}
