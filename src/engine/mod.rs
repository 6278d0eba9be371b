//! Intent execution engine.
//!
//! [`IntentEngine`] owns the SSoT and is its only writer. Each call to
//! [`IntentEngine::execute`] runs validate, snapshot, mutate, reindex and
//! persist as one unit; any failure after validation restores the snapshot.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::SsotResult;
use crate::graph::{CollaborationMode, Ssot};
use crate::intent::handlers::{self, HandlerContext};
use crate::intent::{validate_intent, Change, Intent, IntentCatalog, IntentResult, ResolvedMetadata};
use crate::schema::EffectiveSchema;
use crate::storage::{DocumentStore, HistoryRecord, HistoryStore, StorageError};

/// Single-writer executor for intents.
pub struct IntentEngine {
    ssot: Ssot,
    schema: Arc<EffectiveSchema>,
    catalog: Arc<IntentCatalog>,
    config: EngineConfig,
    documents: Option<Arc<dyn DocumentStore>>,
    history: Option<Arc<dyn HistoryStore>>,
}

impl std::fmt::Debug for IntentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentEngine")
            .field("nodes", &self.ssot.nodes.len())
            .field("edges", &self.ssot.edges.len())
            .field("config", &self.config)
            .field("has_document_store", &self.documents.is_some())
            .field("has_history_store", &self.history.is_some())
            .finish()
    }
}

impl IntentEngine {
    /// Create an engine over an in-memory document, without persistence.
    #[must_use]
    pub fn new(mut ssot: Ssot, schema: Arc<EffectiveSchema>, catalog: Arc<IntentCatalog>) -> Self {
        ssot.rebuild_indexes();
        Self {
            ssot,
            schema,
            catalog,
            config: EngineConfig::default(),
            documents: None,
            history: None,
        }
    }

    /// Load the document from `store` and persist future intents through it.
    ///
    /// A store that holds no document yet yields a fresh empty graph using
    /// `config.profile_version`.
    pub fn open(
        store: Arc<dyn DocumentStore>,
        schema: Arc<EffectiveSchema>,
        catalog: Arc<IntentCatalog>,
        config: EngineConfig,
    ) -> SsotResult<Self> {
        let config = config.validate()?;
        let ssot = match store.load() {
            Ok(doc) => doc,
            Err(StorageError::DocumentNotFound(location)) => {
                info!(%location, "no stored document; starting empty graph");
                Ssot::new(config.profile_version.clone(), CollaborationMode::default())
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(ssot, schema, catalog)
            .with_config(config)
            .with_document_store(store))
    }

    /// Replaces the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches the store used for autosave.
    #[must_use]
    pub fn with_document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(store);
        self
    }

    /// Attaches the store that receives history records.
    #[must_use]
    pub fn with_history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Current graph.
    #[must_use]
    pub fn ssot(&self) -> &Ssot {
        &self.ssot
    }

    /// Owned copy of the current graph, for evaluation or export.
    #[must_use]
    pub fn snapshot(&self) -> Ssot {
        self.ssot.clone()
    }

    /// Schema used for validation and edge checks.
    #[must_use]
    pub fn schema(&self) -> &Arc<EffectiveSchema> {
        &self.schema
    }

    /// Catalog of known intents.
    #[must_use]
    pub fn catalog(&self) -> &Arc<IntentCatalog> {
        &self.catalog
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one intent.
    ///
    /// Never panics and never returns an error: validation failures and
    /// rolled-back executions are reported inside the [`IntentResult`].
    pub fn execute(&mut self, intent: Intent) -> IntentResult {
        let metadata = intent
            .metadata
            .clone()
            .unwrap_or_default()
            .resolve(Utc::now());
        let intent_id = metadata.intent_id.clone();

        let errors = validate_intent(&intent, &self.catalog, &self.schema, &self.ssot);
        if !errors.is_empty() {
            warn!(
                intent_id = %intent_id,
                intent_type = %intent.intent_type,
                errors = errors.len(),
                "intent rejected by validation"
            );
            return IntentResult::rejected(intent_id, &errors);
        }

        let snapshot = self.ssot.clone();
        match self.apply(&intent, &metadata) {
            Ok(changes) => {
                info!(
                    intent_id = %intent_id,
                    intent_type = %intent.intent_type,
                    changes = changes.len(),
                    "intent committed"
                );
                IntentResult::applied(intent_id, changes)
            }
            Err(err) => {
                warn!(
                    intent_id = %intent_id,
                    intent_type = %intent.intent_type,
                    error = %err,
                    "intent failed; rolling back"
                );
                self.ssot = snapshot.clone();
                if err.is_storage() {
                    self.restore_document();
                }
                IntentResult::rolled_back(intent_id, &err, snapshot)
            }
        }
    }

    fn apply(&mut self, intent: &Intent, metadata: &ResolvedMetadata) -> SsotResult<Vec<Change>> {
        let ctx = HandlerContext {
            schema: &self.schema,
            metadata,
        };
        let changes = handlers::dispatch(&mut self.ssot, intent, &ctx)?;

        self.ssot.meta.last_updated = Utc::now();
        self.ssot.rebuild_indexes();
        debug!(
            nodes = self.ssot.nodes.len(),
            edges = self.ssot.edges.len(),
            "indexes rebuilt"
        );

        self.persist(intent, metadata)?;
        Ok(changes)
    }

    fn persist(&self, intent: &Intent, metadata: &ResolvedMetadata) -> Result<(), StorageError> {
        if self.config.autosave {
            if let Some(store) = &self.documents {
                store.save(&self.ssot)?;
            }
        }
        if self.config.record_history {
            if let Some(history) = &self.history {
                history.append(&HistoryRecord {
                    intent_id: metadata.intent_id.clone(),
                    timestamp: metadata.timestamp,
                    intent_type: intent.intent_type.clone(),
                    params: intent.params.clone(),
                    metadata: metadata.clone(),
                    state_fingerprint: self.ssot.fingerprint(),
                })?;
            }
        }
        Ok(())
    }

    /// Rewrites the restored graph after a failed persistence stage.
    fn restore_document(&self) {
        if !self.config.autosave {
            return;
        }
        let Some(store) = &self.documents else {
            return;
        };
        if let Err(e) = store.save(&self.ssot) {
            warn!(error = %e, "failed to restore document after rollback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::ErrorCode;
    use crate::graph::NodeId;
    use crate::intent::{ChangeType, IntentId, IntentMetadata};
    use crate::schema::EdgeDefinition;
    use crate::storage::{InMemoryDocumentStore, InMemoryHistoryStore};
    use crate::value::{Map, Value};

    fn schema() -> Arc<EffectiveSchema> {
        Arc::new(
            EffectiveSchema::new(["Need", "Requirement", "Stakeholder"], Vec::<String>::new())
                .with_edge("refinesTo", EdgeDefinition::new(["Need"], ["Requirement"]))
                .with_edge("expresses", EdgeDefinition::new(["Stakeholder"], ["Need"])),
        )
    }

    fn engine() -> IntentEngine {
        IntentEngine::new(
            Ssot::new("p", CollaborationMode::Copilot),
            schema(),
            Arc::new(IntentCatalog::standard()),
        )
    }

    fn params(pairs: &[(&str, Value)]) -> Map {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[derive(Default)]
    struct FailingStore {
        saves: AtomicUsize,
        fail_first: usize,
    }

    impl DocumentStore for FailingStore {
        fn load(&self) -> Result<Ssot, StorageError> {
            Err(StorageError::DocumentNotFound("failing".into()))
        }

        fn save(&self, _ssot: &Ssot) -> Result<(), StorageError> {
            let n = self.saves.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(StorageError::Io("disk full".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn add_node_commits_and_reindexes() {
        let mut engine = engine();
        let before = engine.ssot().meta.last_updated;
        let result = engine.execute(Intent::new(
            "AddNode",
            params(&[("kind", "Need".into())]),
        ));
        assert!(result.success, "{result:?}");
        assert_eq!(result.changes()[0].change_type, ChangeType::NodeAdded);
        assert_eq!(engine.ssot().nodes.len(), 1);
        let idx = engine.ssot().indexes.as_ref().unwrap();
        assert_eq!(idx.nodes_of_kind("Need").len(), 1);
        assert!(engine.ssot().meta.last_updated >= before);
    }

    #[test]
    fn validation_failure_leaves_graph_untouched() {
        let mut engine = engine();
        let before = engine.snapshot();
        let result = engine.execute(Intent::new(
            "AddEdge",
            params(&[
                ("from", "ghost".into()),
                ("edge_kind", "refinesTo".into()),
            ]),
        ));
        assert!(!result.success);
        assert!(result.rollback.is_none());
        assert_eq!(
            result.error_codes(),
            vec![ErrorCode::InvalidNodeRef, ErrorCode::MissingParameter]
        );
        assert_eq!(engine.ssot(), &before);
    }

    #[test]
    fn caller_supplied_intent_id_is_kept() {
        let mut engine = engine();
        let intent = Intent::new("AddNeed", params(&[("statement", "x".into())])).with_metadata(
            IntentMetadata {
                intent_id: Some(IntentId::from("fixed-id")),
                ..IntentMetadata::default()
            },
        );
        let result = engine.execute(intent);
        assert_eq!(result.intent_id.as_str(), "fixed-id");
        let node = &engine.ssot().nodes[0];
        assert_eq!(
            node.metadata.originating_intent_id,
            Some(IntentId::from("fixed-id"))
        );
    }

    #[test]
    fn unimplemented_intent_rolls_back() {
        let mut engine = engine();
        engine.execute(Intent::new("AddNeed", params(&[("statement", "a".into())])));
        let need = engine.ssot().nodes[0].id.clone();
        let before = engine.snapshot();

        let result = engine.execute(Intent::new(
            "AddValidationQuestion",
            params(&[
                ("target_id", need.as_str().into()),
                ("question", "why?".into()),
            ]),
        ));
        assert!(!result.success);
        assert_eq!(result.error_codes(), vec![ErrorCode::ExecutionFailed]);
        assert!(result.errors.as_ref().unwrap()[0]
            .message
            .contains("not implemented"));
        assert_eq!(
            result.rollback.map(|r| r.original_state_snapshot),
            Some(before.clone())
        );
        assert_eq!(engine.ssot(), &before);
    }

    #[test]
    fn history_records_each_committed_intent() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let mut engine = engine().with_history_store(history.clone());
        let ok = engine.execute(Intent::new("AddNeed", params(&[("statement", "a".into())])));
        let failed = engine.execute(Intent::new(
            "DeleteNode",
            params(&[("node_id", "missing".into())]),
        ));
        assert!(ok.success);
        assert!(!failed.success);

        let records = history.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].intent_id, ok.intent_id);
        assert_eq!(records[0].state_fingerprint, engine.ssot().fingerprint());
    }

    #[test]
    fn history_disabled_by_config() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let mut engine = engine()
            .with_history_store(history.clone())
            .with_config(EngineConfig {
                record_history: false,
                ..EngineConfig::default()
            });
        assert!(engine
            .execute(Intent::new("AddNeed", params(&[("statement", "a".into())])))
            .success);
        assert!(history.list().unwrap().is_empty());
    }

    #[test]
    fn autosave_writes_document() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut engine = IntentEngine::open(
            store.clone(),
            schema(),
            Arc::new(IntentCatalog::standard()),
            EngineConfig {
                autosave: true,
                ..EngineConfig::default()
            },
        )
        .unwrap();
        engine.execute(Intent::new("AddNeed", params(&[("statement", "a".into())])));
        let saved = store.load().unwrap();
        assert_eq!(saved.nodes.len(), 1);
        assert_eq!(store.save_count().unwrap(), 1);
    }

    #[test]
    fn failed_save_rolls_back_and_restores() {
        let store = Arc::new(FailingStore {
            fail_first: 1,
            ..FailingStore::default()
        });
        let mut engine = IntentEngine::open(
            store.clone(),
            schema(),
            Arc::new(IntentCatalog::standard()),
            EngineConfig {
                autosave: true,
                ..EngineConfig::default()
            },
        )
        .unwrap();
        let result = engine.execute(Intent::new("AddNeed", params(&[("statement", "a".into())])));
        assert!(!result.success);
        assert!(result.errors.as_ref().unwrap()[0].message.contains("disk full"));
        assert!(engine.ssot().nodes.is_empty());
        // One failed save plus the restore of the snapshot.
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn open_surfaces_non_missing_storage_errors() {
        struct Broken;
        impl DocumentStore for Broken {
            fn load(&self) -> Result<Ssot, StorageError> {
                Err(StorageError::Serialization("bad".into()))
            }
            fn save(&self, _: &Ssot) -> Result<(), StorageError> {
                Ok(())
            }
        }
        let err = IntentEngine::open(
            Arc::new(Broken),
            schema(),
            Arc::new(IntentCatalog::standard()),
            EngineConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn delete_node_reports_removed_node() {
        let mut engine = engine();
        engine.execute(Intent::new("AddNeed", params(&[("statement", "a".into())])));
        let id: NodeId = engine.ssot().nodes[0].id.clone();
        let result = engine.execute(Intent::new(
            "DeleteNode",
            params(&[("node_id", id.as_str().into())]),
        ));
        assert!(result.success);
        assert!(engine.ssot().nodes.is_empty());
        assert!(engine.ssot().indexes.as_ref().unwrap().nodes_of_kind("Need").is_empty());
    }
}
