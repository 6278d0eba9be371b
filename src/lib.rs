//! # ssot - Requirements knowledge graph with intents and quality criteria
//!
//! The crate maintains a single mutable knowledge graph (the "single source
//! of truth", SSoT) of requirements-engineering artifacts and their
//! relations. Callers change it only through named, schema-checked
//! operations (intents); a separate rule engine audits its quality.
//!
//! ## Core Concepts
//!
//! - **Ssot**: typed nodes and edges plus derived indexes
//! - **Intent**: a validated, atomic request to change the graph
//! - **IntentEngine**: validate, snapshot, mutate, reindex, persist, or roll back
//! - **CriteriaEngine**: declarative rules producing diagnostics and a quality score
//! - **QualityGate**: pass/fail thresholds over an evaluation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ssot::{EffectiveSchema, Intent, IntentCatalog, IntentEngine, Ssot, CollaborationMode};
//!
//! let schema = Arc::new(EffectiveSchema::new(["Need"], Vec::<String>::new()));
//! let mut engine = IntentEngine::new(
//!     Ssot::new("re-1", CollaborationMode::Copilot),
//!     schema,
//!     Arc::new(IntentCatalog::standard()),
//! );
//! let mut params = ssot::value::Map::new();
//! params.insert("statement".into(), "Users can reset passwords".into());
//! let result = engine.execute(Intent::new("AddNeed", params));
//! assert!(result.success);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod criteria;
pub mod document;
pub mod engine;
pub mod error;
pub mod graph;
pub mod intent;
pub mod patch;
pub mod schema;
pub mod storage;
pub mod value;

pub use config::{EngineConfig, SsotConfig};
pub use criteria::{
    check_quality_gate, CriteriaEngine, CriteriaEvaluation, CriteriaRule, Diagnostic, QualityGate,
    RuleCatalog, Severity,
};
pub use engine::IntentEngine;
pub use error::{ErrorCode, ExecutionError, SsotError, SsotResult, ValidationError};
pub use graph::{CollaborationMode, Edge, EdgeKey, Node, NodeId, Ssot};
pub use intent::{Intent, IntentCatalog, IntentResult, IntentType};
pub use patch::{apply_patch, PatchOperation};
pub use schema::{EdgeDefinition, EffectiveSchema};
pub use storage::{DocumentStore, HistoryStore, StorageError};
pub use value::Value;
