//! Intents: named, schema-checked requests to change the SSoT.
//!
//! This module provides:
//! - The intent envelope and type tags
//! - The intent catalog (declared parameters per type)
//! - Pre-mutation validation
//! - Mutation handlers and their change records

mod catalog;
pub(crate) mod handlers;
mod params;
mod result;
mod types;
mod validation;

pub use catalog::{IntentCatalog, IntentDefinition, ParamDecl, ParamType};
pub use result::{Change, ChangeType, IntentError, IntentResult, Rollback};
pub use types::{Intent, IntentId, IntentMetadata, IntentSource, IntentType, ResolvedMetadata};
pub use validation::validate_intent;
