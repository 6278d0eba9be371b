//! JSON (de)serialization helpers for documents and configuration.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{SsotError, SsotResult};

/// Parses any document type from JSON text.
pub fn from_json<T: DeserializeOwned>(text: &str) -> SsotResult<T> {
    serde_json::from_str(text).map_err(|e| SsotError::document(e.to_string()))
}

/// Renders any document type as pretty-printed JSON.
pub fn to_json_pretty<T: Serialize>(value: &T) -> SsotResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| SsotError::internal(format!("failed to serialize document: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CollaborationMode, Ssot};

    #[test]
    fn ssot_document_roundtrip() {
        let doc = Ssot::new("p-1", CollaborationMode::Copilot);
        let text = to_json_pretty(&doc).unwrap();
        assert!(text.contains("\"collaboration_mode\": \"copilot\""));
        let back: Ssot = from_json(&text).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn malformed_input_is_a_document_error() {
        let err = from_json::<Ssot>("[1, 2").unwrap_err();
        assert!(err.is_document());
        assert!(!err.is_internal());
        assert!(err.to_string().starts_with("Malformed document: "));
    }
}
