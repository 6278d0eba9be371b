//! Engine and quality-gate configuration.

use serde::{Deserialize, Serialize};

use crate::criteria::QualityGate;
use crate::error::{SsotError, SsotResult};

/// Behavior of [`IntentEngine`](crate::engine::IntentEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Save the full document after every successful intent.
    pub autosave: bool,
    /// Append a history record after every successful intent.
    pub record_history: bool,
    /// Profile version stamped on freshly created documents.
    pub profile_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave: false,
            record_history: true,
            profile_version: "re-profile-1.0".to_string(),
        }
    }
}

impl EngineConfig {
    /// Rejects an empty `profile_version`.
    pub fn validate(self) -> SsotResult<Self> {
        if self.profile_version.trim().is_empty() {
            return Err(SsotError::invalid_config(
                "profile_version",
                "must not be empty",
            ));
        }
        Ok(self)
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsotConfig {
    /// Engine behavior.
    pub engine: EngineConfig,
    /// Optional thresholds applied to criteria evaluations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_gate: Option<QualityGate>,
}

impl SsotConfig {
    /// Validates every section.
    pub fn validate(self) -> SsotResult<Self> {
        let engine = self.engine.validate()?;
        let quality_gate = self.quality_gate.map(QualityGate::validate).transpose()?;
        Ok(Self {
            engine,
            quality_gate,
        })
    }
}
