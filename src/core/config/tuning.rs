use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::validate_tuning;
use crate::core::errors::ConfigError;

/// Operational knobs read from the optional YAML tuning file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub embedding: EmbeddingTuning,
    pub index: IndexTuning,
    pub query: QueryTuning,
    pub conversation: ConversationTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingTuning {
    pub chunk_size: usize,
    pub max_attempts: usize,
    pub initial_backoff_secs: u64,
    pub inter_chunk_pause_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingTuning {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            max_attempts: 3,
            initial_backoff_secs: 5,
            inter_chunk_pause_ms: 1_000,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexTuning {
    pub upsert_batch_size: usize,
    pub readiness_poll_ms: u64,
    pub readiness_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for IndexTuning {
    fn default() -> Self {
        Self {
            upsert_batch_size: 100,
            readiness_poll_ms: 1_000,
            readiness_timeout_secs: 120,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryTuning {
    pub top_k: usize,
    pub execution_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    /// Run the structured and semantic paths side by side.
    pub concurrent_paths: bool,
    /// Only allow a single SELECT/WITH statement through to the row store.
    pub statement_guard: bool,
}

impl Default for QueryTuning {
    fn default() -> Self {
        Self {
            top_k: 3,
            execution_timeout_secs: 10,
            generation_timeout_secs: 60,
            concurrent_paths: false,
            statement_guard: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationTuning {
    pub max_turns: usize,
    pub grounding_turns: usize,
    /// Live HTTP sessions kept before the least recently used is dropped.
    pub max_sessions: usize,
}

impl Default for ConversationTuning {
    fn default() -> Self {
        Self {
            max_turns: 10,
            grounding_turns: 5,
            max_sessions: 1_000,
        }
    }
}

impl EmbeddingTuning {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_secs)
    }

    pub fn inter_chunk_pause(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_pause_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl IndexTuning {
    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl QueryTuning {
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

impl Tuning {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Tuning::default());
        }
        let value: Value = serde_yaml::from_str(contents).map_err(|e| ConfigError::Invalid {
            key: "tuning".to_string(),
            reason: e.to_string(),
        })?;
        let value = match value {
            Value::Null => return Ok(Tuning::default()),
            other => other,
        };
        validate_tuning(&value)?;
        serde_json::from_value(value).map_err(|e| ConfigError::Invalid {
            key: "tuning".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let tuning = Tuning::default();
        assert_eq!(tuning.embedding.chunk_size, 50);
        assert_eq!(tuning.embedding.max_attempts, 3);
        assert_eq!(tuning.embedding.initial_backoff(), Duration::from_secs(5));
        assert_eq!(tuning.index.upsert_batch_size, 100);
        assert_eq!(tuning.query.top_k, 3);
        assert_eq!(tuning.conversation.max_turns, 10);
        assert_eq!(tuning.conversation.grounding_turns, 5);
        assert_eq!(tuning.conversation.max_sessions, 1_000);
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let tuning = Tuning::from_yaml_str(
            "embedding:\n  chunk_size: 20\nquery:\n  concurrent_paths: true\n",
        )
        .unwrap();
        assert_eq!(tuning.embedding.chunk_size, 20);
        assert_eq!(tuning.embedding.max_attempts, 3);
        assert!(tuning.query.concurrent_paths);
        assert!(!tuning.query.statement_guard);
    }

    #[test]
    fn empty_document_is_default() {
        let tuning = Tuning::from_yaml_str("").unwrap();
        assert_eq!(tuning.index.upsert_batch_size, 100);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Tuning::from_yaml_str("index:\n  upsert_batch_size: 0\n").is_err());
        assert!(Tuning::from_yaml_str("conversation:\n  max_sessions: 0\n").is_err());
    }
}
