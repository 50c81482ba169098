//! Configuration for the docent engine.
//!
//! A single YAML file configures the corpus location, retrieval depth, and
//! the model identifiers the provider crate uses. Missing fields fall back
//! to defaults, so an empty file is valid. Resolution precedence (flags >
//! env > file > defaults) is owned by the CLI; this module only loads and
//! validates.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CORPUS_FILENAME, DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_TOP_K,
};
use crate::errors::DocentError;

// ============================================================================
// RetrievalConfig
// ============================================================================

/// Retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// Number of snippets retrieved per question.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

// ============================================================================
// ModelsConfig
// ============================================================================

/// Model identifiers passed to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelsConfig {
    /// Completion model identifier.
    pub completion: String,
    /// Embedding model identifier.
    pub embedding: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            completion: DEFAULT_COMPLETION_MODEL.to_string(),
            embedding: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

// ============================================================================
// DocentConfig
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocentConfig {
    /// Path to the corpus JSON file.
    pub corpus_path: PathBuf,
    /// Retrieval tuning.
    pub retrieval: RetrievalConfig,
    /// Model identifiers.
    pub models: ModelsConfig,
    /// Base URL of the OpenAI-compatible API.
    pub api_base_url: String,
}

impl Default for DocentConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from(CORPUS_FILENAME),
            retrieval: RetrievalConfig::default(),
            models: ModelsConfig::default(),
            api_base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl DocentConfig {
    /// Load configuration from a YAML file and validate it.
    pub fn load(path: &Path) -> Result<Self, DocentError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, DocentError> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), DocentError> {
        if self.retrieval.top_k == 0 {
            return Err(DocentError::InvalidConfiguration {
                message: "retrieval.topK must be at least 1".to_string(),
                hint: "Set retrieval.topK to a positive number (default: 5)".to_string(),
            });
        }
        if self.models.completion.trim().is_empty() {
            return Err(DocentError::InvalidConfiguration {
                message: "models.completion is empty".to_string(),
                hint: format!("Set models.completion (default: {})", DEFAULT_COMPLETION_MODEL),
            });
        }
        if self.models.embedding.trim().is_empty() {
            return Err(DocentError::InvalidConfiguration {
                message: "models.embedding is empty".to_string(),
                hint: format!("Set models.embedding (default: {})", DEFAULT_EMBEDDING_MODEL),
            });
        }
        if self.api_base_url.trim().is_empty() {
            return Err(DocentError::InvalidConfiguration {
                message: "apiBaseUrl is empty".to_string(),
                hint: "Set apiBaseUrl to an OpenAI-compatible endpoint".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = DocentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.top_k, DEFAULT_TOP_K);
        assert_eq!(config.models.completion, DEFAULT_COMPLETION_MODEL);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"retrieval:\n  topK: 3\n").unwrap();

        let config = DocentConfig::load(file.path()).unwrap();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.models.embedding, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn zero_top_k_is_rejected_with_hint() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"retrieval:\n  topK: 0\n").unwrap();

        let err = DocentConfig::load(file.path()).unwrap_err();
        match err {
            DocentError::InvalidConfiguration { message, hint } => {
                assert!(message.contains("topK"));
                assert!(hint.contains("positive"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            DocentConfig::load_or_default(Some(Path::new("/nonexistent/docent.yaml"))).unwrap();
        assert_eq!(config.retrieval.top_k, DEFAULT_TOP_K);
    }
}
