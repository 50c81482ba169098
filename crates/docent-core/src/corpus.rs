//! Corpus store: stage-tagged reference texts with precomputed embeddings.
//!
//! This module provides:
//! - [`StageKey`] - corpus tag for the four answerable stages
//! - [`CorpusEntry`] - one immutable stage-tagged embedded text
//! - [`CorpusStore`] - the in-memory corpus, loaded once per process
//!
//! ## Caching
//!
//! The store is a memoization, not a correctness-critical singleton: the
//! process-wide cache is lazily initialized on first access, and concurrent
//! first accesses may each load the file redundantly — the first to finish
//! wins and the duplicates are dropped. No invalidation path exists other
//! than process restart; an explicit reload is a fresh [`CorpusStore::load`].

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::errors::DocentError;
use crate::stage::Stage;

// ============================================================================
// StageKey
// ============================================================================

/// Corpus tag for the four answerable critique stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKey {
    /// Reference texts for the Description stage.
    Description,
    /// Reference texts for the Analysis stage.
    Analysis,
    /// Reference texts for the Interpretation stage.
    Interpretation,
    /// Reference texts for the Judgment stage.
    Judgment,
}

impl StageKey {
    /// The stage key a dialogue stage retrieves against, if any.
    pub fn for_stage(stage: Stage) -> Option<StageKey> {
        match stage {
            Stage::Description => Some(Self::Description),
            Stage::Analysis => Some(Self::Analysis),
            Stage::Interpretation => Some(Self::Interpretation),
            Stage::Judgment => Some(Self::Judgment),
            Stage::Complete => None,
        }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Description => write!(f, "description"),
            Self::Analysis => write!(f, "analysis"),
            Self::Interpretation => write!(f, "interpretation"),
            Self::Judgment => write!(f, "judgment"),
        }
    }
}

// ============================================================================
// CorpusEntry
// ============================================================================

/// One stage-tagged reference text with its precomputed embedding.
///
/// Immutable after load; embeddings are produced upstream and supplied as
/// flat vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// The stage this text belongs to.
    pub stage: StageKey,
    /// The reference text (an example critique fragment for the stage).
    pub text: String,
    /// Precomputed embedding vector.
    pub embedding: Vec<f32>,
}

// ============================================================================
// CorpusStore
// ============================================================================

/// The in-memory corpus, preserving file order.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    entries: Vec<CorpusEntry>,
}

static CORPUS_CACHE: OnceLock<Arc<CorpusStore>> = OnceLock::new();

impl CorpusStore {
    /// Build a store from already-parsed entries (used by tests and reload).
    pub fn from_entries(entries: Vec<CorpusEntry>) -> Self {
        Self { entries }
    }

    /// Load the corpus from a JSON file: an array of
    /// `{stage, text, embedding}` objects.
    pub fn load(path: &Path) -> Result<Self, DocentError> {
        let raw = fs::read_to_string(path).map_err(|e| DocentError::CorpusIo {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let entries: Vec<CorpusEntry> =
            serde_json::from_str(&raw).map_err(|e| DocentError::CorpusParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        tracing::debug!("Loaded {} corpus entries from {}", entries.len(), path.display());
        Ok(Self::from_entries(entries))
    }

    /// Process-wide cached store, loaded at most once.
    ///
    /// Concurrent first calls may load redundantly; the first completed load
    /// is kept. Later calls ignore `path`.
    pub fn shared(path: &Path) -> Result<Arc<CorpusStore>, DocentError> {
        if let Some(store) = CORPUS_CACHE.get() {
            return Ok(Arc::clone(store));
        }
        let loaded = Arc::new(Self::load(path)?);
        Ok(Arc::clone(CORPUS_CACHE.get_or_init(|| loaded)))
    }

    /// All entries, in file order.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// Entries tagged with the given stage key, in file order.
    ///
    /// An empty result is normal: a stage with no corpus texts retrieves
    /// nothing and the rest of the turn proceeds.
    pub fn entries_for(&self, key: StageKey) -> Vec<&CorpusEntry> {
        self.entries.iter().filter(|e| e.stage == key).collect()
    }

    /// Number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_entries() -> Vec<CorpusEntry> {
        vec![
            CorpusEntry {
                stage: StageKey::Description,
                text: "화면 왼쪽에 큰 나무가 서 있다".to_string(),
                embedding: vec![1.0, 0.0, 0.0],
            },
            CorpusEntry {
                stage: StageKey::Analysis,
                text: "수직의 나무와 수평의 지평선이 대비를 이룬다".to_string(),
                embedding: vec![0.0, 1.0, 0.0],
            },
            CorpusEntry {
                stage: StageKey::Description,
                text: "하늘은 짙은 파란색으로 칠해져 있다".to_string(),
                embedding: vec![0.0, 0.0, 1.0],
            },
        ]
    }

    #[test]
    fn entries_for_filters_and_keeps_order() {
        let store = CorpusStore::from_entries(sample_entries());
        let description = store.entries_for(StageKey::Description);
        assert_eq!(description.len(), 2);
        assert!(description[0].text.contains("나무"));
        assert!(description[1].text.contains("하늘"));

        assert!(store.entries_for(StageKey::Judgment).is_empty());
    }

    #[test]
    fn load_parses_corpus_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&sample_entries()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let store = CorpusStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.entries()[1].stage, StageKey::Analysis);
    }

    #[test]
    fn load_missing_file_is_corpus_io() {
        let err = CorpusStore::load(Path::new("/nonexistent/corpus.json")).unwrap_err();
        assert!(matches!(err, DocentError::CorpusIo { .. }));
    }

    #[test]
    fn load_malformed_file_is_corpus_parse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let err = CorpusStore::load(file.path()).unwrap_err();
        assert!(matches!(err, DocentError::CorpusParse { .. }));
    }

    #[test]
    fn stage_key_mapping() {
        assert_eq!(StageKey::for_stage(Stage::Description), Some(StageKey::Description));
        assert_eq!(StageKey::for_stage(Stage::Judgment), Some(StageKey::Judgment));
        assert_eq!(StageKey::for_stage(Stage::Complete), None);
    }
}
