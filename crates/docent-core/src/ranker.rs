//! Similarity ranking over corpus candidates.
//!
//! This module provides:
//! - [`cosine_similarity`] - degenerate-input-safe cosine similarity
//! - [`rank`] - top-K candidates by similarity to a query embedding
//! - [`fallback_sample`] - unweighted random sample for degraded retrieval
//!
//! ## Failure policy
//!
//! Retrieval degrades, it never fails the turn. Mismatched-length or
//! zero-magnitude vectors score 0.0 instead of erroring, and when the query
//! embedding cannot be obtained at all the caller falls back to
//! [`fallback_sample`], which returns texts without scores.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::corpus::{CorpusEntry, StageKey};

// ============================================================================
// RetrievedSnippet
// ============================================================================

/// One retrieved corpus text.
///
/// `score` is absent on the degraded random-sample path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedSnippet {
    /// Stage the source corpus entry is tagged with.
    pub stage: StageKey,
    /// The snippet text.
    pub text: String,
    /// Cosine similarity to the query, when ranked; `None` when sampled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

// ============================================================================
// Cosine similarity
// ============================================================================

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Returns 0.0 for mismatched lengths or zero-magnitude inputs; never
/// panics on degenerate data.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

// ============================================================================
// Ranking
// ============================================================================

/// Rank candidates by cosine similarity to the query and return the top K.
///
/// Candidates with empty text are skipped. The sort is stable and
/// descending, so ties keep their corpus order.
pub fn rank(query: &[f32], candidates: &[&CorpusEntry], k: usize) -> Vec<RetrievedSnippet> {
    let mut scored: Vec<(f32, &CorpusEntry)> = candidates
        .iter()
        .filter(|entry| !entry.text.trim().is_empty())
        .map(|entry| (cosine_similarity(query, &entry.embedding), *entry))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(k)
        .map(|(score, entry)| RetrievedSnippet {
            stage: entry.stage,
            text: entry.text.clone(),
            score: Some(score),
        })
        .collect()
}

/// Unweighted random sample of up to K candidate texts, without scores.
///
/// Used when the query embedding or the corpus is unavailable: the turn
/// still gets "some plausible examples" instead of failing.
pub fn fallback_sample(candidates: &[&CorpusEntry], k: usize) -> Vec<RetrievedSnippet> {
    let usable: Vec<&CorpusEntry> = candidates
        .iter()
        .filter(|entry| !entry.text.trim().is_empty())
        .copied()
        .collect();

    let mut rng = rand::thread_rng();
    usable
        .choose_multiple(&mut rng, k.min(usable.len()))
        .map(|entry| RetrievedSnippet {
            stage: entry.stage,
            text: entry.text.clone(),
            score: None,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
