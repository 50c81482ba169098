//! Utterance classification: question or answer.
//!
//! Each user turn either asks for help (QUESTION — the docent explains the
//! current stage) or advances the critique (ANSWER — the docent moves to the
//! next stage). Classification is keyword-based and order-sensitive:
//!
//! 1. Complaint/negative-feedback phrases are checked FIRST and classify as
//!    ANSWER. "왜 안 돼?" is frustration, not an information request, even
//!    though it contains an interrogative and a question mark.
//! 2. Question markers (punctuation, interrogatives, requests for
//!    explanation/example/help, expressions of confusion) classify as
//!    QUESTION.
//! 3. Everything else is an ANSWER.
//!
//! The precedence of step 1 over step 2 is a correctness requirement, not a
//! style choice: complaint phrases share substrings with question markers.

use serde::{Deserialize, Serialize};

// ============================================================================
// Utterance
// ============================================================================

/// Classification of a single user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Utterance {
    /// The user is asking for explanation or help; the stage does not advance.
    Question,
    /// The user gave a substantive answer; the stage advances.
    Answer,
}

// ============================================================================
// Classifier trait
// ============================================================================

/// Pluggable classification capability.
///
/// The shipped implementation is keyword-based; a trained classifier can
/// replace it without changing the contract.
pub trait UtteranceClassifier: Send + Sync {
    /// Classify the text projection of a user turn.
    fn classify(&self, text: &str) -> Utterance;
}

// ============================================================================
// Keyword tables
// ============================================================================

/// Complaint and negative-feedback phrases.
///
/// Matched before question markers; any hit classifies as ANSWER.
const COMPLAINT_PHRASES: &[&str] = &[
    "왜 안",
    "안 돼",
    "안돼",
    "안되",
    "안 나와",
    "오류",
    "에러",
    "버그",
    "이상해",
    "이상한데",
    "작동을 안",
    "멈췄",
    "느려",
    "답답",
    "짜증",
    "고장",
];

/// Question markers: punctuation, interrogatives, requests for
/// explanation/example/help, expressions of confusion.
const QUESTION_MARKERS: &[&str] = &[
    "?",
    "？",
    "뭐",
    "무엇",
    "무슨",
    "어떻게",
    "어떤",
    "어디",
    "누구",
    "언제",
    "왜",
    "설명",
    "알려",
    "가르쳐",
    "예시",
    "예를 들",
    "도와",
    "도움",
    "모르겠",
    "궁금",
    "무슨 뜻",
    "what",
    "how",
    "why",
    "explain",
    "example",
    "help",
];

// ============================================================================
// KeywordClassifier
// ============================================================================

/// Default keyword-rule classifier.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Create a new keyword classifier.
    pub fn new() -> Self {
        Self
    }
}

impl UtteranceClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Utterance {
        classify(text)
    }
}

/// Classify a user turn with the keyword rules.
///
/// Matching is case-insensitive for the Latin-alphabet markers.
pub fn classify(text: &str) -> Utterance {
    let lowered = text.to_lowercase();

    // Exclusion check first; it must short-circuit question detection.
    if COMPLAINT_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
    {
        return Utterance::Answer;
    }

    if QUESTION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return Utterance::Question;
    }

    Utterance::Answer
}

// ============================================================================
// Tests
// ============================================================================
