//! Critique stage tracking.
//!
//! This module provides:
//! - [`Stage`] - the ordered critique phases plus terminal `Complete`
//! - [`detect_stage`] - derive the current stage from the transcript
//!
//! ## Implicit state
//!
//! The stage is never persisted as a separate field. It is re-derived on
//! every call by scanning prior assistant turns for stage markers, which
//! makes detection idempotent and replay-safe. The flip side: every
//! generated transition must carry the `N단계 이름` marker, and the terminal
//! message must carry the completion sentinel, or detection falls back to
//! Description. The assembler's templates and fixed fallbacks guarantee the
//! markers are always present.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::COMPLETION_SENTINEL;
use crate::transcript::{ConversationTurn, Role};

// ============================================================================
// Stage
// ============================================================================

/// One of the four ordered critique phases, or the terminal state reached
/// after the Judgment answer has been processed.
///
/// Ordering follows the critique flow: Description < Analysis <
/// Interpretation < Judgment < Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// 1단계 묘사 — what do you see?
    Description,
    /// 2단계 분석 — composition, contrast, balance.
    Analysis,
    /// 3단계 해석 — meaning, context, symbolism.
    Interpretation,
    /// 4단계 판단 — grounded evaluation.
    Judgment,
    /// All four stages answered; the dialogue is finished.
    Complete,
}

impl Stage {
    /// The four answerable stages, in order.
    pub const ALL: [Stage; 4] = [
        Stage::Description,
        Stage::Analysis,
        Stage::Interpretation,
        Stage::Judgment,
    ];

    /// 1-based stage number (`Complete` has none).
    pub fn number(&self) -> Option<u8> {
        match self {
            Self::Description => Some(1),
            Self::Analysis => Some(2),
            Self::Interpretation => Some(3),
            Self::Judgment => Some(4),
            Self::Complete => None,
        }
    }

    /// The `N단계` number token used in stage markers.
    pub fn number_token(&self) -> Option<String> {
        self.number().map(|n| format!("{}단계", n))
    }

    /// Korean stage name used in markers and prompts.
    pub fn korean_name(&self) -> Option<&'static str> {
        match self {
            Self::Description => Some("묘사"),
            Self::Analysis => Some("분석"),
            Self::Interpretation => Some("해석"),
            Self::Judgment => Some("판단"),
            Self::Complete => None,
        }
    }

    /// Fixed `N단계 이름` marker label (e.g. `2단계 분석`).
    pub fn marker_label(&self) -> Option<String> {
        match (self.number_token(), self.korean_name()) {
            (Some(number), Some(name)) => Some(format!("{} {}", number, name)),
            _ => None,
        }
    }

    /// Corpus stage key this stage retrieves against.
    pub fn corpus_key(&self) -> Option<&'static str> {
        match self {
            Self::Description => Some("description"),
            Self::Analysis => Some("analysis"),
            Self::Interpretation => Some("interpretation"),
            Self::Judgment => Some("judgment"),
            Self::Complete => None,
        }
    }

    /// The stage that follows this one in the critique flow.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Description => Some(Self::Analysis),
            Self::Analysis => Some(Self::Interpretation),
            Self::Interpretation => Some(Self::Judgment),
            Self::Judgment => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    /// Whether an answer at this stage ends the dialogue.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Judgment | Self::Complete)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Description => write!(f, "description"),
            Self::Analysis => write!(f, "analysis"),
            Self::Interpretation => write!(f, "interpretation"),
            Self::Judgment => write!(f, "judgment"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

// ============================================================================
// Stage detection
// ============================================================================

/// Marker test: a turn matches a stage iff it contains BOTH the stage-number
/// token and the stage-name token. A lone number or lone name never matches,
/// which keeps incidental mentions ("4개의 단계", "분석해 볼게요") from
/// flipping the stage.
fn turn_matches_stage(text: &str, stage: Stage) -> bool {
    match (stage.number_token(), stage.korean_name()) {
        (Some(number), Some(name)) => text.contains(&number) && text.contains(name),
        _ => false,
    }
}

/// Derive the current stage from the transcript.
///
/// Scans from the most recent turn backward, considering assistant turns
/// only. Within a turn, markers are tested in fixed priority order
/// (completion sentinel, then Judgment down to Description), so a turn
/// mentioning several stages resolves to the highest one regardless of
/// textual position. Returns [`Stage::Description`] when no assistant turn
/// matches, including for an empty transcript.
///
/// Pure and deterministic; safe to call repeatedly on a growing transcript.
pub fn detect_stage(transcript: &[ConversationTurn]) -> Stage {
    // Highest stage first so Judgment mentions dominate within a turn.
    const PRIORITY: [Stage; 4] = [
        Stage::Judgment,
        Stage::Interpretation,
        Stage::Analysis,
        Stage::Description,
    ];

    for turn in transcript.iter().rev() {
        if turn.role != Role::Assistant {
            continue;
        }
        let text = turn.text();
        if text.contains(COMPLETION_SENTINEL) {
            return Stage::Complete;
        }
        for stage in PRIORITY {
            if turn_matches_stage(&text, stage) {
                return stage;
            }
        }
    }

    Stage::Description
}

// ============================================================================
// Tests
// ============================================================================
