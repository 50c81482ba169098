//! Context assembly: build the prompt payload for a turn.
//!
//! This module composes the instruction/context payload sent to the
//! completion service, branching on classification and stage:
//!
//! - QUESTION: stage-scoped explanatory instruction embedding retrieved
//!   snippets, never advancing the stage.
//! - ANSWER at a non-terminal stage: transition instruction naming the next
//!   stage in the fixed `N단계 이름` format.
//! - ANSWER at Judgment (or Complete): the fixed terminal message, no
//!   completion call.
//!
//! The `N단계 이름` marker in every transition, and the completion sentinel
//! in the terminal message, are what [`crate::stage::detect_stage`] scans
//! for — the assembler is the producer side of that contract.

use serde::{Deserialize, Serialize};

use crate::constants::COMPLETION_MESSAGE;
use crate::ranker::RetrievedSnippet;
use crate::services::PromptPayload;
use crate::stage::Stage;
use crate::transcript::ConversationTurn;

// ============================================================================
// ArtworkProfile
// ============================================================================

/// Facts about the artwork under discussion.
///
/// Kept separate from the retrieved corpus snippets, which describe *other*
/// artworks and must stay labeled as such.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkProfile {
    /// Artwork title, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Factual statements about the artwork (period, medium, subject).
    #[serde(default)]
    pub facts: Vec<String>,
}

impl ArtworkProfile {
    /// Profile with a title and fact lines.
    pub fn new(title: impl Into<String>, facts: Vec<String>) -> Self {
        Self {
            title: Some(title.into()),
            facts,
        }
    }
}

// ============================================================================
// QUESTION branch
// ============================================================================

/// Build the explanatory prompt for a question at the given stage.
///
/// The instruction names the current stage, embeds the artwork facts and the
/// retrieved example snippets (labeled as other artworks' examples), and
/// forbids both revealing the answer and mentioning the next stage.
pub fn assemble_question(
    stage: Stage,
    user_text: &str,
    snippets: &[RetrievedSnippet],
    artwork: &ArtworkProfile,
    excerpt: &[ConversationTurn],
) -> PromptPayload {
    let stage_label = stage
        .marker_label()
        .unwrap_or_else(|| "1단계 묘사".to_string());

    let mut instruction = String::new();
    instruction.push_str(
        "당신은 펠드만 4단계 비평으로 감상을 안내하는 친절한 미술관 도슨트입니다.\n",
    );
    instruction.push_str(&format!(
        "지금은 {} 단계입니다. 사용자가 이 단계에 대해 질문했어요: \"{}\"\n",
        stage_label,
        user_text.trim()
    ));
    instruction.push_str(&format!(
        "{} 단계에서 무엇을 하면 되는지 한국어로 짧고 쉽게 설명해 주세요.\n",
        stage_label
    ));

    if artwork.title.is_some() || !artwork.facts.is_empty() {
        instruction.push_str("\n[지금 감상 중인 작품 정보]\n");
        if let Some(title) = &artwork.title {
            instruction.push_str(&format!("- 제목: {}\n", title));
        }
        for fact in &artwork.facts {
            instruction.push_str(&format!("- {}\n", fact));
        }
    }

    if !snippets.is_empty() {
        instruction.push_str(
            "\n[다른 작품들에 대한 예시 문장 — 지금 작품에 대한 설명이 아닙니다]\n",
        );
        for snippet in snippets {
            instruction.push_str(&format!("- {}\n", snippet.text));
        }
        instruction.push_str(
            "예시는 말투와 관점을 참고하는 용도로만 쓰고, 지금 작품의 내용처럼 말하지 마세요.\n",
        );
    }

    instruction.push_str("\n[지켜야 할 것]\n");
    instruction.push_str("- 사용자가 스스로 답하도록 돕고, 정답을 직접 말해주지 마세요.\n");
    instruction.push_str("- 다음 단계는 언급하지 마세요. 지금 단계 안에서만 안내하세요.\n");

    PromptPayload {
        instruction,
        excerpt: excerpt.to_vec(),
    }
}

// ============================================================================
// ANSWER branch (transition)
// ============================================================================

/// Build the stage-transition prompt for an answer at a non-terminal stage.
///
/// The generated reply must acknowledge specifics from the user's own words,
/// name the next stage as `N단계 이름`, and pose a concrete next-stage
/// prompt. Returns `None` when there is no next answerable stage.
pub fn assemble_transition(
    stage: Stage,
    user_text: &str,
    excerpt: &[ConversationTurn],
) -> Option<PromptPayload> {
    let next = stage.next().filter(|s| *s != Stage::Complete)?;
    let next_label = next.marker_label()?;

    let mut instruction = String::new();
    instruction.push_str(
        "당신은 펠드만 4단계 비평으로 감상을 안내하는 친절한 미술관 도슨트입니다.\n",
    );
    instruction.push_str(&format!(
        "사용자가 방금 이렇게 답했어요: \"{}\"\n",
        user_text.trim()
    ));
    instruction.push_str("한국어로 짧게, 다음 순서로 답하세요.\n");
    instruction.push_str("1. 사용자의 답변에서 구체적인 표현을 집어 칭찬하거나 짚어 주세요.\n");
    instruction.push_str(&format!(
        "2. 반드시 \"{}\"라는 표현을 그대로 써서 다음 단계를 알려 주세요.\n",
        next_label
    ));
    instruction.push_str(&format!(
        "3. {} 단계에서 해볼 만한 구체적인 질문을 하나 던져 주세요.\n",
        next_label
    ));

    Some(PromptPayload {
        instruction,
        excerpt: excerpt.to_vec(),
    })
}

/// Deterministic transition text used when generation fails.
///
/// Grounded in the fixed dialogue flow the original guided mode used; each
/// template carries the next stage's marker so the dialogue never stalls and
/// stage detection keeps working.
pub fn fallback_transition(stage: Stage) -> Option<String> {
    let next = stage.next().filter(|s| *s != Stage::Complete)?;
    let text = match next {
        Stage::Analysis => {
            "좋아요! 이제 2단계 분석으로 넘어가요. 작품 속 요소들이 어떻게 구성되어 있는지, \
             색과 형태의 대비나 균형을 중심으로 분석해 보시겠어요?"
        }
        Stage::Interpretation => {
            "잘 하셨어요! 이제 3단계 해석으로 넘어가요. 작품이 어떤 의미나 감정을 담고 있을지 \
             자유롭게 해석해 보시겠어요?"
        }
        Stage::Judgment => {
            "멋진 해석이에요! 이제 4단계 판단으로 넘어가요. 지금까지의 답변을 바탕으로 이 작품을 \
             근거와 함께 평가해 보시겠어요?"
        }
        Stage::Description | Stage::Complete => return None,
    };
    Some(text.to_string())
}

// ============================================================================
// Terminal branch
// ============================================================================

/// The fixed message for an answer at the terminal stage.
pub fn terminal_message() -> &'static str {
    COMPLETION_MESSAGE
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::StageKey;

    fn snippets() -> Vec<RetrievedSnippet> {
        vec![
            RetrievedSnippet {
                stage: StageKey::Description,
                text: "화면 왼쪽에 큰 나무가 서 있다".to_string(),
                score: Some(0.91),
            },
            RetrievedSnippet {
                stage: StageKey::Description,
                text: "하늘은 짙은 파란색이다".to_string(),
                score: None,
            },
        ]
    }

    #[test]
    fn question_prompt_names_stage_and_embeds_snippets() {
        let payload = assemble_question(
            Stage::Description,
            "이게 뭐예요?",
            &snippets(),
            &ArtworkProfile::default(),
            &[],
        );
        assert!(payload.instruction.contains("1단계 묘사"));
        assert!(payload.instruction.contains("화면 왼쪽에 큰 나무가 서 있다"));
        assert!(payload.instruction.contains("다른 작품들에 대한 예시"));
    }

    #[test]
    fn question_prompt_forbids_answer_and_next_stage() {
        let payload = assemble_question(
            Stage::Analysis,
            "분석은 어떻게 해요?",
            &[],
            &ArtworkProfile::default(),
            &[],
        );
        assert!(payload.instruction.contains("정답을 직접 말해주지 마세요"));
        assert!(payload.instruction.contains("다음 단계는 언급하지 마세요"));
        // No snippets, no examples section.
        assert!(!payload.instruction.contains("예시 문장"));
    }

    #[test]
    fn question_prompt_includes_artwork_facts_separately() {
        let artwork = ArtworkProfile::new(
            "별이 빛나는 밤",
            vec!["1889년 유화".to_string(), "소용돌이치는 밤하늘".to_string()],
        );
        let payload = assemble_question(Stage::Description, "뭐가 보이죠?", &[], &artwork, &[]);
        assert!(payload.instruction.contains("별이 빛나는 밤"));
        assert!(payload.instruction.contains("1889년 유화"));
        assert!(payload.instruction.contains("감상 중인 작품 정보"));
    }

    #[test]
    fn transition_prompt_names_next_stage_marker() {
        let payload =
            assemble_transition(Stage::Description, "파란 배경에 나무가 있어요", &[]).unwrap();
        assert!(payload.instruction.contains("2단계 분석"));
        assert!(payload.instruction.contains("파란 배경에 나무가 있어요"));
    }

    #[test]
    fn transition_prompt_absent_at_terminal_stages() {
        assert!(assemble_transition(Stage::Judgment, "좋은 작품이에요", &[]).is_none());
        assert!(assemble_transition(Stage::Complete, "끝났죠?", &[]).is_none());
    }

    #[test]
    fn fallback_transitions_carry_markers() {
        let analysis = fallback_transition(Stage::Description).unwrap();
        assert!(analysis.contains("2단계 분석"));
        let interpretation = fallback_transition(Stage::Analysis).unwrap();
        assert!(interpretation.contains("3단계 해석"));
        let judgment = fallback_transition(Stage::Interpretation).unwrap();
        assert!(judgment.contains("4단계 판단"));
        assert!(fallback_transition(Stage::Judgment).is_none());
    }

    #[test]
    fn terminal_message_is_fixed() {
        assert_eq!(terminal_message(), COMPLETION_MESSAGE);
    }
}
