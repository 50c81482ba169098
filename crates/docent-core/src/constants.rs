//! Shared constants for the critique dialogue engine.

/// Default number of corpus snippets retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Default corpus filename (array of stage-tagged embedded texts).
pub const CORPUS_FILENAME: &str = "feldman_corpus.json";

/// Default completion model identifier.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

/// Default embedding model identifier.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Assistant greeting that opens a new conversation.
///
/// Contains the Description stage marker so stage detection works from the
/// very first turn.
pub const GREETING: &str = "안녕하세요! 펠드만 비평(묘사→분석→해석→판단)으로 감상을 도와드릴게요. \
    1단계 묘사부터 시작해요. 작품에서 보이는 것들을 한 문장으로 묘사해 주시겠어요?";

/// Fixed message emitted once the Judgment answer has been processed.
///
/// Also the sentinel the stage tracker scans for; changing this text breaks
/// detection of completed conversations in old transcripts.
pub const COMPLETION_MESSAGE: &str =
    "모든 단계가 완료되었습니다 🎉 묘사, 분석, 해석, 판단까지 훌륭하게 마치셨어요. 함께 감상해 주셔서 감사합니다!";

/// Substring of [`COMPLETION_MESSAGE`] used as the terminal stage sentinel.
pub const COMPLETION_SENTINEL: &str = "모든 단계가 완료";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_message_contains_sentinel() {
        assert!(COMPLETION_MESSAGE.contains(COMPLETION_SENTINEL));
    }

    #[test]
    fn greeting_carries_description_marker() {
        assert!(GREETING.contains("1단계"));
        assert!(GREETING.contains("묘사"));
    }
}
