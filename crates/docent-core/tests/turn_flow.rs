//! End-to-end turn flow scenarios against a file-backed corpus.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tempfile::NamedTempFile;

use docent_core::{
    run_turn, CompletionService, ConversationTurn, CorpusStore, DocentConfig, DocentError,
    EmbeddingService, PromptPayload, ReplyStream, Stage, TurnReply, TurnRequest, TurnServices,
    Utterance, COMPLETION_MESSAGE,
};

// ============================================================================
// Mock services
// ============================================================================

/// Records every payload it receives and replies with canned text.
#[derive(Default)]
struct RecordingCompletion {
    payloads: Mutex<Vec<PromptPayload>>,
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionService for RecordingCompletion {
    async fn complete(&self, payload: &PromptPayload) -> Result<String, DocentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());
        Ok("좋은 묘사예요! 이제 2단계 분석으로 넘어가 볼까요?".to_string())
    }

    async fn complete_stream(&self, payload: &PromptPayload) -> Result<ReplyStream, DocentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(stream::iter(vec![
            Ok("묘사 단계에서는 ".to_string()),
            Ok("보이는 것을 말해요".to_string()),
        ])
        .boxed())
    }
}

struct FixedEmbedding;

#[async_trait]
impl EmbeddingService for FixedEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, DocentError> {
        Ok(vec![1.0, 0.0, 0.0])
    }
}

struct BrokenEmbedding;

#[async_trait]
impl EmbeddingService for BrokenEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, DocentError> {
        Err(DocentError::EmbeddingFailed {
            reason: "embedding endpoint unreachable".to_string(),
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

const CORPUS_JSON: &str = r#"[
  {"stage": "description", "text": "화면 왼쪽에 큰 나무가 서 있다", "embedding": [1.0, 0.0, 0.0]},
  {"stage": "description", "text": "하늘은 짙은 파란색이다", "embedding": [0.0, 1.0, 0.0]},
  {"stage": "analysis", "text": "수직과 수평이 대비를 이룬다", "embedding": [0.0, 0.0, 1.0]},
  {"stage": "judgment", "text": "긴장감이 뛰어난 작품이다", "embedding": [0.5, 0.5, 0.0]}
]"#;

fn file_corpus() -> (NamedTempFile, CorpusStore) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CORPUS_JSON.as_bytes()).unwrap();
    let store = CorpusStore::load(file.path()).unwrap();
    (file, store)
}

fn recording_services(embedding_fails: bool) -> (TurnServices, Arc<RecordingCompletion>) {
    let completion = Arc::new(RecordingCompletion::default());
    let embedding: Arc<dyn EmbeddingService> = if embedding_fails {
        Arc::new(BrokenEmbedding)
    } else {
        Arc::new(FixedEmbedding)
    };
    (
        TurnServices::new(completion.clone(), embedding),
        completion,
    )
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn empty_transcript_is_rejected_as_invalid_input() {
    let (_file, corpus) = file_corpus();
    let (services, completion) = recording_services(false);

    let err = run_turn(
        TurnRequest::new(vec![]),
        &services,
        &corpus,
        &DocentConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn description_question_gets_stage_scoped_explanation() {
    let (_file, corpus) = file_corpus();
    let (services, completion) = recording_services(false);

    let transcript = vec![
        ConversationTurn::assistant("1단계 묘사부터 시작해요. 무엇이 보이나요?"),
        ConversationTurn::user("이게 뭐예요?"),
    ];
    let outcome = run_turn(
        TurnRequest::new(transcript),
        &services,
        &corpus,
        &DocentConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.debug.stage, Stage::Description);
    assert_eq!(outcome.debug.classification, Utterance::Question);

    // Only description-tagged corpus entries show up in the prompt.
    let payloads = completion.payloads.lock().unwrap();
    let instruction = &payloads[0].instruction;
    assert!(instruction.contains("1단계 묘사"));
    assert!(instruction.contains("화면 왼쪽에 큰 나무가 서 있다"));
    assert!(instruction.contains("하늘은 짙은 파란색이다"));
    assert!(!instruction.contains("수직과 수평이 대비를 이룬다"));
    assert!(!instruction.contains("긴장감이 뛰어난 작품이다"));
    assert!(instruction.contains("다음 단계는 언급하지 마세요"));
    drop(payloads);

    let chunks: Vec<_> = outcome.reply.into_stream().collect::<Vec<_>>().await;
    let text: String = chunks.into_iter().map(|c| c.unwrap()).collect();
    assert_eq!(text, "묘사 단계에서는 보이는 것을 말해요");
}

#[tokio::test]
async fn description_answer_advances_to_analysis() {
    let (_file, corpus) = file_corpus();
    let (services, completion) = recording_services(false);

    let transcript = vec![
        ConversationTurn::assistant("1단계 묘사부터 시작해요. 무엇이 보이나요?"),
        ConversationTurn::user("파란 배경에 나무가 있어요"),
    ];
    let outcome = run_turn(
        TurnRequest::new(transcript),
        &services,
        &corpus,
        &DocentConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.debug.classification, Utterance::Answer);

    // The transition instruction demands the fixed 2단계 분석 marker and
    // echoes the user's own words.
    let payloads = completion.payloads.lock().unwrap();
    let instruction = &payloads[0].instruction;
    assert!(instruction.contains("2단계 분석"));
    assert!(instruction.contains("파란 배경에 나무가 있어요"));
    drop(payloads);

    match outcome.reply {
        TurnReply::Transition(text) => assert!(text.contains("2단계")),
        other => panic!("expected transition, got {:?}", other),
    }
}

#[tokio::test]
async fn judgment_answer_returns_terminal_message_without_service_call() {
    let (_file, corpus) = file_corpus();
    let (services, completion) = recording_services(false);

    let transcript = vec![
        ConversationTurn::assistant("이제 4단계 판단으로 마무리해요"),
        ConversationTurn::user("근거를 종합하면 완성도 높은 작품이에요"),
    ];
    let outcome = run_turn(
        TurnRequest::new(transcript),
        &services,
        &corpus,
        &DocentConfig::default(),
    )
    .await
    .unwrap();

    match outcome.reply {
        TurnReply::Completed(text) => assert_eq!(text, COMPLETION_MESSAGE),
        other => panic!("expected terminal message, got {:?}", other),
    }
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_outage_still_answers_with_sampled_examples() {
    let (_file, corpus) = file_corpus();
    let (services, completion) = recording_services(true);

    let transcript = vec![
        ConversationTurn::assistant("1단계 묘사부터 시작해요"),
        ConversationTurn::user("묘사는 어떻게 하는 거예요?"),
    ];
    let outcome = run_turn(
        TurnRequest::new(transcript),
        &services,
        &corpus,
        &DocentConfig::default(),
    )
    .await
    .unwrap();

    assert!(outcome.debug.retrieval_degraded);
    // min(K=5, 2 description candidates) texts, scoreless.
    assert_eq!(outcome.debug.retrieved.len(), 2);
    assert!(outcome.debug.retrieved.iter().all(|s| s.score.is_none()));
    // The explanation still went out.
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
}
