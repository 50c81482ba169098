//! Turn pipeline: classify, retrieve, assemble, generate.
//!
//! ## Flow
//!
//! 1. Validate the transcript (non-empty, ends with a user turn)
//! 2. Derive the stage from assistant-turn history
//! 3. Classify the latest user turn as question or answer
//! 4. QUESTION: retrieve stage-scoped snippets, stream an explanation
//! 5. ANSWER at a non-terminal stage: generate a stage transition
//! 6. ANSWER at the terminal stage: emit the fixed completion message
//!
//! Each call is one independent, stateless invocation: the stage is
//! re-derived from the transcript every time, and the only shared state is
//! the read-only corpus cache. Retrieval and transition-generation failures
//! are absorbed here with graceful degradation; only invalid input and
//! unexpected faults propagate to the caller.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::assembler::{
    assemble_question, assemble_transition, fallback_transition, terminal_message, ArtworkProfile,
};
use crate::classifier::{KeywordClassifier, Utterance, UtteranceClassifier};
use crate::config::DocentConfig;
use crate::corpus::{CorpusStore, StageKey};
use crate::errors::DocentError;
use crate::ranker::{fallback_sample, rank, RetrievedSnippet};
use crate::services::{CompletionService, EmbeddingService, ReplyStream};
use crate::stage::{detect_stage, Stage};
use crate::transcript::{latest_user_text, ConversationTurn};

// ============================================================================
// Constants
// ============================================================================

/// Number of trailing turns forwarded to the completion service.
pub const EXCERPT_TURNS: usize = 8;

// ============================================================================
// TurnRequest / TurnServices
// ============================================================================

/// Input for one turn: the full transcript, ending with the user's latest
/// message, plus the artwork being discussed.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Read-only ordered turn sequence.
    pub transcript: Vec<ConversationTurn>,
    /// Facts about the artwork under discussion.
    pub artwork: ArtworkProfile,
}

impl TurnRequest {
    /// Request with an empty artwork profile.
    pub fn new(transcript: Vec<ConversationTurn>) -> Self {
        Self {
            transcript,
            artwork: ArtworkProfile::default(),
        }
    }
}

/// External collaborators for a turn.
pub struct TurnServices {
    /// Text-generation collaborator.
    pub completion: Arc<dyn CompletionService>,
    /// Query-embedding collaborator.
    pub embedding: Arc<dyn EmbeddingService>,
    /// Utterance classifier (keyword rules by default).
    pub classifier: Arc<dyn UtteranceClassifier>,
}

impl TurnServices {
    /// Services with the default keyword classifier.
    pub fn new(
        completion: Arc<dyn CompletionService>,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            completion,
            embedding,
            classifier: Arc::new(KeywordClassifier::new()),
        }
    }
}

// ============================================================================
// TurnReply / TurnOutcome
// ============================================================================

/// The reply produced for one turn.
pub enum TurnReply {
    /// Streamed explanation (QUESTION branch).
    Streamed(ReplyStream),
    /// Whole stage-transition text (ANSWER at a non-terminal stage).
    Transition(String),
    /// Fixed terminal message (ANSWER at the terminal stage).
    Completed(String),
}

impl TurnReply {
    /// Unify all reply shapes as a stream of one or more chunks.
    pub fn into_stream(self) -> ReplyStream {
        match self {
            Self::Streamed(stream) => stream,
            Self::Transition(text) | Self::Completed(text) => {
                stream::once(async move { Ok(text) }).boxed()
            }
        }
    }
}

impl std::fmt::Debug for TurnReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Streamed(_) => f.write_str("TurnReply::Streamed(..)"),
            Self::Transition(text) => f.debug_tuple("TurnReply::Transition").field(text).finish(),
            Self::Completed(text) => f.debug_tuple("TurnReply::Completed").field(text).finish(),
        }
    }
}

/// Technical metadata about how a turn was handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnDebugInfo {
    /// Stage derived from the transcript.
    pub stage: Stage,
    /// Classification of the latest user turn.
    pub classification: Utterance,
    /// Snippets retrieved for the QUESTION branch.
    #[serde(default)]
    pub retrieved: Vec<RetrievedSnippet>,
    /// Whether retrieval fell back to random sampling.
    #[serde(default)]
    pub retrieval_degraded: bool,
    /// Whether transition generation fell back to the fixed template.
    #[serde(default)]
    pub generation_degraded: bool,
}

/// Result of one pipeline invocation.
#[derive(Debug)]
pub struct TurnOutcome {
    /// The reply to deliver.
    pub reply: TurnReply,
    /// How the turn was handled.
    pub debug: TurnDebugInfo,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Handle one conversation turn.
///
/// # Errors
///
/// - [`DocentError::EmptyTranscript`] for an empty transcript
/// - [`DocentError::MissingUserTurn`] when the transcript does not end with
///   a user turn
///
/// Retrieval and transition-generation failures do not error; they degrade
/// (random snippet sample, templated transition). A stream that fails
/// mid-generation surfaces the error as a stream item, after any fragments
/// already emitted.
pub async fn run_turn(
    request: TurnRequest,
    services: &TurnServices,
    corpus: &CorpusStore,
    config: &DocentConfig,
) -> Result<TurnOutcome, DocentError> {
    if request.transcript.is_empty() {
        return Err(DocentError::EmptyTranscript);
    }
    let user_text = latest_user_text(&request.transcript).ok_or(DocentError::MissingUserTurn)?;

    let stage = detect_stage(&request.transcript);
    let classification = services.classifier.classify(&user_text);
    tracing::debug!(%stage, ?classification, "classified turn");

    let excerpt = excerpt_tail(&request.transcript);

    // Terminal short-circuit: once the dialogue is complete, or the
    // Judgment answer just arrived, no completion call is made.
    if stage == Stage::Complete || (stage == Stage::Judgment && classification == Utterance::Answer)
    {
        return Ok(TurnOutcome {
            reply: TurnReply::Completed(terminal_message().to_string()),
            debug: TurnDebugInfo {
                stage,
                classification,
                retrieved: Vec::new(),
                retrieval_degraded: false,
                generation_degraded: false,
            },
        });
    }

    match classification {
        Utterance::Question => {
            let (snippets, degraded) =
                retrieve_snippets(services, corpus, stage, &user_text, config.retrieval.top_k)
                    .await;

            let payload =
                assemble_question(stage, &user_text, &snippets, &request.artwork, excerpt);

            // A failure to even start the stream is delivered as the
            // stream's single error item, keeping one contract for the
            // consumer.
            let stream: ReplyStream = match services.completion.complete_stream(&payload).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("completion stream failed to start: {}", e);
                    stream::once(async move {
                        Err(DocentError::StreamInterrupted {
                            reason: e.to_string(),
                        })
                    })
                    .boxed()
                }
            };

            Ok(TurnOutcome {
                reply: TurnReply::Streamed(stream),
                debug: TurnDebugInfo {
                    stage,
                    classification,
                    retrieved: snippets,
                    retrieval_degraded: degraded,
                    generation_degraded: false,
                },
            })
        }
        Utterance::Answer => {
            let (text, generation_degraded) = match assemble_transition(stage, &user_text, excerpt)
            {
                Some(payload) => match services.completion.complete(&payload).await {
                    Ok(text) => (text, false),
                    Err(e) => {
                        tracing::warn!("transition generation failed, using template: {}", e);
                        let fallback = fallback_transition(stage)
                            .unwrap_or_else(|| terminal_message().to_string());
                        (fallback, true)
                    }
                },
                // Unreachable for non-terminal stages, but degrade rather
                // than panic if the stage table ever changes.
                None => (terminal_message().to_string(), true),
            };

            Ok(TurnOutcome {
                reply: TurnReply::Transition(text),
                debug: TurnDebugInfo {
                    stage,
                    classification,
                    retrieved: Vec::new(),
                    retrieval_degraded: false,
                    generation_degraded,
                },
            })
        }
    }
}

/// Retrieve stage-scoped snippets, degrading to a random sample when the
/// query embedding fails.
async fn retrieve_snippets(
    services: &TurnServices,
    corpus: &CorpusStore,
    stage: Stage,
    user_text: &str,
    top_k: usize,
) -> (Vec<RetrievedSnippet>, bool) {
    let Some(key) = StageKey::for_stage(stage) else {
        return (Vec::new(), false);
    };
    let candidates = corpus.entries_for(key);
    if candidates.is_empty() {
        tracing::debug!(%stage, "no corpus entries for stage");
        return (Vec::new(), false);
    }

    match services.embedding.embed(user_text).await {
        Ok(query) => {
            let snippets = rank(&query, &candidates, top_k);
            tracing::debug!(%stage, count = snippets.len(), "ranked corpus snippets");
            (snippets, false)
        }
        Err(e) => {
            tracing::warn!("query embedding failed, sampling corpus instead: {}", e);
            (fallback_sample(&candidates, top_k), true)
        }
    }
}

/// Trailing turns forwarded to the completion service.
fn excerpt_tail(transcript: &[ConversationTurn]) -> &[ConversationTurn] {
    let start = transcript.len().saturating_sub(EXCERPT_TURNS);
    &transcript[start..]
}

// ============================================================================
// Tests
// ============================================================================
