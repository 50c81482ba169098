//! # docent-core
//!
//! **Feldman critique dialogue engine** – core library.
//!
//! Guides a user through the four-stage critique dialogue (Description →
//! Analysis → Interpretation → Judgment), deriving the current stage from
//! the transcript, classifying each user turn as question or answer, and
//! assembling retrieval-augmented prompts for an external completion
//! service.
//!
//! ## Main Types
//!
//! - [`run_turn`] – handle one conversation turn end to end
//! - [`Stage`] / [`detect_stage`] – stage tracking from transcript history
//! - [`CorpusStore`] – stage-tagged reference texts with embeddings
//! - [`DocentError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`pipeline`] – the per-turn orchestration
//! - [`stage`] – stage enum and marker-scan detection
//! - [`classifier`] – question/answer keyword rules
//! - [`ranker`] – cosine ranking and degraded sampling
//! - [`corpus`] – corpus store and process-wide cache
//! - [`assembler`] – prompt construction for all branches
//! - [`services`] – completion/embedding collaborator traits
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docent_core::{run_turn, ConversationTurn, CorpusStore, DocentConfig,
//!     TurnRequest, TurnServices};
//!
//! let config = DocentConfig::default();
//! let corpus = CorpusStore::shared(&config.corpus_path)?;
//! let services = TurnServices::new(completion, embedding);
//!
//! let transcript = vec![
//!     ConversationTurn::assistant("1단계 묘사부터 시작해요"),
//!     ConversationTurn::user("이게 뭐예요?"),
//! ];
//! let outcome = run_turn(TurnRequest::new(transcript), &services, &corpus, &config).await?;
//! ```

// Modules
pub mod assembler;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod corpus;
pub mod errors;
pub mod pipeline;
pub mod ranker;
pub mod services;
pub mod stage;
pub mod transcript;

// Re-exports for convenience
pub use assembler::{
    assemble_question, assemble_transition, fallback_transition, terminal_message, ArtworkProfile,
};
pub use classifier::{classify, KeywordClassifier, Utterance, UtteranceClassifier};
pub use config::{DocentConfig, ModelsConfig, RetrievalConfig};
pub use constants::{
    COMPLETION_MESSAGE, COMPLETION_SENTINEL, CORPUS_FILENAME, DEFAULT_COMPLETION_MODEL,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_TOP_K, GREETING,
};
pub use corpus::{CorpusEntry, CorpusStore, StageKey};
pub use errors::DocentError;
pub use pipeline::{
    run_turn, TurnDebugInfo, TurnOutcome, TurnReply, TurnRequest, TurnServices, EXCERPT_TURNS,
};
pub use ranker::{cosine_similarity, fallback_sample, rank, RetrievedSnippet};
pub use services::{CompletionService, EmbeddingService, PromptPayload, ReplyStream};
pub use stage::{detect_stage, Stage};
pub use transcript::{
    latest_user_text, ContentPart, ConversationTurn, Role, SavedTranscript, TurnContent,
};
