//! External collaborator seams: completion and embedding services.
//!
//! Both services are external I/O and the only suspension points in a turn.
//! No timeout is enforced here; cancellation and deadlines belong to the
//! transport layer around the core.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::errors::DocentError;
use crate::transcript::ConversationTurn;

// ============================================================================
// PromptPayload
// ============================================================================

/// Structured prompt sent to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPayload {
    /// The assembled system instruction.
    pub instruction: String,
    /// Conversation excerpt forwarded alongside the instruction.
    pub excerpt: Vec<ConversationTurn>,
}

// ============================================================================
// ReplyStream
// ============================================================================

/// Lazy, forward-only, non-restartable sequence of reply fragments.
///
/// The consumer pulls fragments until completion or until an error item;
/// fragments already emitted before an error are not retracted. Dropping
/// the stream cancels generation.
pub type ReplyStream = BoxStream<'static, Result<String, DocentError>>;

// ============================================================================
// Service traits
// ============================================================================

/// Text-generation collaborator invoked with an assembled prompt.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate a whole reply for the payload.
    async fn complete(&self, payload: &PromptPayload) -> Result<String, DocentError>;

    /// Generate a reply as a fragment stream.
    ///
    /// An error return means generation could not start; an error item on
    /// the stream means it failed mid-way.
    async fn complete_stream(&self, payload: &PromptPayload) -> Result<ReplyStream, DocentError>;
}

/// Embedding collaborator: text in, fixed-length vector out.
///
/// May fail independently of the completion service; the turn pipeline
/// absorbs its failures via the retrieval fallback.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DocentError>;
}
