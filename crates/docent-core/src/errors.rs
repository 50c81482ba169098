//! Error types for docent-core.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for docent operations.
#[derive(Error, Debug)]
pub enum DocentError {
    /// The transcript is empty; there is nothing to classify or answer.
    #[error("Transcript is empty. Provide at least the latest user turn.")]
    EmptyTranscript,

    /// The transcript has no user turn to classify.
    ///
    /// The pipeline always acts on the latest user turn; a transcript that
    /// ends without one is a caller error, same class as an empty transcript.
    #[error("Transcript has no user turn to act on.")]
    MissingUserTurn,

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// Failed to read the corpus file.
    #[error("Corpus I/O error at `{path}`: {message}")]
    CorpusIo {
        /// Path to the corpus file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// Failed to parse the corpus file.
    #[error("Corpus parse error at `{path}`: {message}")]
    CorpusParse {
        /// Path to the corpus file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// The embedding service failed to embed a query.
    ///
    /// Inside the turn pipeline this is absorbed by the retrieval fallback
    /// and never reaches the caller; it only surfaces from direct
    /// embedding calls (e.g. the `retrieve` debug command).
    #[error("Failed to embed query: {reason}")]
    EmbeddingFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The completion service failed to generate a reply.
    ///
    /// Stage-transition generation absorbs this with a templated fallback;
    /// question streams surface it as the stream's error item.
    #[error("Completion service failed: {reason}")]
    CompletionFailed {
        /// Description of the failure.
        reason: String,
    },

    /// A streamed reply was interrupted mid-generation.
    ///
    /// Fragments already delivered to the consumer are not retracted.
    #[error("Reply stream interrupted: {reason}")]
    StreamInterrupted {
        /// Description of the failure.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocentError {
    /// Whether this error is caused by invalid caller input (as opposed to
    /// an internal or collaborator fault).
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::EmptyTranscript | Self::MissingUserTurn)
    }
}
