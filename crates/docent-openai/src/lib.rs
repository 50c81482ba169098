//! # docent-openai
//!
//! OpenAI-compatible provider for the docent service traits.
//!
//! Implements [`docent_core::CompletionService`] and
//! [`docent_core::EmbeddingService`] against any endpoint speaking the
//! OpenAI chat-completions and embeddings wire format, including the SSE
//! framing used for streamed replies.

pub mod client;
pub mod sse;

pub use client::OpenAiClient;
