//! OpenAI-compatible HTTP client implementing the docent service traits.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use docent_core::{
    CompletionService, DocentError, EmbeddingService, PromptPayload, ReplyStream, Role,
    TurnContent,
};

use crate::sse;

// ============================================================================
// OpenAiClient
// ============================================================================

/// Client for an OpenAI-compatible API: `/chat/completions` (whole and
/// SSE-streamed) and `/embeddings`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    completion_model: String,
    embedding_model: String,
}

impl OpenAiClient {
    /// Create a client for the given endpoint and models.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        completion_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            completion_model: completion_model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    fn chat_body(&self, payload: &PromptPayload, stream: bool) -> Value {
        let mut messages = vec![json!({
            "role": "system",
            "content": payload.instruction,
        })];
        for turn in &payload.excerpt {
            let role = match turn.role {
                Role::Assistant => "assistant",
                Role::User => "user",
            };
            messages.push(json!({
                "role": role,
                "content": content_value(&turn.content),
            }));
        }
        json!({
            "model": self.completion_model,
            "stream": stream,
            "messages": messages,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()
    }
}

/// Map turn content to the wire shape: plain string, or an array of
/// text / image_url parts.
fn content_value(content: &TurnContent) -> Value {
    match content {
        TurnContent::Text(text) => json!(text),
        TurnContent::Parts(parts) => {
            let mapped: Vec<Value> = parts
                .iter()
                .map(|part| match part {
                    docent_core::ContentPart::Text { text } => {
                        json!({"type": "text", "text": text})
                    }
                    docent_core::ContentPart::ImageUrl { url } => {
                        json!({"type": "image_url", "image_url": {"url": url}})
                    }
                })
                .collect();
            json!(mapped)
        }
    }
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

// ============================================================================
// Trait implementations
// ============================================================================

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, payload: &PromptPayload) -> Result<String, DocentError> {
        let body = self.chat_body(payload, false);
        let response = self
            .post("/chat/completions", &body)
            .await
            .map_err(|e| DocentError::CompletionFailed {
                reason: e.to_string(),
            })?;

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| DocentError::CompletionFailed {
                    reason: e.to_string(),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DocentError::CompletionFailed {
                reason: "completion returned no content".to_string(),
            })
    }

    async fn complete_stream(&self, payload: &PromptPayload) -> Result<ReplyStream, DocentError> {
        let body = self.chat_body(payload, true);
        let response = self
            .post("/chat/completions", &body)
            .await
            .map_err(|e| DocentError::CompletionFailed {
                reason: e.to_string(),
            })?;

        tracing::debug!(model = %self.completion_model, "completion stream opened");
        Ok(sse::delta_stream(response.bytes_stream().boxed()))
    }
}

#[async_trait]
impl EmbeddingService for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DocentError> {
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });
        let response =
            self.post("/embeddings", &body)
                .await
                .map_err(|e| DocentError::EmbeddingFailed {
                    reason: e.to_string(),
                })?;

        let parsed: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| DocentError::EmbeddingFailed {
                    reason: e.to_string(),
                })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .ok_or_else(|| DocentError::EmbeddingFailed {
                reason: "embedding response contained no vectors".to_string(),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::ConversationTurn;

    fn client() -> OpenAiClient {
        OpenAiClient::new(
            "https://api.openai.com/v1/",
            "test-key",
            "gpt-4o-mini",
            "text-embedding-3-small",
        )
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        assert_eq!(client().base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn chat_body_puts_instruction_first() {
        let payload = PromptPayload {
            instruction: "도슨트 지시문".to_string(),
            excerpt: vec![
                ConversationTurn::assistant("1단계 묘사를 해주세요"),
                ConversationTurn::user("나무가 보여요"),
            ],
        };
        let body = client().chat_body(&payload, true);
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][0]["content"], json!("도슨트 지시문"));
        assert_eq!(body["messages"][1]["role"], json!("assistant"));
        assert_eq!(body["messages"][2]["role"], json!("user"));
    }

    #[test]
    fn multipart_content_maps_to_wire_parts() {
        let content = TurnContent::Parts(vec![
            docent_core::ContentPart::Text {
                text: "이 그림이요".to_string(),
            },
            docent_core::ContentPart::ImageUrl {
                url: "https://example.com/art.png".to_string(),
            },
        ]);
        let value = content_value(&content);
        assert_eq!(value[0]["type"], json!("text"));
        assert_eq!(value[1]["image_url"]["url"], json!("https://example.com/art.png"));
    }
}
