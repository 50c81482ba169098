//! Conversation transcript types and text projection.
//!
//! This module provides:
//! - [`Role`] - who authored a turn
//! - [`TurnContent`] - plain text or an ordered list of parts
//! - [`ConversationTurn`] - one message in the conversation
//! - [`SavedTranscript`] - on-disk transcript record with title/createdAt
//!
//! The core treats the transcript as a read-only ordered sequence. It never
//! mutates turns; it only derives a per-turn text projection (concatenation
//! of text parts, non-text parts ignored) for stage detection,
//! classification, and retrieval.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Role
// ============================================================================

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The guiding docent (generated replies).
    Assistant,
    /// The human participant.
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assistant => write!(f, "assistant"),
            Self::User => write!(f, "user"),
        }
    }
}

// ============================================================================
// TurnContent
// ============================================================================

/// One part of a multi-part turn.
///
/// Mirrors the wire shape of multimodal chat messages: text parts carry the
/// words, image parts carry a URL reference the core does not interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text fragment.
    Text {
        /// The fragment text.
        text: String,
    },
    /// A reference to an image; ignored by classification and retrieval.
    ImageUrl {
        /// URL of the referenced image.
        url: String,
    },
}

/// Content of a turn: either a single string or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    /// Plain text content.
    Text(String),
    /// Multi-part content (text and image references).
    Parts(Vec<ContentPart>),
}

impl TurnContent {
    /// Derive the text projection of this content.
    ///
    /// Text parts are concatenated in order, separated by a single space;
    /// non-text parts contribute nothing.
    pub fn text_projection(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => {
                let fragments: Vec<&str> = parts
                    .iter()
                    .filter_map(|part| match part {
                        ContentPart::Text { text } => Some(text.as_str()),
                        ContentPart::ImageUrl { .. } => None,
                    })
                    .collect();
                fragments.join(" ")
            }
        }
    }
}

impl From<&str> for TurnContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TurnContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

// ============================================================================
// ConversationTurn
// ============================================================================

/// One message in the conversation, authored by the assistant or the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who authored the turn.
    pub role: Role,
    /// The turn content.
    pub content: TurnContent,
}

impl ConversationTurn {
    /// Create an assistant turn with plain text content.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text(text.into()),
        }
    }

    /// Create a user turn with plain text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    /// The text projection of this turn.
    pub fn text(&self) -> String {
        self.content.text_projection()
    }
}

/// Return the text projection of the latest user turn, if the transcript
/// ends with one.
///
/// The pipeline acts on the user's most recent message; assistant turns
/// after it would mean the caller sent a stale transcript, so only a
/// trailing user turn counts.
pub fn latest_user_text(transcript: &[ConversationTurn]) -> Option<String> {
    transcript
        .last()
        .filter(|turn| turn.role == Role::User)
        .map(|turn| turn.text())
}

// ============================================================================
// SavedTranscript
// ============================================================================

/// On-disk transcript record.
///
/// The original app kept chat histories in a local browser DB with a title
/// and creation time; the CLI re-expresses that as a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTranscript {
    /// Human-readable session title.
    pub title: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// The full ordered turn sequence.
    pub messages: Vec<ConversationTurn>,
}

impl SavedTranscript {
    /// Create a new saved transcript with the current time.
    pub fn new(title: impl Into<String>, messages: Vec<ConversationTurn>) -> Self {
        Self {
            title: title.into(),
            created_at: Utc::now(),
            messages,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_projection_plain() {
        let turn = ConversationTurn::user("파란 배경에 나무가 있어요");
        assert_eq!(turn.text(), "파란 배경에 나무가 있어요");
    }

    #[test]
    fn text_projection_ignores_images() {
        let turn = ConversationTurn {
            role: Role::User,
            content: TurnContent::Parts(vec![
                ContentPart::Text {
                    text: "이 그림을 봐주세요".to_string(),
                },
                ContentPart::ImageUrl {
                    url: "https://example.com/art.png".to_string(),
                },
                ContentPart::Text {
                    text: "어떤가요".to_string(),
                },
            ]),
        };
        assert_eq!(turn.text(), "이 그림을 봐주세요 어떤가요");
    }

    #[test]
    fn latest_user_text_requires_trailing_user_turn() {
        let transcript = vec![
            ConversationTurn::assistant("1단계 묘사를 해볼까요?"),
            ConversationTurn::user("나무가 보여요"),
        ];
        assert_eq!(
            latest_user_text(&transcript).as_deref(),
            Some("나무가 보여요")
        );

        let assistant_last = vec![
            ConversationTurn::user("나무가 보여요"),
            ConversationTurn::assistant("좋아요"),
        ];
        assert!(latest_user_text(&assistant_last).is_none());
        assert!(latest_user_text(&[]).is_none());
    }

    #[test]
    fn turn_content_round_trips_both_shapes() {
        let plain: TurnContent = serde_json::from_str(r#""안녕하세요""#).unwrap();
        assert_eq!(plain, TurnContent::Text("안녕하세요".to_string()));

        let parts: TurnContent = serde_json::from_str(
            r#"[{"type":"text","text":"hi"},{"type":"image_url","url":"u"}]"#,
        )
        .unwrap();
        match parts {
            TurnContent::Parts(p) => assert_eq!(p.len(), 2),
            _ => panic!("expected parts"),
        }
    }
}
