//! Message styling for CLI output.
//!
//! Provides consistent prefixes, colors, and formatting for all CLI messages.
//!
//! ## Message Types
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |

use owo_colors::OwoColorize;

use super::color::ColorMode;

/// Message severity/type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Success - operation completed successfully
    Ok,
    /// Error - operation failed, cannot continue
    Err,
    /// Warning - operation succeeded with caveats
    Warn,
    /// Information - neutral status or progress update
    Info,
    /// Hint - actionable next step or tip
    Hint,
}

impl MessageType {
    /// Returns the prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
        }
    }
}

/// Main styling interface for CLI output.
///
/// # Example
///
/// ```text
/// let style = Style::new(ColorMode::Never);
/// println!("{}", style.message(MessageType::Ok, "Operation completed"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    /// Create a Style instance with an explicit color mode.
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    /// Check if colors are enabled.
    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Format a simple message with a type prefix.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if self.colors_enabled() {
            let colored_prefix = match msg_type {
                MessageType::Ok => prefix.green().to_string(),
                MessageType::Err => prefix.red().to_string(),
                MessageType::Warn => prefix.yellow().to_string(),
                MessageType::Info => prefix.blue().to_string(),
                MessageType::Hint => prefix.cyan().to_string(),
            };
            format!("{} {}", colored_prefix, text)
        } else {
            format!("{} {}", prefix, text)
        }
    }

    /// Format a detail line with 5-space indentation.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    /// Format a section header like `RESULTS`.
    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format a `Key: value` pair with a bold key.
    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.colors_enabled() {
            format!("{}: {}", key.bold(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    /// Format a relevance score, colored by magnitude.
    pub fn score(&self, score: f32) -> String {
        let text = format!("{:.3}", score);
        if self.colors_enabled() {
            if score >= 0.7 {
                text.green().to_string()
            } else if score >= 0.4 {
                text.yellow().to_string()
            } else {
                text.dimmed().to_string()
            }
        } else {
            text
        }
    }

    /// Format a stage tag like `[description]`.
    pub fn stage_tag(&self, stage: &str) -> String {
        let tag = format!("[{}]", stage);
        if self.colors_enabled() {
            tag.magenta().to_string()
        } else {
            tag
        }
    }

    /// Format the docent speaker prefix for chat output.
    pub fn speaker(&self, name: &str) -> String {
        if self.colors_enabled() {
            format!("{}", name.cyan().bold())
        } else {
            name.to_string()
        }
    }

    /// Format an error with optional cause and hint lines.
    pub fn error_with_context(
        &self,
        summary: &str,
        cause: Option<&str>,
        hint: Option<&str>,
    ) -> String {
        let mut out = self.message(MessageType::Err, summary);
        if let Some(cause) = cause {
            out.push('\n');
            out.push_str(&self.message_detail("Cause", cause));
        }
        if let Some(hint) = hint {
            out.push('\n');
            out.push_str(&self.message(MessageType::Hint, hint));
        }
        out
    }
}
