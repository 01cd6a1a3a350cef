//! # Prompt
//!
//! Chat message model and the final prompt assembly step.
//!
//! ## Format
//!
//! - **Context** (optional): one synthesized `system` message wrapping the selected context text
//!   with [`CONTEXT_PREFIX`] / [`CONTEXT_SUFFIX`]
//! - **History**: the already-truncated conversation, unchanged and in chronological order
//!
//! ## External interactions
//!
//! - **Generator**: the assembled `Vec<ChatMessage>` is handed to the local generation capability.
//! - **Caller history**: never mutated; the synthesized system message exists only in the returned prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction.
    System,
    /// User turn.
    User,
    /// Assistant turn (created empty, filled as generation streams).
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single conversation message. Ordering of a history is insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Text placed before the selected context in the synthesized system message.
pub const CONTEXT_PREFIX: &str = "Consider this context:\n\n";

/// Text placed after the selected context in the synthesized system message.
pub const CONTEXT_SUFFIX: &str = "\n\nRespond based on this context when relevant.";

/// Separator between context bodies inside the selected context text.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Wraps selected context text into the system instruction content.
pub fn format_context_instruction(selected_context: &str) -> String {
    let mut out = String::with_capacity(
        CONTEXT_PREFIX.len() + selected_context.len() + CONTEXT_SUFFIX.len(),
    );
    out.push_str(CONTEXT_PREFIX);
    out.push_str(selected_context);
    out.push_str(CONTEXT_SUFFIX);
    out
}

/// Joins context bodies with a blank line, in the order given.
pub fn join_contexts<I, S>(bodies: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    bodies
        .into_iter()
        .map(|b| b.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Builds the message sequence sent to the generator.
///
/// If `selected_context` is non-empty, exactly one synthesized
/// system message is prepended; otherwise `history` is returned unchanged.
///
/// # Arguments
///
/// * `history` - Truncated conversation, chronological
/// * `selected_context` - Output of relevance selection (blank-line separated bodies)
pub fn assemble(history: Vec<ChatMessage>, selected_context: &str) -> Vec<ChatMessage> {
    if selected_context.is_empty() {
        return history;
    }
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(format_context_instruction(selected_context)));
    messages.extend(history);
    messages
}
