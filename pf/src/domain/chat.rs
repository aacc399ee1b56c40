//! Chat log entries

use serde::{Deserialize, Serialize};

/// Number of prior messages sent upstream with each chat turn
pub const CHAT_HISTORY_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One chat log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::now(ChatRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::now(ChatRole::Model, text)
    }

    fn now(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// The trailing window of `messages` sent as conversational context
pub fn history_window(messages: &[ChatMessage]) -> &[ChatMessage] {
    let start = messages.len().saturating_sub(CHAT_HISTORY_WINDOW);
    &messages[start..]
}
