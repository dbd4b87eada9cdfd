//! Chat history types.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "User"),
            ChatRole::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl ChatMessage {
    /// Create a message stamped with the current time.
    pub fn now(role: ChatRole, text: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            role,
            text: text.into(),
            timestamp,
        }
    }
}

/// Trim history in place to the most recent `limit` messages.
pub fn trim_history(history: &mut Vec<ChatMessage>, limit: usize) {
    if history.len() > limit {
        let excess = history.len() - limit;
        history.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display() {
        assert_eq!(ChatRole::User.to_string(), "User");
        assert_eq!(ChatRole::Assistant.to_string(), "Assistant");
    }

    #[test]
    fn now_sets_timestamp() {
        let msg = ChatMessage::now(ChatRole::User, "hello");
        assert!(msg.timestamp > 0);
        assert_eq!(msg.text, "hello");
    }

    #[test]
    fn trim_keeps_most_recent() {
        let mut history: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage {
                role: ChatRole::User,
                text: format!("msg {i}"),
                timestamp: i,
            })
            .collect();
        trim_history(&mut history, 4);
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].text, "msg 6");
        assert_eq!(history[3].text, "msg 9");
    }

    #[test]
    fn trim_noop_under_limit() {
        let mut history = vec![ChatMessage::now(ChatRole::User, "only")];
        trim_history(&mut history, 4);
        assert_eq!(history.len(), 1);
    }
}
