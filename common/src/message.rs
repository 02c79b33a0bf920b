#![allow(clippy::module_name_repetitions)]
use serde::{Deserialize, Serialize};

/// Wire-level role of a chat turn. Unknown roles are rejected at
/// deserialization time, which surfaces as a validation error.
#[derive(Deserialize, Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A single conversation turn as received from, or sent to, a client.
#[derive(Deserialize, Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Returns the content of the most recent user turn, if any.
pub fn latest_user_content(history: &[ChatMessage]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|msg| msg.role == MessageRole::User)
        .map(|msg| msg.content.as_str())
}

/// Returns the contents of the last `n` user turns, oldest first.
pub fn last_user_contents(history: &[ChatMessage], n: usize) -> Vec<&str> {
    let mut turns: Vec<&str> = history
        .iter()
        .rev()
        .filter(|msg| msg.role == MessageRole::User)
        .take(n)
        .map(|msg| msg.content.as_str())
        .collect();
    turns.reverse();
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        let parsed: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"管理費とは"}"#)
                .expect("valid message");
        assert_eq!(parsed.role, MessageRole::User);
        assert_eq!(parsed.content, "管理費とは");

        let bad = serde_json::from_str::<ChatMessage>(r#"{"role":"robot","content":"x"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_latest_user_content() {
        let history = vec![
            ChatMessage::user("最初の質問"),
            ChatMessage::assistant("回答です"),
            ChatMessage::user("次の質問"),
        ];
        assert_eq!(latest_user_content(&history), Some("次の質問"));
        assert_eq!(latest_user_content(&[]), None);
    }

    #[test]
    fn test_last_user_contents_order() {
        let history = vec![
            ChatMessage::user("一"),
            ChatMessage::assistant("a"),
            ChatMessage::user("二"),
            ChatMessage::user("三"),
        ];
        assert_eq!(last_user_contents(&history, 2), vec!["二", "三"]);
        assert_eq!(last_user_contents(&history, 10), vec!["一", "二", "三"]);
    }
}
