//! Chat messages exchanged between a user and an agent
//!
//! Messages mirror the provider-neutral shape used by agent SDKs: a role and
//! either plain text or a list of typed content parts. Fields this crate does
//! not model (tool call ids, provider options) are preserved in `extra` so a
//! message survives a decode/encode cycle untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// End user (or simulated user)
    User,
    /// The agent under evaluation
    Assistant,
    /// Tool result fed back to the agent
    Tool,
}

impl Role {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message body: plain text or typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text body
    Text(String),
    /// Structured parts (`{"type": "text", "text": ...}`, tool calls, images, ...)
    Parts(Vec<Value>),
}

/// One message in a conversation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message
    pub role: Role,
    /// Message body
    pub content: MessageContent,
    /// Provider-specific fields carried through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Create a text message with the given role
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Message {
            role,
            content: MessageContent::Text(text.into()),
            extra: Map::new(),
        }
    }

    /// Create a user text message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant text message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Create a system text message
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Textual content of the message.
    ///
    /// For part lists, the `text` of every `{"type": "text"}` part is
    /// concatenated. Returns `None` when the message carries no text.
    pub fn text(&self) -> Option<String> {
        match &self.content {
            MessageContent::Text(t) => Some(t.clone()),
            MessageContent::Parts(parts) => {
                let text: String = parts
                    .iter()
                    .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect();
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message_wire_shape() {
        let msg = Message::user("hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_parts_message_keeps_extra_fields() {
        let raw = json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Your balance "},
                {"type": "tool-call", "toolName": "balance"},
                {"type": "text", "text": "is $10."}
            ],
            "providerOptions": {"cache": true}
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text().as_deref(), Some("Your balance is $10."));
        assert!(msg.extra.contains_key("providerOptions"));
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let raw = json!({"role": "narrator", "content": "x"});
        assert!(serde_json::from_value::<Message>(raw).is_err());
    }

    #[test]
    fn test_text_none_without_text_parts() {
        let msg = Message {
            role: Role::Tool,
            content: MessageContent::Parts(vec![json!({"type": "tool-result"})]),
            extra: Map::new(),
        };
        assert_eq!(msg.text(), None);
    }
}
