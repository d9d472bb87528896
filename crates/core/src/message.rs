//! Chat message domain types.
//!
//! These are the value objects that flow through a turn:
//! caller history in → prompt to the completion endpoint → history out.
//!
//! The orchestrator never owns history. Callers hand it in as loosely typed
//! [`HistoryEntry`] values (whatever arrived over the wire) and get strictly
//! typed [`ChatMessage`]s back.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    /// Parse a wire role name. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single well-formed message: both role and content are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent this message
    pub role: Role,

    /// The text content (may be empty, never absent)
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A tool call requested by the model, exactly as the endpoint surfaced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as raw JSON text (unvalidated)
    pub arguments: String,
}

/// A caller-supplied history entry, accepted in whatever shape it arrived.
///
/// Deserializes from *any* JSON value so that one malformed entry never
/// rejects a whole request. Non-object values become an empty entry, which
/// [`HistoryEntry::to_message`] then drops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct HistoryEntry {
    pub role: Option<String>,
    pub content: Option<serde_json::Value>,
}

impl HistoryEntry {
    /// Convert into a well-formed message, or `None` when the role is missing
    /// or unknown, or the content is missing or null.
    ///
    /// Scalar content (numbers, booleans) is stringified.
    pub fn to_message(&self) -> Option<ChatMessage> {
        let role = Role::parse(self.role.as_deref()?)?;
        let content = match self.content.as_ref()? {
            serde_json::Value::Null => return None,
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Some(ChatMessage { role, content })
    }
}

impl From<serde_json::Value> for HistoryEntry {
    fn from(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(mut map) = value else {
            return Self::default();
        };
        let role = match map.remove("role") {
            Some(serde_json::Value::String(r)) => Some(r),
            _ => None,
        };
        Self {
            role,
            content: map.remove("content"),
        }
    }
}

impl From<ChatMessage> for HistoryEntry {
    fn from(message: ChatMessage) -> Self {
        Self {
            role: Some(message.role.as_str().to_string()),
            content: Some(serde_json::Value::String(message.content)),
        }
    }
}

/// Drop every malformed entry, keeping the relative order of the rest.
pub fn sanitize_history(entries: &[HistoryEntry]) -> Vec<ChatMessage> {
    entries.iter().filter_map(HistoryEntry::to_message).collect()
}
