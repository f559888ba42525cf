use serde::{ Serialize, Deserialize };
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Caller-supplied messages in arrival order. Elements are kept as raw JSON
/// and forwarded untouched; their shape is the upstream's concern.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation(pub Vec<Value>);

impl Conversation {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// `[system] ++ self`, preserving order.
    pub fn with_system(self, system: &ChatMessage) -> Result<Vec<Value>, serde_json::Error> {
        let mut messages = Vec::with_capacity(self.0.len() + 1);
        messages.push(serde_json::to_value(system)?);
        messages.extend(self.0);
        Ok(messages)
    }
}
