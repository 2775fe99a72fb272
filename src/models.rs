use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// Chat request sent by the browser
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    // kept untyped so a non-string message gets the same 400 as a missing one
    #[serde(default)]
    pub message: Value,
    #[serde(default)]
    pub chat_id: Value,
    // `None` when the field is absent, `Some(Value::Null)` for an explicit null
    #[serde(default, deserialize_with = "present")]
    pub model_id: Option<Value>,
    #[serde(default)]
    pub attachments: Vec<Value>,
}

impl GenerateRequest {
    /// The message text, if it is a non-empty string.
    pub fn message_text(&self) -> Option<&str> {
        self.message.as_str().filter(|m| !m.is_empty())
    }

    /// The caller's chat id when it is set to anything truthy
    /// (non-empty string, non-zero number, `true`, array or object).
    pub fn chat_id(&self) -> Option<Value> {
        let truthy = match &self.chat_id {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        };
        truthy.then(|| self.chat_id.clone())
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

// Chat response returned to the browser
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenerateResponse {
    // echoes the caller's chatId as sent, so not necessarily a string
    pub id: Value,
    pub message: ChatMessage,
    pub model: String,
    // epoch millis
    pub created: i64,
}

// Upstream chat-completions request format
#[derive(Serialize, Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

// Upstream chat-completions response format, only the fields we read
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionChoice {
    pub message: Option<CompletionMessage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionMessage {
    pub content: Option<String>,
}

impl CompletionResponse {
    /// First choice's content, else the top-level `content`, else a placeholder.
    pub fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty())
            .or(self.content.filter(|c| !c.is_empty()))
            .unwrap_or_else(|| "No response".to_string())
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub message: String,
}
