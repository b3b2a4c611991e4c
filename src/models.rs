// Request and response bodies for the HTTP surface

use serde::{Deserialize, Serialize};

use crate::memory::HistoryMessage;

fn default_provider() -> String {
    "openai".to_string()
}

// POST /chat body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Kept as free text so unknown names surface as an in-band error event
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

// Streamed event kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatEventType {
    ConversationId,
    Thinking,
    Token,
    Done,
    Error,
}

pub const THINKING_MESSAGE: &str = "Analyzing your question...";

/// One streamed chat event, sent as `data: {"type": ..., "content": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatEvent {
    #[serde(rename = "type")]
    pub kind: ChatEventType,
    pub content: String,
}

impl ChatEvent {
    pub fn conversation_id(id: impl Into<String>) -> Self {
        Self {
            kind: ChatEventType::ConversationId,
            content: id.into(),
        }
    }

    pub fn thinking() -> Self {
        Self {
            kind: ChatEventType::Thinking,
            content: THINKING_MESSAGE.to_string(),
        }
    }

    pub fn token(text: impl Into<String>) -> Self {
        Self {
            kind: ChatEventType::Token,
            content: text.into(),
        }
    }

    pub fn done() -> Self {
        Self {
            kind: ChatEventType::Done,
            content: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ChatEventType::Error,
            content: message.into(),
        }
    }

    /// Done and error both end the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ChatEventType::Done | ChatEventType::Error)
    }
}

// GET /conversations/{id} response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub conversation_id: String,
    pub messages: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

// Error body for non-streaming failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}
