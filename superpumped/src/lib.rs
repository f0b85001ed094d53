use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[serde(skip_deserializing)]
    System,
    Assistant,
    User,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Body sent to an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl GenerationRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            response_format: None,
            stream: None,
        }
    }
}

/// Free-form chat where the caller supplies its own context.
#[derive(Builder, Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct AiChatRequest {
    /// The user's question or message.
    #[serde(default)]
    pub query: String,
    /// Background text the answer should take into account, such as a
    /// previous conversation or a document excerpt.
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Builder, Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct NewNoteRequest {
    /// Note text to remember.
    #[serde(default)]
    pub text: String,
}
