use std::collections::HashMap;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils;

#[derive(Serialize)]
pub struct EmbeddingRequest {
    pub input: String,
}

#[derive(Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
}

#[derive(Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
pub struct GeneratedMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct GenerationChoice {
    pub message: GeneratedMessage,
}

#[derive(Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub choices: Vec<GenerationChoice>,
}

#[derive(Deserialize)]
pub struct StreamingDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct StreamingChoice {
    pub delta: StreamingDelta,
}

#[derive(Deserialize)]
pub struct GenerationResponseChunk {
    #[serde(default)]
    pub choices: Vec<StreamingChoice>,
}

impl GenerationResponseChunk {
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
    }
}

/// Where and how to reach an OpenAI-compatible API.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub base_url: String,
    /// Default headers. Values may reference environment variables as
    /// `${VAR}` so API keys stay out of the config file.
    #[serde(deserialize_with = "utils::deserialize_with_envsubst")]
    pub headers: HashMap<String, String>,
    /// Default query parameters.
    pub params: HashMap<String, String>,
    /// Default JSON fields merged into every request body (model name,
    /// temperature, and so on).
    pub json: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelClientError {
    #[error("request body for {url} is not a JSON object")]
    RequestJson { url: String },
    #[error("failed to reach {url}: {message}")]
    ApiConnection { url: String, message: String },
    #[error("{url} responded with status {status}: {body}")]
    ApiStatus {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to parse response from {url}: {message}")]
    ResponseJson { url: String, message: String },
    #[error("{url} returned an empty embedding")]
    EmptyEmbedding { url: String },
    #[error("{url} returned no generated content")]
    EmptyGeneration { url: String },
}
