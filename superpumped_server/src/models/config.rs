use serde::Deserialize;

use crate::{models::client::HttpClientConfig, utils};

/// Where notes, vectors, and ingestion records live.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "utils::default_server_binding_addr")]
    pub bind_addr: String,
    /// Origins allowed by CORS. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Number of notes retrieved as context for a question.
    #[serde(default = "utils::default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub storage: StorageBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: utils::default_server_binding_addr(),
            allowed_origins: vec![],
            top_k: utils::default_top_k(),
            storage: StorageBackend::default(),
        }
    }
}

#[derive(Deserialize)]
pub struct SuperpumpedConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub embedding: HttpClientConfig,
    pub generation: HttpClientConfig,
}
