use std::{io, pin::Pin};

use async_trait::async_trait;
use axum::body::Bytes;
use futures::{Stream, TryStreamExt, stream};
use serde_json::{Map, Value};
use superpumped::GenerationRequest;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::models::client::{
    EmbeddingRequest, EmbeddingResponse, GenerationResponse, GenerationResponseChunk,
    HttpClientConfig, ModelClientError,
};

/// Lazy, single-consumption stream of generated text deltas.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, io::Error>> + Send>>;

/// Anything that can turn text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelClientError>;
}

#[derive(Clone)]
pub struct ModelClient {
    embedding_api_config: HttpClientConfig,
    embedding_client: reqwest::Client,
    generation_api_config: HttpClientConfig,
    generation_client: reqwest::Client,
}

#[async_trait]
impl Embedder for ModelClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelClientError> {
        let request = EmbeddingRequest {
            input: text.to_string(),
        };
        let url = ModelClient::url(&self.embedding_api_config, "/embeddings");
        let resp: EmbeddingResponse = ModelClient::post(
            &self.embedding_api_config,
            &url,
            &self.embedding_client,
            request,
        )
        .await?
        .json()
        .await
        .map_err(|err| ModelClientError::ResponseJson {
            url: url.clone(),
            message: err.without_url().to_string(),
        })?;
        match resp.data.into_iter().next() {
            Some(data) if !data.embedding.is_empty() => Ok(data.embedding),
            _ => Err(ModelClientError::EmptyEmbedding { url }),
        }
    }
}

impl ModelClient {
    pub fn new(
        embedding_api_config: HttpClientConfig,
        generation_api_config: HttpClientConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let embedding_header_map =
            reqwest::header::HeaderMap::try_from(&embedding_api_config.headers)?;
        let embedding_client = reqwest::Client::builder()
            .default_headers(embedding_header_map)
            .build()?;
        let generation_header_map =
            reqwest::header::HeaderMap::try_from(&generation_api_config.headers)?;
        let generation_client = reqwest::Client::builder()
            .default_headers(generation_header_map)
            .build()?;
        Ok(Self {
            embedding_api_config,
            embedding_client,
            generation_api_config,
            generation_client,
        })
    }

    /// Wait for the complete generated response.
    pub async fn generate(&self, request: GenerationRequest) -> Result<String, ModelClientError> {
        let url = ModelClient::url(&self.generation_api_config, "/chat/completions");
        let resp: GenerationResponse = ModelClient::post(
            &self.generation_api_config,
            &url,
            &self.generation_client,
            request,
        )
        .await?
        .json()
        .await
        .map_err(|err| ModelClientError::ResponseJson {
            url: url.clone(),
            message: err.without_url().to_string(),
        })?;
        resp.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ModelClientError::EmptyGeneration { url })
    }

    /// Start a streamed generation and return its text deltas as they
    /// arrive. Dropping the stream drops the upstream connection.
    pub async fn generate_stream(
        &self,
        mut request: GenerationRequest,
    ) -> Result<TextStream, ModelClientError> {
        request.stream = Some(true);
        let url = ModelClient::url(&self.generation_api_config, "/chat/completions");
        let response = ModelClient::post(
            &self.generation_api_config,
            &url,
            &self.generation_client,
            request,
        )
        .await?;
        debug!("streaming response from {url}");
        Ok(sse_text_stream(
            response.bytes_stream().map_err(|err| io::Error::other(err.without_url())),
        ))
    }

    fn url(config: &HttpClientConfig, endpoint: &str) -> String {
        let base_url = config.base_url.trim_end_matches('/');
        format!("{base_url}{endpoint}")
    }

    async fn post<Request: serde::ser::Serialize>(
        config: &HttpClientConfig,
        url: &str,
        client: &reqwest::Client,
        request: Request,
    ) -> Result<reqwest::Response, ModelClientError> {
        let body = request_body(request, &config.json).ok_or_else(|| {
            ModelClientError::RequestJson {
                url: url.to_string(),
            }
        })?;
        let response = client
            .post(url)
            .query(&config.params)
            .json(&body)
            .send()
            .await
            .map_err(|err| ModelClientError::ApiConnection {
                url: url.to_string(),
                message: err.without_url().to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelClientError::ApiStatus {
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(response)
    }
}

/// Serialize `request` as a JSON object and fill in configured defaults
/// for the fields it leaves unset.
fn request_body(
    request: impl serde::ser::Serialize,
    defaults: &Map<String, Value>,
) -> Option<Map<String, Value>> {
    let Value::Object(mut body) = serde_json::to_value(request).ok()? else {
        return None;
    };
    for (key, value) in defaults {
        body.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Some(body)
}

/// Turn a server-sent-events body into the text deltas it carries. The
/// stream ends at `data: [DONE]` or when the body ends.
fn sse_text_stream<S>(body: S) -> TextStream
where
    S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
{
    let lines = StreamReader::new(Box::pin(body)).lines();
    let stream = stream::try_unfold(lines, |mut lines| async move {
        while let Some(line) = lines.next_line().await? {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            match data.trim() {
                "[DONE]" => return Ok(None),
                "" => {}
                data => {
                    let chunk = serde_json::from_str::<GenerationResponseChunk>(data)
                        .map_err(io::Error::other)?;
                    if let Some(content) = chunk.into_content() {
                        return Ok(Some((content, lines)));
                    }
                }
            }
        }
        Ok::<_, io::Error>(None)
    });
    Box::pin(stream)
}
