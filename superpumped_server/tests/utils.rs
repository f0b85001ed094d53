#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
    response::{IntoResponse, Json},
    routing::post,
};
use serde_json::{Value, json};
use superpumped_server::{
    client::ModelClient,
    models::{client::HttpClientConfig, config::ServerConfig, state::SuperpumpedState},
};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const EMBEDDING_DIMS: usize = 16;

/// Bag-of-words embedding: each lowercase word adds one to a bucket chosen
/// by its bytes.
pub fn embed_words(text: &str) -> Vec<f32> {
    let mut values = vec![0.0; EMBEDDING_DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        values[bucket % EMBEDDING_DIMS] += 1.0;
    }
    values
}

async fn embeddings(Json(body): Json<Value>) -> Json<Value> {
    let input = body["input"].as_str().unwrap_or_default();
    Json(json!({"data": [{"embedding": embed_words(input)}]}))
}

fn contents(body: &Value, role: &str) -> Vec<String> {
    body["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter(|m| m["role"] == role)
                .filter_map(|m| m["content"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Canned replies picked by what the prompt asks for.
fn reply(body: &Value) -> String {
    let system = contents(body, "system").join("\n");
    let user = contents(body, "user").join("\n");
    if system.contains("edit data grid configurations") {
        if user.contains("cut off") {
            // Output that hit the token limit mid-object.
            return "```json\n{\"data\": [{\"firstName\": \"John\"}], \
                \"columns\": [{\"accessorKey\": \"firstName\", \"header\": \"First Name\"}"
                .to_string();
        }
        return "```json\n{\"data\": [{\"firstName\": \"John\"}, {\"firstName\": \"Jane\"}], \
            \"columns\": [{\"accessorKey\": \"firstName\", \"header\": \"First Name\"}], \
            \"enableGrouping\": true}\n```"
            .to_string();
    }
    if system.contains("create chart configurations") {
        if body.get("response_format").is_some() {
            return r#"{"options": {"title": {"text": "structured"}}, "series": [{"name": "Sales", "data": [1, 2]}]}"#
                .to_string();
        }
        if user.contains("answer in prose") {
            return "Sure! A bar chart would work nicely for this data.".to_string();
        }
        if user.contains("forget the series") {
            return r#"{"options": {"chart": {"type": "bar"}}}"#.to_string();
        }
        return "Here you go:\n```json\n{\"options\": {\"chart\": {\"type\": \"bar\"}, \
            \"series\": [9]}, \"series\": [{\"name\": \"Sales\", \"data\": [10, 20]}]}\n```"
            .to_string();
    }
    if system.contains("design analytics dashboards") {
        if user.contains("with a map") {
            return r#"{"components": [{"type": "map", "config": {}}]}"#.to_string();
        }
        return r#"{"title": "Sales", "components": [
            {"type": "stat", "gridSize": 20, "config": {"label": "Total", "value": 30}},
            {"type": "chart", "gridSize": 6, "config": {"options": {}, "series": [1, 2]}}
        ]}"#
        .to_string();
    }
    if system.contains("transform tabular data") {
        return r#"{"data": [{"name": "JOHN"}, {"name": "JANE"}]}"#.to_string();
    }
    // Plain chat: answer from context when there is some.
    match system.lines().find(|line| line.starts_with("- ")) {
        Some(line) => format!("From your notes: {}", &line[2..]),
        None => format!("echo: {user}"),
    }
}

async fn chat_completions(Json(body): Json<Value>) -> axum::response::Response {
    let content = reply(&body);
    if body["stream"] != true {
        return Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
            .into_response();
    }
    let mut sse = String::from("data: {\"choices\": [{\"delta\": {\"role\": \"assistant\"}}]}\n\n");
    for word in content.split_inclusive(' ') {
        let chunk = json!({"choices": [{"delta": {"content": word}}]});
        sse.push_str(&format!("data: {chunk}\n\n"));
    }
    sse.push_str("data: [DONE]\n\n");
    ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
}

/// Serve a fake OpenAI-compatible API on an ephemeral port and return its
/// base URL.
pub async fn spawn_model_api() -> Result<String, Box<dyn std::error::Error>> {
    let router = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(chat_completions));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, router).await });
    Ok(format!("http://{addr}/v1"))
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_model_api() -> Result<String, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/v1"))
}

pub fn model_client(base_url: &str) -> Result<ModelClient, Box<dyn std::error::Error>> {
    let config = HttpClientConfig {
        base_url: base_url.to_string(),
        ..Default::default()
    };
    ModelClient::new(config.clone(), config)
}

/// The full app on in-memory storage, talking to a fresh fake model API.
pub async fn test_app() -> Result<Router, Box<dyn std::error::Error>> {
    let base_url = spawn_model_api().await?;
    let state = SuperpumpedState::with_memory(ServerConfig::default(), model_client(&base_url)?);
    Ok(superpumped_server::app(state))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response: Response<Body> = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    (status, body.to_vec())
}

pub fn json_request(method: &str, uri: &str, body: &impl serde::Serialize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serializable body")))
        .expect("valid request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

pub fn text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

pub fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("JSON body")
}

/// Drop and recreate the test database. Refuses anything but a database
/// named `test`.
pub fn reset_database(db_connection_url: &str) -> Result<std::process::Output, String> {
    assert!(db_connection_url.ends_with("/test"));
    let migrations_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    std::process::Command::new("diesel")
        .args([
            "database",
            "reset",
            "--migration-dir",
            migrations_dir
                .to_str()
                .expect("migration dir should be valid"),
        ])
        .output()
        .map_err(|err| format!("{err:?}"))
}
