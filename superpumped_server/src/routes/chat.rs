use axum::{
    extract::{Query, State},
    response::{Json, Response},
};
use superpumped::AiChatRequest;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    error::AppError,
    models::{
        chat::ChatParams,
        prompts::{self, Prompt},
        state::SuperpumpedState,
    },
    routes::{require, text_stream},
};

pub fn router(state: SuperpumpedState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(chat))
        .routes(routes!(ai_chat))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/chat",
    params(ChatParams),
    responses(
        (status = 200, description = "Streamed answer from the second-brain assistant", body = String, content_type = "text/plain"),
        (status = 400, description = "Query is missing"),
        (status = 500, description = "Failed to process the request")
    )
)]
#[axum::debug_handler]
pub async fn chat(
    State(state): State<SuperpumpedState>,
    Query(params): Query<ChatParams>,
) -> Result<Response, AppError> {
    let query = require(&params.query, "query")?;
    tracing::debug!(">> {query}");
    let request = Prompt::SecondBrain.to_generation_request(query);
    let stream = state.model_client.generate_stream(request).await?;
    Ok(text_stream(stream))
}

#[utoipa::path(
    post,
    path = "/api/ai-chat",
    request_body = AiChatRequest,
    responses(
        (status = 200, description = "Streamed answer using the caller's context", body = String, content_type = "text/plain"),
        (status = 400, description = "Query is missing"),
        (status = 500, description = "Failed to process the request")
    )
)]
#[axum::debug_handler]
pub async fn ai_chat(
    State(state): State<SuperpumpedState>,
    Json(request): Json<AiChatRequest>,
) -> Result<Response, AppError> {
    let query = require(&request.query, "query")?;
    tracing::debug!(">> {query}");
    let content = prompts::context_message(request.context.as_deref(), query);
    let request = Prompt::CallerContext.to_generation_request(content);
    let stream = state.model_client.generate_stream(request).await?;
    Ok(text_stream(stream))
}
